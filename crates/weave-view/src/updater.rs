//! Sinks that push a binding's value into a document node.

use weave_core::Value;

use crate::directive::Directive;
use crate::dom::DomNode;

/// How a bound value lands on its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Updater {
    Text,
    Html,
    Model,
    Class,
}

impl Updater {
    /// The updater behind a value directive. `None` for events and unknown
    /// directives.
    #[must_use]
    pub fn for_directive(directive: &Directive) -> Option<Self> {
        match directive {
            Directive::Text => Some(Self::Text),
            Directive::Html => Some(Self::Html),
            Directive::Model => Some(Self::Model),
            Directive::Class => Some(Self::Class),
            Directive::On(_) | Directive::Unknown(_) => None,
        }
    }

    pub fn apply(self, node: &DomNode, value: &Value, old: &Value) {
        match self {
            Self::Text => node.set_text_content(display(value)),
            Self::Html => node.set_inner_html(display(value)),
            Self::Model => node.set_value(display(value)),
            Self::Class => node.set_class_name(swap_class(&node.class_name(), &display(old), &display(value))),
        }
    }
}

/// Text form of a bound value. Absent values render as nothing.
#[must_use]
pub fn display(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Drop the classes in `old` from `current`, then append those in `new`.
fn swap_class(current: &str, old: &str, new: &str) -> String {
    let stale: Vec<&str> = old.split_whitespace().collect();
    let mut classes: Vec<&str> = current
        .split_whitespace()
        .filter(|class| !stale.contains(class))
        .collect();
    for class in new.split_whitespace() {
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
    classes.join(" ")
}
