//! Directive attributes (`v-text`, `v-on:click`, ...).

use std::fmt;

/// Attribute prefix marking a directive.
pub const PREFIX: &str = "v-";

/// A recognized directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `v-text`: replace the element's text.
    Text,
    /// `v-html`: replace the element's children with raw markup.
    Html,
    /// `v-model`: two-way binding of the element's form value.
    Model,
    /// `v-class`: keep one class name in sync.
    Class,
    /// `v-on:<event>`: call a named method. The event name may be empty when
    /// the attribute was written as a bare `v-on`.
    On(String),
    /// Any other `v-*` attribute. Removed from the element, never bound.
    Unknown(String),
}

impl Directive {
    /// Classify an attribute name. `None` for plain attributes.
    #[must_use]
    pub fn parse(attr: &str) -> Option<Self> {
        let name = attr.strip_prefix(PREFIX)?;
        let directive = match name {
            "text" => Self::Text,
            "html" => Self::Html,
            "model" => Self::Model,
            "class" => Self::Class,
            "on" => Self::On(String::new()),
            other => match other.strip_prefix("on:") {
                Some(event) => Self::On(event.trim().to_owned()),
                None => Self::Unknown(other.to_owned()),
            },
        };
        Some(directive)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("v-text"),
            Self::Html => f.write_str("v-html"),
            Self::Model => f.write_str("v-model"),
            Self::Class => f.write_str("v-class"),
            Self::On(event) if event.is_empty() => f.write_str("v-on"),
            Self::On(event) => write!(f, "v-on:{event}"),
            Self::Unknown(name) => write!(f, "v-{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_attributes() {
        assert_eq!(Directive::parse("v-text"), Some(Directive::Text));
        assert_eq!(Directive::parse("v-html"), Some(Directive::Html));
        assert_eq!(Directive::parse("v-model"), Some(Directive::Model));
        assert_eq!(Directive::parse("v-class"), Some(Directive::Class));
        assert_eq!(Directive::parse("v-on:click"), Some(Directive::On("click".into())));
        assert_eq!(Directive::parse("v-on"), Some(Directive::On(String::new())));
        assert_eq!(Directive::parse("v-bogus"), Some(Directive::Unknown("bogus".into())));
        assert_eq!(Directive::parse("class"), None);
        assert_eq!(Directive::parse("data-v-text"), None);
    }

    #[test]
    fn display_matches_attribute_name() {
        for attr in ["v-text", "v-html", "v-model", "v-class", "v-on:input", "v-on", "v-if"] {
            assert_eq!(Directive::parse(attr).unwrap().to_string(), attr);
        }
    }
}
