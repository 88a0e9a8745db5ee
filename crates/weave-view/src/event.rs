//! Events delivered to element listeners, and the named handlers
//! `v-on:<event>` bindings resolve against.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use weave_core::Value;

/// A listener or method body.
pub type Handler = Rc<dyn Fn(&Event)>;

/// A synthetic DOM event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event type, e.g. `"click"` or `"input"`.
    pub kind: String,
    /// Payload; for `input` events the new text of the target.
    pub value: Value,
}

impl Event {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: Value::Undefined,
        }
    }

    /// An `input` event carrying `text`.
    #[must_use]
    pub fn input(text: impl Into<String>) -> Self {
        Self::new("input").with_value(Value::from(text.into()))
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }
}

/// Named handlers available to `v-on` bindings.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: IndexMap<String, Handler>,
}

impl MethodTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, handler: impl Fn(&Event) + 'static) {
        self.methods.insert(name.into(), Rc::new(handler));
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
        self.insert(name, handler);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Handler> {
        self.methods.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
