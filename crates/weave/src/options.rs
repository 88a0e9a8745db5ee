//! Construction options for a [`Vm`](crate::Vm).

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use weave_core::Value;
use weave_view::{CompileOptions, Event, Template};

use crate::vm::Vm;

pub(crate) type ComputedFn = Rc<dyn Fn(&Vm) -> Value>;
pub(crate) type MethodFn = Rc<dyn Fn(&Vm, &Event)>;

/// Everything a view-model is built from.
///
/// ```
/// use weave::{Options, Value};
///
/// let options = Options::new()
///     .with_data(serde_json::json!({"first": "Ada", "last": "Lovelace"}))
///     .with_computed("full", |vm| Value::from(format!("{} {}", vm.get("first"), vm.get("last"))));
/// let vm = weave::Vm::new(options).unwrap();
/// assert_eq!(vm.get("full"), Value::from("Ada Lovelace"));
/// ```
#[derive(Clone, Default)]
pub struct Options {
    pub(crate) data: Value,
    pub(crate) computed: IndexMap<String, ComputedFn>,
    pub(crate) methods: IndexMap<String, MethodFn>,
    pub(crate) template: Option<Template>,
    pub(crate) compile: CompileOptions,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root data. Must be an object.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    /// A read-only property derived from other properties. Cached until a
    /// property it read changes.
    #[must_use]
    pub fn with_computed(mut self, name: impl Into<String>, compute: impl Fn(&Vm) -> Value + 'static) -> Self {
        self.computed.insert(name.into(), Rc::new(compute));
        self
    }

    /// A named handler for `v-on` bindings and [`Vm::call`].
    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>, method: impl Fn(&Vm, &Event) + 'static) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Template to mount on construction.
    #[must_use]
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    #[must_use]
    pub fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.compile = options;
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("data", &self.data)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("template", &self.template.is_some())
            .field("compile", &self.compile)
            .finish()
    }
}
