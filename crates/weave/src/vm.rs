#![forbid(unsafe_code)]

//! The view-model: one handle over observed data, computed properties,
//! methods, watchers, and a mounted view.
//!
//! # Design
//!
//! Top-level keys resolve to data first, then to computed properties, so a
//! binding like `{{ full }}` reads a computed property through the same path
//! machinery as `{{ user.name }}`. Computed properties are cached
//! [`Computed`] values, so every read while a watcher evaluates also
//! subscribes that watcher to the data the property was derived from.
//!
//! Watchers, bindings, and method handlers reach the view-model through a
//! weak [`VmScope`]. Dropping the last [`Vm`] handle therefore frees the
//! whole graph.
//!
//! # Invariants
//!
//! 1. Computed properties are read-only: assigning one is
//!    [`weave_core::Error::ReadOnly`].
//! 2. Watchers created through [`Vm::watch`] live as long as the view-model.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use weave_core::{Computed, Node, Path, Scope, Value, WatchOptions, Watcher, observe};
use weave_view::{Compiler, DomNode, Event, MethodTable, Template, View};

use crate::error::{Error, Result};
use crate::options::{MethodFn, Options};

struct VmInner {
    data: Node,
    computed: IndexMap<String, Computed<Value>>,
    methods: IndexMap<String, MethodFn>,
    compiler: Compiler,
    watchers: RefCell<Vec<Watcher>>,
    view: RefCell<Option<View>>,
}

/// A view-model instance.
///
/// Cloning a `Vm` creates a new handle to the **same** instance.
#[derive(Clone)]
pub struct Vm {
    inner: Rc<VmInner>,
}

/// Weak [`Scope`] over a view-model. Reads yield
/// [`Value::Undefined`] once the view-model is gone.
#[derive(Clone)]
pub struct VmScope {
    inner: Weak<VmInner>,
}

impl Vm {
    /// Observe the data, build computed properties, and mount the template
    /// if one was given.
    pub fn new(options: Options) -> Result<Self> {
        let Options {
            data,
            computed,
            methods,
            template,
            compile,
        } = options;

        let data = match &data {
            Value::Object(node) => node.clone(),
            other => {
                return Err(Error::DataNotObject {
                    found: other.type_name(),
                });
            }
        };
        observe(&Value::Object(data.clone()));
        let compiler = Compiler::new(compile)?;

        let inner = Rc::new_cyclic(|this: &Weak<VmInner>| {
            let computed = computed
                .into_iter()
                .map(|(name, compute)| {
                    let this = this.clone();
                    let property = Computed::new(move || match this.upgrade() {
                        Some(inner) => compute(&Vm { inner }),
                        None => Value::Undefined,
                    });
                    (name, property)
                })
                .collect();
            VmInner {
                data,
                computed,
                methods,
                compiler,
                watchers: RefCell::new(Vec::new()),
                view: RefCell::new(None),
            }
        });
        let vm = Self { inner };
        tracing::debug!(
            keys = vm.inner.data.len(),
            computed = vm.inner.computed.len(),
            methods = vm.inner.methods.len(),
            "vm created"
        );

        if let Some(template) = template {
            vm.mount(&template)?;
        }
        Ok(vm)
    }

    /// The observed root object.
    #[must_use]
    pub fn data(&self) -> &Node {
        &self.inner.data
    }

    #[must_use]
    pub fn scope(&self) -> VmScope {
        VmScope {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Tracked read of a data key or computed property.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.inner.lookup(key)
    }

    /// Write a top-level data key.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        Ok(self.inner.assign(key, value.into())?)
    }

    /// Tracked read of a dotted path.
    pub fn get_path(&self, expr: &str) -> Result<Value> {
        let path = Path::parse(expr)?;
        Ok(path.resolve(&self.scope()))
    }

    /// Write through a dotted path.
    pub fn set_path(&self, expr: &str, value: impl Into<Value>) -> Result<()> {
        let path = Path::parse(expr)?;
        Ok(path.assign(&self.scope(), value.into())?)
    }

    #[must_use]
    pub fn computed(&self, name: &str) -> Option<Computed<Value>> {
        self.inner.computed.get(name).cloned()
    }

    /// Watch `expr` for the lifetime of the view-model. The returned handle
    /// may be used to tear the watcher down early.
    pub fn watch(&self, expr: &str, callback: impl FnMut(&Value, &Value) + 'static) -> Result<Watcher> {
        self.watch_with_options(expr, WatchOptions::default(), callback)
    }

    pub fn watch_with_options(
        &self,
        expr: &str,
        options: WatchOptions,
        callback: impl FnMut(&Value, &Value) + 'static,
    ) -> Result<Watcher> {
        let watcher = Watcher::with_options(&self.scope(), expr, options, callback)?;
        self.inner.watchers.borrow_mut().push(watcher.clone());
        Ok(watcher)
    }

    /// Invoke a method by name.
    pub fn call(&self, name: &str, event: &Event) -> Result<()> {
        let method = self
            .inner
            .methods
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownMethod { name: name.to_owned() })?;
        method(self, event);
        Ok(())
    }

    /// Compile `template` against this view-model, replacing any mounted
    /// view.
    pub fn mount(&self, template: &Template) -> Result<()> {
        let methods = self.method_table();
        let view = View::from_template(template, &self.scope(), &methods, &self.inner.compiler)?;
        let previous = self.inner.view.replace(Some(view));
        drop(previous);
        Ok(())
    }

    /// Drop the mounted view, releasing its bindings.
    pub fn unmount(&self) {
        let previous = self.inner.view.take();
        drop(previous);
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.view.borrow().is_some()
    }

    /// Live bindings in the mounted view; zero when unmounted.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.inner.view.borrow().as_ref().map_or(0, View::binding_count)
    }

    /// Root of the mounted document.
    #[must_use]
    pub fn root(&self) -> Option<DomNode> {
        self.inner.view.borrow().as_ref().map(|view| view.root().clone())
    }

    /// Current markup of the mounted document.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.inner.view.borrow().as_ref().map(View::render)
    }

    /// Deliver `event` to the mounted element whose `id` attribute is `id`.
    pub fn dispatch_to(&self, id: &str, event: &Event) -> Result<usize> {
        let node = {
            let view = self.inner.view.borrow();
            let view = view.as_ref().ok_or(Error::NotMounted)?;
            view.find(id)
                .ok_or_else(|| weave_view::Error::UnknownTarget { id: id.to_owned() })?
        };
        Ok(weave_view::dispatch(&node, event))
    }

    fn method_table(&self) -> MethodTable {
        let mut table = MethodTable::new();
        for (name, method) in &self.inner.methods {
            let this = Rc::downgrade(&self.inner);
            let method = Rc::clone(method);
            table.insert(name.as_str(), move |event: &Event| {
                if let Some(inner) = this.upgrade() {
                    method(&Vm { inner }, event);
                }
            });
        }
        table
    }
}

impl VmInner {
    fn lookup(&self, key: &str) -> Value {
        if self.data.contains_key(key) {
            return self.data.get(key);
        }
        match self.computed.get(key) {
            Some(property) => property.get(),
            None => Value::Undefined,
        }
    }

    fn assign(&self, key: &str, value: Value) -> weave_core::Result<()> {
        if self.computed.contains_key(key) && !self.data.contains_key(key) {
            return Err(weave_core::Error::read_only(key));
        }
        self.data.set(key, value);
        Ok(())
    }
}

impl Scope for Vm {
    fn lookup(&self, key: &str) -> Value {
        self.inner.lookup(key)
    }

    fn assign(&self, key: &str, value: Value) -> weave_core::Result<()> {
        self.inner.assign(key, value)
    }
}

impl Scope for VmScope {
    fn lookup(&self, key: &str) -> Value {
        self.inner
            .upgrade()
            .map_or(Value::Undefined, |inner| inner.lookup(key))
    }

    fn assign(&self, key: &str, value: Value) -> weave_core::Result<()> {
        match self.inner.upgrade() {
            Some(inner) => inner.assign(key, value),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("data", &self.inner.data)
            .field("computed", &self.inner.computed.keys().collect::<Vec<_>>())
            .field("methods", &self.inner.methods.keys().collect::<Vec<_>>())
            .field("watchers", &self.inner.watchers.borrow().len())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

impl fmt::Debug for VmScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmScope")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
