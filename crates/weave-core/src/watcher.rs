#![forbid(unsafe_code)]

//! Computation units that subscribe themselves by running.
//!
//! A [`Watcher`] evaluates a getter (a dotted path over a [`Scope`], or a
//! closure) inside a [`TrackingScope`] naming itself. Every tracked slot read
//! during that evaluation asks the watcher to depend on its registry. When
//! any of those registries notifies, the watcher re-evaluates and hands
//! `(new, old)` to its callback.
//!
//! # Invariants
//!
//! 1. Construction evaluates exactly once; [`Watcher::value`] is the initial
//!    render value.
//! 2. Within one evaluation a registry is subscribed at most once, however
//!    often the getter reads the slot.
//! 3. After every evaluation the subscribed registries are exactly those the
//!    evaluation read. Registries from a previous branch are dropped.
//! 4. The callback is never re-entered. An update arriving while it runs is
//!    replayed after it returns.
//!
//! # Failure Modes
//!
//! - **Getter or callback panics**: the marker stack is restored by guards.
//!   With [`PanicPolicy::Propagate`] the panic aborts the rest of the
//!   notification pass; with [`PanicPolicy::Isolate`] the callback panic is
//!   logged and the pass continues.
//! - **Handle dropped**: registries hold the watcher weakly, so it simply
//!   stops receiving updates.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::dep::Dep;
use crate::error::Result;
use crate::path::Path;
use crate::scope::Scope;
use crate::tracking::{DepTracker, FlagGuard, Subscriber, SubscriberId, TrackingScope};
use crate::value::Value;

/// What happens when a watcher callback panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicPolicy {
    /// Let the panic unwind through the notifying write.
    #[default]
    Propagate,
    /// Catch it, log it, and let the remaining subscribers run.
    Isolate,
}

/// Per-watcher configuration.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Invoke the callback after every re-evaluation, even when the new
    /// value is strictly equal to the old one.
    pub always_fire: bool,
    pub panic_policy: PanicPolicy,
    /// Label carried in log events.
    pub label: Option<String>,
}

impl WatchOptions {
    #[must_use]
    pub fn with_always_fire(mut self, always_fire: bool) -> Self {
        self.always_fire = always_fire;
        self
    }

    #[must_use]
    pub fn with_panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.panic_policy = policy;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

type Callback = Box<dyn FnMut(&Value, &Value)>;

enum Getter {
    Path { scope: Box<dyn Scope>, path: Path },
    Func(Box<dyn Fn() -> Value>),
}

impl Getter {
    fn get(&self) -> Value {
        match self {
            Self::Path { scope, path } => path.resolve(scope.as_ref()),
            Self::Func(f) => f(),
        }
    }
}

struct WatcherInner {
    id: SubscriberId,
    this: Weak<WatcherInner>,
    getter: Getter,
    callback: RefCell<Callback>,
    value: RefCell<Value>,
    deps: RefCell<DepTracker>,
    active: Cell<bool>,
    in_callback: Cell<bool>,
    pending: Cell<bool>,
    options: WatchOptions,
}

/// A tracked evaluator plus a change callback.
///
/// Cloning a `Watcher` creates a new handle to the **same** unit. The unit
/// stays subscribed while at least one handle is alive.
#[derive(Clone)]
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

impl Watcher {
    /// Watch the dotted path `expr` resolved from `scope`.
    pub fn new<S, F>(scope: &S, expr: &str, callback: F) -> Result<Self>
    where
        S: Scope + Clone + 'static,
        F: FnMut(&Value, &Value) + 'static,
    {
        Self::with_options(scope, expr, WatchOptions::default(), callback)
    }

    pub fn with_options<S, F>(scope: &S, expr: &str, options: WatchOptions, callback: F) -> Result<Self>
    where
        S: Scope + Clone + 'static,
        F: FnMut(&Value, &Value) + 'static,
    {
        let path = Path::parse(expr)?;
        let getter = Getter::Path {
            scope: Box::new(scope.clone()),
            path,
        };
        Ok(Self::build(getter, options, Box::new(callback)))
    }

    /// Watch an arbitrary getter closure.
    pub fn from_fn<G, F>(getter: G, callback: F) -> Self
    where
        G: Fn() -> Value + 'static,
        F: FnMut(&Value, &Value) + 'static,
    {
        Self::from_fn_with_options(getter, WatchOptions::default(), callback)
    }

    pub fn from_fn_with_options<G, F>(getter: G, options: WatchOptions, callback: F) -> Self
    where
        G: Fn() -> Value + 'static,
        F: FnMut(&Value, &Value) + 'static,
    {
        Self::build(Getter::Func(Box::new(getter)), options, Box::new(callback))
    }

    fn build(getter: Getter, options: WatchOptions, callback: Callback) -> Self {
        let inner = Rc::new_cyclic(|this| WatcherInner {
            id: SubscriberId::next(),
            this: this.clone(),
            getter,
            callback: RefCell::new(callback),
            value: RefCell::new(Value::Undefined),
            deps: RefCell::new(DepTracker::default()),
            active: Cell::new(true),
            in_callback: Cell::new(false),
            pending: Cell::new(false),
            options,
        });
        let initial = inner.evaluate();
        *inner.value.borrow_mut() = initial;
        tracing::trace!(
            watcher = inner.id.raw(),
            label = inner.options.label.as_deref(),
            deps = inner.deps.borrow().len(),
            "watcher created"
        );
        Self { inner }
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// The value from the latest evaluation.
    #[must_use]
    pub fn value(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Re-evaluate now, as if a dependency had changed.
    pub fn update(&self) {
        self.inner.update();
    }

    /// Subscription request from a registry (see [`Dep::depend`]).
    pub fn add_dep(&self, dep: &Dep) {
        self.inner.add_dep(dep);
    }

    /// Number of registries currently subscribed to.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Unsubscribe from every registry. Later notifications are ignored.
    pub fn teardown(&self) {
        if !self.inner.active.replace(false) {
            return;
        }
        let deps = self.inner.deps.borrow_mut().take_all();
        for dep in &deps {
            dep.remove_sub(self.inner.id);
        }
        tracing::trace!(watcher = self.inner.id.raw(), released = deps.len(), "watcher torn down");
    }
}

impl WatcherInner {
    fn evaluate(&self) -> Value {
        let Some(this) = self.this.upgrade() else {
            return self.getter.get();
        };
        self.deps.borrow_mut().begin();
        let value = {
            let _frame = TrackingScope::enter(this);
            self.getter.get()
        };
        let stale = self.deps.borrow_mut().finish();
        for dep in stale {
            dep.remove_sub(self.id);
        }
        value
    }

    fn run(&self) {
        let new = self.evaluate();
        let old = self.value.replace(new.clone());
        if !self.options.always_fire && new.strict_eq(&old) {
            return;
        }
        self.invoke(&new, &old);
    }

    fn invoke(&self, new: &Value, old: &Value) {
        let _guard = FlagGuard::raise(&self.in_callback);
        let call = || {
            let mut callback = self.callback.borrow_mut();
            (*callback)(new, old);
        };
        match self.options.panic_policy {
            PanicPolicy::Propagate => call(),
            PanicPolicy::Isolate => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(call)) {
                    tracing::error!(
                        watcher = self.id.raw(),
                        label = self.options.label.as_deref(),
                        panic = panic_message(payload.as_ref()),
                        "watcher callback panicked"
                    );
                }
            }
        }
    }
}

impl Subscriber for WatcherInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(&self, dep: &Dep) {
        if !self.active.get() {
            return;
        }
        let subscribe = self.deps.borrow_mut().record(dep);
        if subscribe {
            let this: Weak<dyn Subscriber> = self.this.clone();
            dep.add_sub(this);
        }
    }

    fn update(&self) {
        if !self.active.get() {
            return;
        }
        if self.in_callback.get() {
            self.pending.set(true);
            return;
        }
        loop {
            self.run();
            if !self.pending.replace(false) || !self.active.get() {
                break;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id.raw())
            .field("label", &self.inner.options.label)
            .field("value", &self.inner.value.borrow())
            .field("deps", &self.inner.deps.borrow().len())
            .field("active", &self.inner.active.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
