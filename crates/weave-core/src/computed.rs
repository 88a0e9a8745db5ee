#![forbid(unsafe_code)]

//! Lazy computed values that track their own dependencies.
//!
//! # Design
//!
//! [`Computed<T>`] wraps a compute function and its cached result in shared,
//! reference-counted storage. While the function runs, the computed value is
//! the active subscriber, so every tracked slot it reads subscribes it. A
//! notification only marks the cache dirty; the next call to
//! [`get()`](Computed::get) recomputes.
//!
//! When a computed value is read while another subscriber is active, that
//! subscriber is made to depend on every registry the computed value reads.
//! A watcher over a computed value is therefore notified by the same writes
//! that dirty the cache, and registries notify lazy subscribers first, so the
//! watcher's re-evaluation never sees a stale cache.
//!
//! # Invariants
//!
//! 1. `get()` always returns a value consistent with the current state of all
//!    dependencies (no stale reads after a dependency mutation completes).
//! 2. The compute function is called at most once per dependency change cycle
//!    (memoization).
//! 3. If no dependency has changed, `get()` returns the cached value without
//!    calling the compute function.
//! 4. Version increments by exactly 1 per recomputation.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: The cached value remains from the last
//!   successful computation. The dirty flag stays set so the next `get()` will
//!   retry.
//! - **Compute function reads its own computed value**: panics instead of
//!   recursing forever.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dep::Dep;
use crate::tracking::{self, DepTracker, FlagGuard, Subscriber, SubscriberId, TrackingScope};

/// Shared interior for [`Computed<T>`].
struct ComputedInner<T> {
    id: SubscriberId,
    this: Weak<ComputedInner<T>>,
    /// The computation function.
    compute: Box<dyn Fn() -> T>,
    /// Cached result (None only before first computation).
    cached: RefCell<Option<T>>,
    /// Whether the cached value is stale.
    dirty: Cell<bool>,
    /// Set while the compute function runs.
    computing: Cell<bool>,
    /// Monotonically increasing version, bumped on each recomputation.
    version: Cell<u64>,
    deps: RefCell<DepTracker>,
}

/// A lazily-evaluated, memoized value derived from tracked reads.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("cached", &self.inner.cached.borrow())
            .field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: 'static> Computed<T> {
    /// Create a computed value. Nothing runs until the first read.
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        let inner = Rc::new_cyclic(|this| ComputedInner {
            id: SubscriberId::next(),
            this: this.clone(),
            compute: Box::new(compute),
            cached: RefCell::new(None),
            dirty: Cell::new(true), // Computed on first get().
            computing: Cell::new(false),
            version: Cell::new(0),
            deps: RefCell::new(DepTracker::default()),
        });
        Self { inner }
    }

    /// Access the current value by reference without cloning.
    ///
    /// Forces recomputation if dirty.
    ///
    /// # Panics
    ///
    /// Panics if the compute function reads this same `Computed`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.refresh();
        self.inner.depend_outer();
        let cached = self.inner.cached.borrow();
        f(cached
            .as_ref()
            .expect("cached is always Some after refresh"))
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Force invalidation of the cached value. The next `get()` will
    /// recompute.
    pub fn invalidate(&self) {
        self.inner.dirty.set(true);
    }

    /// Current version number. Increments by 1 on each recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of registries read by the latest computation.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Get the current value, recomputing if any dependency has changed.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T: 'static> ComputedInner<T> {
    fn refresh(&self) {
        if !self.dirty.get() && self.cached.borrow().is_some() {
            return;
        }
        assert!(
            !self.computing.get(),
            "computed value read itself during evaluation"
        );
        let Some(this) = self.this.upgrade() else {
            return;
        };

        self.deps.borrow_mut().begin();
        let value = {
            let _computing = FlagGuard::raise(&self.computing);
            let _frame = TrackingScope::enter(this);
            (self.compute)()
        };
        let stale = self.deps.borrow_mut().finish();
        for dep in stale {
            dep.remove_sub(self.id);
        }

        *self.cached.borrow_mut() = Some(value);
        self.dirty.set(false);
        self.version.set(self.version.get() + 1);
    }

    /// Hand this value's registries to the outer subscriber, if any.
    fn depend_outer(&self) {
        if tracking::current().is_none() {
            return;
        }
        let deps: Vec<Dep> = self.deps.borrow().current().to_vec();
        for dep in &deps {
            dep.depend();
        }
    }
}

impl<T: 'static> Subscriber for ComputedInner<T> {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(&self, dep: &Dep) {
        let subscribe = self.deps.borrow_mut().record(dep);
        if subscribe {
            let this: Weak<dyn Subscriber> = self.this.clone();
            dep.add_sub(this);
        }
    }

    fn update(&self) {
        self.dirty.set(true);
    }

    fn is_lazy(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::observer::observe;
    use crate::value::Value;
    use crate::watcher::Watcher;
    use serde_json::json;

    fn root(json: serde_json::Value) -> Node {
        observe(&Value::from_json(json)).unwrap()
    }

    fn num(node: &Node, key: &str) -> f64 {
        node.get(key).as_f64().unwrap_or(0.0)
    }

    #[test]
    fn single_dep_computed() {
        let data = root(json!({"v": 10}));
        let d = data.clone();
        let computed = Computed::new(move || num(&d, "v") * 2.0);

        assert_eq!(computed.get(), 20.0);
        assert_eq!(computed.version(), 1);

        data.set("v", 5);
        assert!(computed.is_dirty());
        assert_eq!(computed.get(), 10.0);
        assert_eq!(computed.version(), 2);
    }

    #[test]
    fn multi_dep_computed() {
        let data = root(json!({"width": 10, "height": 20}));
        let d = data.clone();
        let area = Computed::new(move || num(&d, "width") * num(&d, "height"));

        assert_eq!(area.get(), 200.0);

        data.set("width", 5);
        assert_eq!(area.get(), 100.0);

        data.set("height", 30);
        assert_eq!(area.get(), 150.0);
        assert_eq!(area.dep_count(), 2);
    }

    #[test]
    fn lazy_evaluation() {
        let compute_count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&compute_count);

        let data = root(json!({"v": 42}));
        let d = data.clone();
        let computed = Computed::new(move || {
            count_clone.set(count_clone.get() + 1);
            num(&d, "v") * 2.0
        });

        // Not computed yet.
        assert_eq!(compute_count.get(), 0);

        // First get triggers computation.
        assert_eq!(computed.get(), 84.0);
        assert_eq!(compute_count.get(), 1);

        // Second get returns cached.
        assert_eq!(computed.get(), 84.0);
        assert_eq!(compute_count.get(), 1);
    }

    #[test]
    fn memoization() {
        let compute_count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&compute_count);

        let data = root(json!({"v": 10}));
        let d = data.clone();
        let computed = Computed::new(move || {
            count_clone.set(count_clone.get() + 1);
            num(&d, "v") * 2.0
        });

        assert_eq!(computed.get(), 20.0);
        assert_eq!(compute_count.get(), 1);

        // Recomputed on the next get, not on the write.
        data.set("v", 20);
        assert_eq!(compute_count.get(), 1);
        assert_eq!(computed.get(), 40.0);
        assert_eq!(compute_count.get(), 2);

        // Cached again.
        assert_eq!(computed.get(), 40.0);
        assert_eq!(compute_count.get(), 2);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let data = root(json!({"v": 5}));
        let d = data.clone();
        let computed = Computed::new(move || num(&d, "v"));

        assert_eq!(computed.get(), 5.0);
        assert_eq!(computed.version(), 1);

        computed.invalidate();
        assert!(computed.is_dirty());

        assert_eq!(computed.get(), 5.0);
        assert_eq!(computed.version(), 2);
    }

    #[test]
    fn with_access() {
        let data = root(json!({"items": [1, 2, 3]}));
        let d = data.clone();
        let computed = Computed::new(move || {
            d.get("items")
                .as_node()
                .map(|items| items.entries().iter().filter_map(|(_, v)| v.as_f64()).sum::<f64>())
                .unwrap_or(0.0)
        });

        let result = computed.with(|sum| *sum);
        assert_eq!(result, 6.0);
    }

    #[test]
    fn clone_shares_state() {
        let data = root(json!({"v": 10}));
        let d = data.clone();
        let c1 = Computed::new(move || num(&d, "v") + 1.0);
        let c2 = c1.clone();

        assert_eq!(c1.get(), 11.0);
        assert_eq!(c2.get(), 11.0);

        data.set("v", 20);
        assert_eq!(c1.get(), 21.0);
        assert_eq!(c2.get(), 21.0);
        assert_eq!(c2.version(), 2);
    }

    #[test]
    fn diamond_dependency() {
        // A -> B, A -> C, (B, C) -> D
        let data = root(json!({"a": 10}));
        let (da, db) = (data.clone(), data.clone());
        let b = Computed::new(move || num(&da, "a") + 1.0);
        let c = Computed::new(move || num(&db, "a") * 2.0);

        let (b_clone, c_clone) = (b.clone(), c.clone());
        let d = Computed::new(move || b_clone.get() + c_clone.get());

        assert_eq!(d.get(), 31.0);

        data.set("a", 5);
        assert_eq!(b.get(), 6.0);
        assert_eq!(c.get(), 10.0);
        assert_eq!(d.get(), 16.0);
    }

    #[test]
    fn no_change_same_value() {
        let compute_count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&compute_count);

        let data = root(json!({"v": 42}));
        let d = data.clone();
        let computed = Computed::new(move || {
            count_clone.set(count_clone.get() + 1);
            num(&d, "v")
        });

        let _ = computed.get();
        assert_eq!(compute_count.get(), 1);

        // Same value: the slot does not notify.
        data.set("v", 42);
        assert!(!computed.is_dirty());
        let _ = computed.get();
        assert_eq!(compute_count.get(), 1);
    }

    #[test]
    fn watcher_over_computed_sees_fresh_value() {
        let data = root(json!({"first": "John", "last": "Doe"}));
        let d = data.clone();
        let full_name = Computed::new(move || Value::from(format!("{} {}", d.get("first"), d.get("last"))));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let source = full_name.clone();
        let _w = Watcher::from_fn(
            move || source.get(),
            move |new: &Value, old: &Value| log.borrow_mut().push((new.to_string(), old.to_string())),
        );

        data.set("first", "Jane");
        data.set("last", "Smith");
        assert_eq!(
            *seen.borrow(),
            vec![
                ("Jane Doe".to_string(), "John Doe".to_string()),
                ("Jane Smith".to_string(), "Jane Doe".to_string()),
            ]
        );
    }

    #[test]
    fn conditional_computed_drops_stale_branch() {
        let data = root(json!({"flag": true, "a": 1, "b": 2}));
        let d = data.clone();
        let pick = Computed::new(move || if d.get("flag").truthy() { d.get("a") } else { d.get("b") });

        assert_eq!(pick.get(), Value::from(1));
        data.set("flag", false);
        assert_eq!(pick.get(), Value::from(2));

        assert_eq!(data.dep("a").unwrap().subscriber_count(), 0);
        data.set("a", 100);
        assert!(!pick.is_dirty());
    }

    #[test]
    fn compute_panic_keeps_dirty() {
        let data = root(json!({"v": 1}));
        let d = data.clone();
        let computed = Computed::new(move || {
            let v = num(&d, "v");
            assert!(v < 2.0, "too big");
            v
        });
        assert_eq!(computed.get(), 1.0);

        data.set("v", 5);
        let c = computed.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || c.get()));
        assert!(result.is_err());
        assert!(computed.is_dirty());
        assert_eq!(crate::tracking::depth(), 0);

        data.set("v", 0);
        assert_eq!(computed.get(), 0.0);
    }

    #[test]
    fn debug_format() {
        let data = root(json!({"v": 42}));
        let d = data.clone();
        let computed = Computed::new(move || num(&d, "v"));
        let _ = computed.get();
        let dbg = format!("{computed:?}");
        assert!(dbg.contains("Computed"));
        assert!(dbg.contains("42"));
    }

    #[test]
    fn many_updates_version_monotonic() {
        let data = root(json!({"v": 0}));
        let d = data.clone();
        let computed = Computed::new(move || num(&d, "v"));

        for i in 1..=50 {
            data.set("v", i);
            let _ = computed.get();
        }
        // 50 updates plus the first read: version counts recomputations.
        assert_eq!(computed.version(), 50);
    }
}
