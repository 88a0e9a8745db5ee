#![forbid(unsafe_code)]

//! The active-unit marker: which subscriber is evaluating right now.
//!
//! Property reads attribute themselves to whatever sits on top of a
//! thread-local stack. Entering a [`TrackingScope`] pushes a frame and the
//! returned guard pops it again, so nested evaluations (a watcher whose
//! getter reads a computed value) restore the outer frame on every exit,
//! unwinding included.
//!
//! # Invariants
//!
//! 1. The stack depth after a guard drops equals the depth before it was
//!    created.
//! 2. An [`untracked`] frame hides every outer subscriber: reads inside it
//!    register nothing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashSet;

use crate::dep::{Dep, DepId};

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Anything a [`Dep`] can hold and notify.
pub trait Subscriber {
    fn subscriber_id(&self) -> SubscriberId;

    /// Subscription request issued by a property read. The subscriber
    /// decides whether it actually subscribes.
    fn add_dep(&self, dep: &Dep);

    /// Called by [`Dep::notify`] when a dependency changed.
    fn update(&self);

    /// Lazy subscribers only mark themselves stale on `update`. They are
    /// notified ahead of eager ones so eager re-evaluations never observe a
    /// stale cache.
    fn is_lazy(&self) -> bool {
        false
    }
}

thread_local! {
    static STACK: RefCell<Vec<Option<Rc<dyn Subscriber>>>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard for one frame of the marker stack.
#[must_use = "the frame is popped as soon as the guard drops"]
pub struct TrackingScope {
    depth: usize,
}

impl TrackingScope {
    /// Make `subscriber` the active unit until the guard drops.
    pub fn enter(subscriber: Rc<dyn Subscriber>) -> Self {
        Self::push(Some(subscriber))
    }

    /// Hide any active unit until the guard drops.
    pub fn suspend() -> Self {
        Self::push(None)
    }

    fn push(frame: Option<Rc<dyn Subscriber>>) -> Self {
        let depth = STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(frame);
            stack.len()
        });
        Self { depth }
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth, "tracking frames dropped out of order");
            stack.truncate(self.depth - 1);
        });
    }
}

/// The subscriber currently evaluating, if any.
#[must_use]
pub fn current() -> Option<Rc<dyn Subscriber>> {
    STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Number of frames on the marker stack.
#[must_use]
pub fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}

/// Run `f` without attributing its reads to any subscriber.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _frame = TrackingScope::suspend();
    f()
}

/// Sets a flag for its lifetime and clears it on every exit, unwinding
/// included.
pub(crate) struct FlagGuard<'a>(&'a Cell<bool>);

impl<'a> FlagGuard<'a> {
    pub(crate) fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Per-subscriber bookkeeping of the registries it reads.
///
/// Holds the registries from the last completed evaluation and the ones
/// touched by the evaluation in progress. `finish` swaps them and hands back
/// the registries that were not touched again.
#[derive(Default)]
pub(crate) struct DepTracker {
    deps: Vec<Dep>,
    dep_ids: AHashSet<DepId>,
    new_deps: Vec<Dep>,
    new_dep_ids: AHashSet<DepId>,
}

impl DepTracker {
    pub(crate) fn begin(&mut self) {
        // Leftovers mean the previous evaluation unwound after subscribing.
        for dep in self.new_deps.drain(..) {
            if self.dep_ids.insert(dep.id()) {
                self.deps.push(dep);
            }
        }
        self.new_dep_ids.clear();
    }

    /// Record `dep` for the running evaluation. Returns true when the owner
    /// is not subscribed to it yet and must call [`Dep::add_sub`].
    pub(crate) fn record(&mut self, dep: &Dep) -> bool {
        let id = dep.id();
        if !self.new_dep_ids.insert(id) {
            return false;
        }
        self.new_deps.push(dep.clone());
        !self.dep_ids.contains(&id)
    }

    /// Close the running evaluation, returning the registries it dropped.
    pub(crate) fn finish(&mut self) -> Vec<Dep> {
        let stale = self
            .deps
            .drain(..)
            .filter(|dep| !self.new_dep_ids.contains(&dep.id()))
            .collect();
        std::mem::swap(&mut self.deps, &mut self.new_deps);
        std::mem::swap(&mut self.dep_ids, &mut self.new_dep_ids);
        self.new_dep_ids.clear();
        stale
    }

    pub(crate) fn take_all(&mut self) -> Vec<Dep> {
        self.dep_ids.clear();
        self.new_dep_ids.clear();
        self.new_deps.clear();
        std::mem::take(&mut self.deps)
    }

    pub(crate) fn current(&self) -> &[Dep] {
        &self.deps
    }

    pub(crate) fn len(&self) -> usize {
        self.deps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        id: SubscriberId,
        seen: Cell<usize>,
    }

    impl Probe {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                id: SubscriberId::next(),
                seen: Cell::new(0),
            })
        }
    }

    impl Subscriber for Probe {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn add_dep(&self, _dep: &Dep) {
            self.seen.set(self.seen.get() + 1);
        }

        fn update(&self) {}
    }

    #[test]
    fn empty_stack_has_no_current() {
        assert!(current().is_none());
        assert_eq!(depth(), 0);
    }

    #[test]
    fn nested_scopes_restore_outer() {
        let outer = Probe::new();
        let inner = Probe::new();
        {
            let _a = TrackingScope::enter(outer.clone());
            assert_eq!(current().map(|s| s.subscriber_id()), Some(outer.id));
            {
                let _b = TrackingScope::enter(inner.clone());
                assert_eq!(current().map(|s| s.subscriber_id()), Some(inner.id));
            }
            assert_eq!(current().map(|s| s.subscriber_id()), Some(outer.id));
        }
        assert!(current().is_none());
    }

    #[test]
    fn untracked_hides_outer() {
        let outer = Probe::new();
        let _a = TrackingScope::enter(outer);
        untracked(|| assert!(current().is_none()));
        assert!(current().is_some());
    }

    #[test]
    fn panic_inside_scope_restores_depth() {
        let probe = Probe::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _a = TrackingScope::enter(probe);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(depth(), 0);
    }

    #[test]
    fn tracker_dedups_and_reports_stale() {
        let a = Dep::new();
        let b = Dep::new();
        let mut tracker = DepTracker::default();

        tracker.begin();
        assert!(tracker.record(&a));
        assert!(!tracker.record(&a));
        assert!(tracker.record(&b));
        assert!(tracker.finish().is_empty());
        assert_eq!(tracker.len(), 2);

        // Second pass only touches `a`: already subscribed, `b` goes stale.
        tracker.begin();
        assert!(!tracker.record(&a));
        let stale = tracker.finish();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id(), b.id());
        assert_eq!(tracker.len(), 1);
    }
}
