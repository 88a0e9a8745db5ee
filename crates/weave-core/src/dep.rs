#![forbid(unsafe_code)]

//! Per-property subscriber registries.
//!
//! Every tracked slot of an observed [`Node`](crate::Node) owns exactly one
//! [`Dep`]. Reading the slot while a subscriber is active calls
//! [`Dep::depend`]; writing a different value calls [`Dep::notify`].
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order (lazy subscribers
//!    first, see [`Subscriber::is_lazy`]).
//! 2. A registry never holds the same subscriber twice. The subscriber side
//!    enforces this; `add_sub` itself does not check.
//! 3. Subscribers are held weakly: dropping the last handle to a watcher
//!    removes it before the next notification pass completes.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::tracking::{self, Subscriber, SubscriberId};

static NEXT_DEP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(NEXT_DEP_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

struct Entry {
    id: SubscriberId,
    sub: Weak<dyn Subscriber>,
}

struct DepInner {
    id: DepId,
    subs: RefCell<Vec<Entry>>,
}

/// The set of subscribers depending on one property slot.
///
/// Cloning a `Dep` creates a new handle to the **same** registry.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

impl Dep {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: DepId::next(),
                subs: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Append a subscriber. Dropped subscribers are ignored.
    pub fn add_sub(&self, sub: Weak<dyn Subscriber>) {
        let Some(strong) = sub.upgrade() else {
            return;
        };
        let id = strong.subscriber_id();
        tracing::trace!(dep = self.id().raw(), subscriber = id.raw(), "subscribe");
        self.inner.subs.borrow_mut().push(Entry { id, sub });
    }

    pub fn remove_sub(&self, id: SubscriberId) {
        tracing::trace!(dep = self.id().raw(), subscriber = id.raw(), "unsubscribe");
        self.inner.subs.borrow_mut().retain(|entry| entry.id != id);
    }

    /// Ask the active subscriber, if any, to depend on this registry.
    pub fn depend(&self) {
        if let Some(active) = tracking::current() {
            active.add_dep(self);
        }
    }

    /// Run `update` on every live subscriber.
    ///
    /// The list is snapshotted first: subscribers re-subscribe while they
    /// re-evaluate, and those additions belong to the next pass.
    pub fn notify(&self) {
        let snapshot: Vec<Rc<dyn Subscriber>> = {
            let mut subs = self.inner.subs.borrow_mut();
            subs.retain(|entry| entry.sub.strong_count() > 0);
            subs.iter().filter_map(|entry| entry.sub.upgrade()).collect()
        };
        tracing::trace!(dep = self.id().raw(), fan_out = snapshot.len(), "notify");

        let (lazy, eager): (Vec<_>, Vec<_>) = snapshot.into_iter().partition(|sub| sub.is_lazy());
        for sub in lazy.iter().chain(eager.iter()) {
            sub.update();
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subs
            .borrow()
            .iter()
            .filter(|entry| entry.sub.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn has_subscriber(&self, id: SubscriberId) -> bool {
        self.inner
            .subs
            .borrow()
            .iter()
            .any(|entry| entry.id == id && entry.sub.strong_count() > 0)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id.raw())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::TrackingScope;
    use std::cell::RefCell;

    struct Recorder {
        id: SubscriberId,
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        lazy: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> Rc<Self> {
            Rc::new(Self {
                id: SubscriberId::next(),
                name,
                log: Rc::clone(log),
                lazy: false,
            })
        }
    }

    impl Subscriber for Recorder {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn add_dep(&self, _dep: &Dep) {
            self.log.borrow_mut().push("add_dep");
        }

        fn update(&self) {
            self.log.borrow_mut().push(self.name);
        }

        fn is_lazy(&self) -> bool {
            self.lazy
        }
    }

    fn weak(sub: &Rc<Recorder>) -> Weak<dyn Subscriber> {
        let sub: Rc<dyn Subscriber> = sub.clone();
        Rc::downgrade(&sub)
    }

    #[test]
    fn notify_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Recorder::new("a", &log);
        let b = Recorder::new("b", &log);
        let dep = Dep::new();
        dep.add_sub(weak(&b));
        dep.add_sub(weak(&a));

        dep.notify();
        assert_eq!(*log.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn lazy_subscribers_go_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let eager = Recorder::new("eager", &log);
        let lazy = Rc::new(Recorder {
            id: SubscriberId::next(),
            name: "lazy",
            log: Rc::clone(&log),
            lazy: true,
        });
        let dep = Dep::new();
        dep.add_sub(weak(&eager));
        dep.add_sub(weak(&lazy));

        dep.notify();
        assert_eq!(*log.borrow(), vec!["lazy", "eager"]);
    }

    #[test]
    fn remove_sub_stops_notifications() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Recorder::new("a", &log);
        let dep = Dep::new();
        dep.add_sub(weak(&a));
        assert!(dep.has_subscriber(a.id));

        dep.remove_sub(a.id);
        dep.notify();
        assert!(log.borrow().is_empty());
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let dep = Dep::new();
        {
            let a = Recorder::new("a", &log);
            dep.add_sub(weak(&a));
            assert_eq!(dep.subscriber_count(), 1);
        }
        assert_eq!(dep.subscriber_count(), 0);
        dep.notify();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn depend_without_active_subscriber_is_noop() {
        let dep = Dep::new();
        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn depend_delegates_to_active_subscriber() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Recorder::new("a", &log);
        let dep = Dep::new();
        {
            let _scope = TrackingScope::enter(a.clone());
            dep.depend();
        }
        assert_eq!(*log.borrow(), vec!["add_dep"]);
        // The recorder never calls add_sub, so nothing is registered.
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Dep::new().id(), Dep::new().id());
    }
}
