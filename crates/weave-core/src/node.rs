#![forbid(unsafe_code)]

//! Shared object and array storage with tracked slots.
//!
//! A [`Node`] starts out plain: reads and writes are ordinary map access.
//! Once [`observe`](crate::observe) walks it, every slot owns a [`Dep`] and
//! the node behaves like a rewritten accessor pair:
//!
//! - [`Node::get`] registers the active subscriber with the slot's registry
//!   and returns the stored value;
//! - [`Node::set`] ignores strictly-equal writes, stores the new value,
//!   observes it if it is composite, and notifies the registry.
//!
//! # Invariants
//!
//! 1. No `RefCell` borrow of the slot table is held while a registry is
//!    notified or while a subscriber is asked to depend, so callbacks may
//!    read and write the same node freely.
//! 2. Slots keep insertion order.
//! 3. A frozen node is never observed and never changes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::dep::Dep;
use crate::observer;
use crate::value::Value;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
}

struct Slot {
    value: Value,
    /// `None` until the owning node is observed.
    dep: Option<Dep>,
}

struct NodeInner {
    id: NodeId,
    kind: NodeKind,
    observed: Cell<bool>,
    frozen: Cell<bool>,
    slots: RefCell<IndexMap<String, Slot>>,
}

/// An object or array whose properties can be tracked.
///
/// Cloning a `Node` creates a new handle to the **same** storage.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

impl Node {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                id: NodeId::next(),
                kind,
                observed: Cell::new(false),
                frozen: Cell::new(false),
                slots: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// An empty plain object.
    #[must_use]
    pub fn object() -> Self {
        Self::with_kind(NodeKind::Object)
    }

    /// An empty plain array.
    #[must_use]
    pub fn array() -> Self {
        Self::with_kind(NodeKind::Array)
    }

    pub fn object_from<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let node = Self::object();
        {
            let mut slots = node.inner.slots.borrow_mut();
            for (key, value) in entries {
                slots.insert(key.into(), Slot { value, dep: None });
            }
        }
        node
    }

    pub fn array_from(items: impl IntoIterator<Item = Value>) -> Self {
        let node = Self::array();
        {
            let mut slots = node.inner.slots.borrow_mut();
            for (index, value) in items.into_iter().enumerate() {
                slots.insert(index.to_string(), Slot { value, dep: None });
            }
        }
        node
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.inner.kind
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.inner.kind == NodeKind::Array
    }

    #[must_use]
    pub fn is_observed(&self) -> bool {
        self.inner.observed.get()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.get()
    }

    /// Forbid further changes. A frozen node is skipped by the observer and
    /// silently ignores writes.
    pub fn freeze(&self) {
        self.inner.frozen.set(true);
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Tracked read. Missing keys yield [`Value::Undefined`] and register
    /// nothing.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        let (value, dep) = {
            let slots = self.inner.slots.borrow();
            match slots.get(key) {
                Some(slot) => (slot.value.clone(), slot.dep.clone()),
                None => return Value::Undefined,
            }
        };
        if let Some(dep) = dep {
            dep.depend();
        }
        value
    }

    /// Tracked read of an array element.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Value {
        self.get(&index.to_string())
    }

    /// Read without registering a dependency.
    #[must_use]
    pub fn peek(&self, key: &str) -> Value {
        self.inner
            .slots
            .borrow()
            .get(key)
            .map_or(Value::Undefined, |slot| slot.value.clone())
    }

    /// Write a slot.
    ///
    /// Writing a value strictly equal to the stored one does nothing. A new
    /// key on an observed node becomes a tracked slot without notifying
    /// anyone: nothing could have depended on it yet.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if self.is_frozen() {
            tracing::warn!(node = self.id().raw(), key, "write to frozen node ignored");
            return;
        }

        let tracked = self.is_observed();
        let dep = {
            let mut slots = self.inner.slots.borrow_mut();
            match slots.get_mut(key) {
                Some(slot) if slot.value.strict_eq(&value) => return,
                Some(slot) => {
                    slot.value = value.clone();
                    slot.dep.clone()
                }
                None => {
                    slots.insert(key.to_owned(), Slot {
                        value: value.clone(),
                        dep: tracked.then(Dep::new),
                    });
                    None
                }
            }
        };

        if tracked {
            observer::observe(&value);
        }
        if let Some(dep) = dep {
            dep.notify();
        }
    }

    /// Append under the key one past the highest index present, so earlier
    /// removals never make it overwrite a slot. Not notified: array
    /// mutation methods are not intercepted.
    pub fn push(&self, value: impl Into<Value>) {
        let next = self
            .inner
            .slots
            .borrow()
            .keys()
            .filter_map(|key| key.parse::<usize>().ok())
            .max()
            .map_or(0, |last| last + 1);
        self.set(&next.to_string(), value);
    }

    /// Delete a slot, notifying its registry.
    pub fn remove(&self, key: &str) -> Option<Value> {
        if self.is_frozen() {
            tracing::warn!(node = self.id().raw(), key, "delete on frozen node ignored");
            return None;
        }
        let slot = self.inner.slots.borrow_mut().shift_remove(key)?;
        if let Some(dep) = slot.dep {
            dep.notify();
        }
        Some(slot.value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.slots.borrow().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.slots.borrow().keys().cloned().collect()
    }

    /// Untracked snapshot of every slot, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .slots
            .borrow()
            .iter()
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect()
    }

    /// The registry behind `key`, if the slot is tracked.
    #[must_use]
    pub fn dep(&self, key: &str) -> Option<Dep> {
        self.inner.slots.borrow().get(key).and_then(|slot| slot.dep.clone())
    }

    /// Flag the node observed and give every untracked slot a registry.
    /// Returns the child values to observe next, or `None` when the node was
    /// already observed or is frozen.
    pub(crate) fn convert(&self) -> Option<Vec<Value>> {
        if self.is_frozen() || self.inner.observed.replace(true) {
            return None;
        }
        let mut slots = self.inner.slots.borrow_mut();
        let mut children = Vec::with_capacity(slots.len());
        for slot in slots.values_mut() {
            if slot.dep.is_none() {
                slot.dep = Some(Dep::new());
            }
            if slot.value.is_composite() {
                children.push(slot.value.clone());
            }
        }
        Some(children)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id().raw())
            .field("kind", &self.kind())
            .field("len", &self.len())
            .field("observed", &self.is_observed())
            .finish()
    }
}
