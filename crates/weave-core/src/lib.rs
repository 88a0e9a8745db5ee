#![forbid(unsafe_code)]

//! Core: observed data, dependency registries, and computation units.
//!
//! - [`observe`] converts a plain [`Value`] tree in place so every slot of
//!   every reachable [`Node`] owns a [`Dep`] registry.
//! - Reading a slot while a subscriber is active (see [`tracking`]) makes
//!   that subscriber depend on the slot's registry.
//! - Writing a different value notifies the registry, and each subscriber
//!   re-evaluates: a [`Watcher`] immediately, a [`Computed`] on its next read.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weave_core::{observe, Value, Watcher};
//!
//! let data = observe(&Value::from_json(serde_json::json!({"hobby": {"a": "eat"}}))).unwrap();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let _w = Watcher::new(&data, "hobby.a", move |new: &Value, _: &Value| {
//!     log.borrow_mut().push(new.to_string());
//! })
//! .unwrap();
//!
//! data.get("hobby").as_node().unwrap().set("a", "play");
//! assert_eq!(*seen.borrow(), vec!["play".to_string()]);
//! ```
//!
//! # Invariants
//!
//! 1. Only slots read during a subscriber's latest evaluation notify it.
//! 2. A write that is strictly equal to the stored value notifies nobody.
//! 3. The active-unit marker is restored after every evaluation, including
//!    ones that unwind.

pub mod computed;
pub mod dep;
pub mod error;
pub mod node;
pub mod observer;
pub mod path;
pub mod scope;
pub mod tracking;
pub mod value;
pub mod watcher;

pub use computed::Computed;
pub use dep::{Dep, DepId};
pub use error::{Error, Result};
pub use node::{Node, NodeId, NodeKind};
pub use observer::observe;
pub use path::Path;
pub use scope::Scope;
pub use tracking::{Subscriber, SubscriberId, TrackingScope, untracked};
pub use value::Value;
pub use watcher::{PanicPolicy, WatchOptions, Watcher};
