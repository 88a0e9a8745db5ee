//! Property-based invariant tests for dependency tracking.
//!
//! These tests verify structural invariants that must hold for any sequence
//! of writes:
//!
//! 1. A watcher's value always equals a fresh untracked resolve of its path.
//! 2. The callback fires exactly once per write that changes the resolved
//!    value, and never otherwise.
//! 3. Every registry holds each watcher at most once.
//! 4. A conditional getter is subscribed to exactly the registries its
//!    latest branch read.
//! 5. The marker stack is empty between writes.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use serde_json::json;
use weave_core::{Node, Path, Value, Watcher, observe, tracking, untracked};

// ── Helpers ─────────────────────────────────────────────────────────────

const KEYS: [&str; 3] = ["a", "b", "c"];

#[derive(Debug, Clone)]
enum Op {
    /// Write a small integer to a top-level key.
    Top(usize, i32),
    /// Write a small integer to `nested.<key>`.
    Nested(usize, i32),
    /// Replace `nested` with a fresh object.
    Replace(i32, i32, i32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3, -3i32..3).prop_map(|(k, v)| Op::Top(k, v)),
        (0usize..3, -3i32..3).prop_map(|(k, v)| Op::Nested(k, v)),
        (-3i32..3, -3i32..3, -3i32..3).prop_map(|(a, b, c)| Op::Replace(a, b, c)),
    ]
}

fn fresh_root() -> Node {
    observe(&Value::from_json(json!({
        "a": 0, "b": 0, "c": 0,
        "nested": {"a": 0, "b": 0, "c": 0}
    })))
    .expect("object root")
}

fn apply(data: &Node, op: &Op) {
    match *op {
        Op::Top(k, v) => data.set(KEYS[k], v),
        Op::Nested(k, v) => {
            if let Some(nested) = data.peek("nested").as_node() {
                nested.set(KEYS[k], v);
            }
        }
        Op::Replace(a, b, c) => data.set("nested", Value::from_json(json!({"a": a, "b": b, "c": c}))),
    }
}

fn path_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("a"), Just("b"), Just("nested.a"), Just("nested.c")]
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Value tracks the data; callback fires once per change
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn watcher_value_matches_data(
        expr in path_strategy(),
        ops in proptest::collection::vec(op_strategy(), 0..40),
    ) {
        let data = fresh_root();
        let fired = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&fired);
        let w = Watcher::new(&data, expr, move |_: &Value, _: &Value| {
            counter.set(counter.get() + 1);
        })
        .expect("valid path");
        let path = Path::parse(expr).expect("valid path");

        let mut expected = 0usize;
        for op in &ops {
            let before = untracked(|| path.resolve(&data));
            apply(&data, op);
            let after = untracked(|| path.resolve(&data));
            if !before.strict_eq(&after) {
                expected += 1;
            }
            prop_assert_eq!(w.value(), after);
            prop_assert_eq!(fired.get(), expected, "after {:?}", op);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Registries never hold a watcher twice
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn registries_hold_each_watcher_once(
        reads in proptest::collection::vec(0usize..3, 1..12),
        ops in proptest::collection::vec(op_strategy(), 0..20),
    ) {
        let data = fresh_root();
        let d = data.clone();
        let getter_reads = reads.clone();
        let w = Watcher::from_fn(
            move || {
                let mut total = 0.0;
                for &k in &getter_reads {
                    total += d.get(KEYS[k]).as_f64().unwrap_or(0.0);
                }
                Value::from(total)
            },
            |_: &Value, _: &Value| {},
        );

        for op in &ops {
            apply(&data, op);
            for (i, key) in KEYS.iter().enumerate() {
                let dep = data.dep(key).expect("tracked slot");
                prop_assert!(dep.subscriber_count() <= 1);
                prop_assert_eq!(dep.has_subscriber(w.id()), reads.contains(&i));
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Conditional getters follow their latest branch
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn conditional_subscriptions_are_exact(flags in proptest::collection::vec(any::<bool>(), 1..16)) {
        let data = observe(&Value::from_json(json!({"flag": true, "a": 1, "b": 2}))).expect("object root");
        let d = data.clone();
        let w = Watcher::from_fn(
            move || if d.get("flag").truthy() { d.get("a") } else { d.get("b") },
            |_: &Value, _: &Value| {},
        );

        for flag in flags {
            data.set("flag", flag);
            let a = data.dep("a").expect("tracked slot");
            let b = data.dep("b").expect("tracked slot");
            prop_assert_eq!(a.has_subscriber(w.id()), flag);
            prop_assert_eq!(b.has_subscriber(w.id()), !flag);
            prop_assert_eq!(w.dep_count(), 2);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. The marker stack is balanced
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn marker_stack_is_balanced(ops in proptest::collection::vec(op_strategy(), 0..30)) {
        let data = fresh_root();
        let _watchers: Vec<Watcher> = ["a", "nested.b", "nested"]
            .into_iter()
            .map(|expr| Watcher::new(&data, expr, |_: &Value, _: &Value| {}).expect("valid path"))
            .collect();

        for op in &ops {
            apply(&data, op);
            prop_assert_eq!(tracking::depth(), 0);
            prop_assert!(tracking::current().is_none());
        }
    }
}
