#![forbid(unsafe_code)]

//! Transitive observation of a value graph.
//!
//! [`observe`] converts every slot of a node (and, recursively, of every
//! node reachable from it) into a tracked slot with its own [`Dep`]. Values
//! written later through [`Node::set`] are observed the same way, so the
//! graph stays tracked as it evolves.
//!
//! # Failure Modes
//!
//! - **Primitive input**: returns `None`; this is also the recursion base.
//! - **Frozen node**: left untouched, together with everything only
//!   reachable through it.
//! - **Cycles**: a node is flagged before its children are visited, so a
//!   back-reference stops the walk.
//!
//! [`Dep`]: crate::Dep
//! [`Node::set`]: crate::Node::set

use crate::node::Node;
use crate::value::Value;

/// Bring `value` under observation. Returns the node for composites,
/// `None` for primitives. Observing an observed node is a no-op.
pub fn observe(value: &Value) -> Option<Node> {
    let node = value.as_node()?;
    let mut pending = vec![node.clone()];
    let mut converted = 0usize;

    while let Some(next) = pending.pop() {
        let Some(children) = next.convert() else {
            continue;
        };
        converted += 1;
        pending.extend(children.iter().filter_map(|child| child.as_node().cloned()));
    }

    if converted > 0 {
        tracing::debug!(root = node.id().raw(), nodes = converted, "observed");
    }
    Some(node.clone())
}
