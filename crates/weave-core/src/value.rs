#![forbid(unsafe_code)]

//! Dynamic values stored in observed nodes.
//!
//! Composite values (`Object`, `Array`) carry a shared [`Node`] handle, so
//! cloning a [`Value`] never copies the graph. Equality is strict: primitives
//! compare by value (`NaN` is never equal to itself) and composites compare
//! by identity.

use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Serializer};
use serde_json::Number;

use crate::node::{Node, NodeId, NodeKind};

#[derive(Clone, Default)]
pub enum Value {
    /// No value: missing keys and unresolvable paths.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Node),
    Array(Node),
}

impl Value {
    /// Strict equality: by value for primitives, by identity for nodes.
    #[must_use]
    pub fn strict_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) | (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.as_node().is_some()
    }

    /// The node behind an object or array.
    #[must_use]
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Object(node) | Self::Array(node) => Some(node),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Truthiness as used by conditional getters.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Object(_) | Self::Array(_) => true,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }

    /// Build a plain (unobserved) value from JSON.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s.into()),
            serde_json::Value::Array(items) => {
                Self::Array(Node::array_from(items.into_iter().map(Self::from_json)))
            }
            serde_json::Value::Object(map) => Self::Object(Node::object_from(
                map.into_iter().map(|(k, v)| (k, Self::from_json(v))),
            )),
        }
    }

    /// Snapshot as JSON without registering any dependency.
    ///
    /// `Undefined` and non-finite numbers become `null`; a node already on
    /// the current path (a cycle) is cut off as `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut path = Vec::new();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut Vec<NodeId>) -> serde_json::Value {
        match self {
            Self::Undefined | Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => json_number(*n),
            Self::String(s) => serde_json::Value::String(s.to_string()),
            Self::Object(node) | Self::Array(node) => {
                if path.contains(&node.id()) {
                    return serde_json::Value::Null;
                }
                path.push(node.id());
                let entries = node.entries();
                let json = match node.kind() {
                    NodeKind::Array => serde_json::Value::Array(
                        entries.iter().map(|(_, v)| v.to_json_inner(path)).collect(),
                    ),
                    NodeKind::Object => serde_json::Value::Object(
                        entries
                            .iter()
                            .map(|(k, v)| (k.clone(), v.to_json_inner(path)))
                            .collect(),
                    ),
                };
                path.pop();
                json
            }
        }
    }
}

fn json_number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Object(node) | Self::Array(node) => fmt::Debug::fmt(node, f),
        }
    }
}

/// String coercion used by text updaters.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => {
                if n.is_nan() {
                    f.write_str("NaN")
                } else if n.is_infinite() {
                    f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
                } else {
                    write!(f, "{n}")
                }
            }
            Self::String(s) => f.write_str(s),
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Array(node) => join_array(node, f, &mut Vec::new()),
        }
    }
}

/// Comma-join an array. An array already being joined renders as empty.
fn join_array(node: &Node, f: &mut fmt::Formatter<'_>, path: &mut Vec<NodeId>) -> fmt::Result {
    if path.contains(&node.id()) {
        return Ok(());
    }
    path.push(node.id());
    for (i, (_, item)) in node.entries().iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        match item {
            Value::Undefined | Value::Null => {}
            Value::Array(inner) => join_array(inner, f, path)?,
            other => write!(f, "{other}")?,
        }
    }
    path.pop();
    Ok(())
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::from_json(json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node.kind() {
            NodeKind::Object => Self::Object(node),
            NodeKind::Array => Self::Array(node),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_eq_primitives() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::from("1"), Value::from(1));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert_eq!(Value::Undefined, Value::Undefined);
        assert_ne!(Value::Undefined, Value::Null);
    }

    #[test]
    fn strict_eq_composites_by_identity() {
        let a = Value::from_json(json!({"v": 1}));
        let b = Value::from_json(json!({"v": 1}));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn json_round_trip_keeps_order() {
        let json = json!({"z": 1, "a": [true, null, "x"], "m": {"k": 2.5}});
        assert_eq!(Value::from_json(json.clone()).to_json(), json);
    }

    #[test]
    fn cycle_is_cut_in_json() {
        let value = Value::from_json(json!({"name": "loop"}));
        let node = value.as_node().cloned().unwrap();
        node.set("me", value.clone());
        assert_eq!(value.to_json(), json!({"name": "loop", "me": null}));
    }

    #[test]
    fn display_cycle_is_cut() {
        let value = Value::from_json(json!([1]));
        let node = value.as_node().cloned().unwrap();
        node.push(value.clone());
        node.push(2);
        assert_eq!(value.to_string(), "1,,2");

        let outer = Value::from_json(json!(["a", ["b"]]));
        let inner = outer.as_node().unwrap().peek("1");
        inner.as_node().unwrap().push(outer.clone());
        assert_eq!(outer.to_string(), "a,b,");
    }

    #[test]
    fn display_coercion() {
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from_json(json!([1, null, "a"])).to_string(), "1,,a");
        assert_eq!(Value::from_json(json!({})).to_string(), "[object Object]");
        assert_eq!(Value::Undefined.to_string(), "undefined");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::from(0).truthy());
        assert!(!Value::from("").truthy());
        assert!(Value::from("x").truthy());
        assert!(Value::from_json(json!([])).truthy());
    }
}
