use crate::error::Result;
use crate::node::Node;
use crate::value::Value;

/// The root a path expression is resolved against.
///
/// `Node` is the plain case. A view-model implements it to expose data and
/// computed properties behind one set of top-level keys.
pub trait Scope {
    /// Tracked read of a top-level key.
    fn lookup(&self, key: &str) -> Value;

    /// Write a top-level key.
    fn assign(&self, key: &str, value: Value) -> Result<()>;
}

impl Scope for Node {
    fn lookup(&self, key: &str) -> Value {
        self.get(key)
    }

    fn assign(&self, key: &str, value: Value) -> Result<()> {
        self.set(key, value);
        Ok(())
    }
}
