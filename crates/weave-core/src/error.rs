use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the few fallible edges of the core.
///
/// Reads never fail: an unresolvable path yields [`Value::Undefined`]
/// instead. Only parsing an expression and writing through one can go wrong.
///
/// [`Value::Undefined`]: crate::Value::Undefined
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid path expression {expr:?}: {reason}")]
    InvalidPath { expr: String, reason: &'static str },

    #[error("cannot assign through non-object value at `{path}`")]
    NotComposite { path: String },

    #[error("`{key}` is read-only")]
    ReadOnly { key: String },
}

impl Error {
    #[must_use]
    pub fn invalid_path(expr: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            expr: expr.into(),
            reason,
        }
    }

    #[must_use]
    pub fn read_only(key: impl Into<String>) -> Self {
        Self::ReadOnly { key: key.into() }
    }
}
