#![forbid(unsafe_code)]

//! Dotted path expressions (`"hobby.a"`, `"list.0.name"`).

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::scope::Scope;
use crate::tracking;
use crate::value::Value;

/// A parsed, non-empty sequence of keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse `expr`, trimming surrounding whitespace. Empty expressions and
    /// empty segments (`"a..b"`, `"a."`) are rejected.
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_path(expr, "empty expression"));
        }
        let segments: Vec<String> = trimmed.split('.').map(|s| s.trim().to_owned()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(Error::invalid_path(expr, "empty segment"));
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Walk the path through tracked reads. Stops with
    /// [`Value::Undefined`] at the first segment whose parent is not a
    /// node, registering nothing past the last slot actually read.
    #[must_use]
    pub fn resolve(&self, scope: &dyn Scope) -> Value {
        let mut segments = self.segments.iter();
        let mut current = match segments.next() {
            Some(first) => scope.lookup(first),
            None => return Value::Undefined,
        };
        for segment in segments {
            current = match current.as_node() {
                Some(node) => node.get(segment),
                None => return Value::Undefined,
            };
        }
        current
    }

    /// Write `value` at the end of the path. Intermediate reads are not
    /// tracked.
    pub fn assign(&self, scope: &dyn Scope, value: Value) -> Result<()> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Ok(());
        };
        if parents.is_empty() {
            return scope.assign(last, value);
        }

        let parent = tracking::untracked(|| {
            let mut current = scope.lookup(&parents[0]);
            for segment in &parents[1..] {
                current = match current.as_node() {
                    Some(node) => node.get(segment),
                    None => Value::Undefined,
                };
            }
            current
        });

        match parent.as_node() {
            Some(node) => {
                node.set(last, value);
                Ok(())
            }
            None => Err(Error::NotComposite {
                path: parents.join("."),
            }),
        }
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
