#![forbid(unsafe_code)]

//! `weave` command line: drive a view-model from JSON files.
//!
//! - `weave run` mounts a template over data and prints the rendered HTML
//!   after construction and after every script step.
//! - `weave watch` watches one path and prints each `(new, old)` pair.
//! - `weave check` lists the bindings a template declares and validates
//!   their paths.

pub mod check;
pub mod cli;
pub mod error;
pub mod logging;
pub mod run;
pub mod script;
pub mod watch;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

pub use cli::{Cli, Commands, run, run_from_env};
pub use error::{CliError, Result};

/// Read and parse a JSON file, failing with [`CliError::MissingPath`] when
/// it does not exist.
pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(CliError::MissingPath {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
