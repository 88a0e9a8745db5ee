use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Vm(#[from] weave::Error),

    #[error(transparent)]
    View(#[from] weave::weave_view::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("required path does not exist: {path}")]
    MissingPath { path: PathBuf },

    #[error("script step {step}: {source}")]
    Step {
        step: usize,
        #[source]
        source: Box<CliError>,
    },

    #[error("{message}")]
    Exit { code: i32, message: String },
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit { code, .. } => *code,
            Self::Step { source, .. } => source.exit_code(),
            _ => 1,
        }
    }

    #[must_use]
    pub fn exit(code: i32, message: impl Into<String>) -> Self {
        Self::Exit {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn at_step(self, step: usize) -> Self {
        Self::Step {
            step,
            source: Box::new(self),
        }
    }
}
