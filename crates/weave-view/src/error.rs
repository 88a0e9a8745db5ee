use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{directive}=\"{expr}\": {source}")]
    Binding {
        directive: String,
        expr: String,
        #[source]
        source: weave_core::Error,
    },

    #[error("template JSON error: {0}")]
    Template(#[from] serde_json::Error),

    #[error("invalid interpolation delimiters {open:?} / {close:?}")]
    Delimiters { open: String, close: String },

    #[error("no element with id `{id}`")]
    UnknownTarget { id: String },
}

impl Error {
    #[must_use]
    pub fn binding(directive: impl Into<String>, expr: impl Into<String>, source: weave_core::Error) -> Self {
        Self::Binding {
            directive: directive.into(),
            expr: expr.into(),
            source,
        }
    }
}
