use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("data must be an object, got {found}")]
    DataNotObject { found: &'static str },

    #[error(transparent)]
    Core(#[from] weave_core::Error),

    #[error(transparent)]
    View(#[from] weave_view::Error),

    #[error("method not found: {name}")]
    UnknownMethod { name: String },

    #[error("no template is mounted")]
    NotMounted,
}
