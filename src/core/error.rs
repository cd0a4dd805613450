use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollateError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory '{}' not found", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Flush worker error: {0}")]
    Worker(String),
}

impl CollateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CollateError>;

impl<T> From<std::sync::PoisonError<T>> for CollateError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
