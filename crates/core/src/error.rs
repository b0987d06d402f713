// Central Error Type for the Application

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
///
/// `Filesystem` and `BinaryFormat` are per-item: the runner records them and
/// moves on. `Validation` and `VersionMismatch` are fatal before a job starts.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Version mismatch: expected {expected}, helper reports {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Binary format error at {}: {reason}", path.display())]
    BinaryFormat { path: PathBuf, reason: String },

    #[error("Job cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap an I/O failure on a specific path
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only affects a single item (job continues)
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            AppError::Filesystem { .. } | AppError::BinaryFormat { .. }
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
