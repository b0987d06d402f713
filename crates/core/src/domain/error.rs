// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unknown architecture: {0}")]
    UnknownArchitecture(String),

    #[error("Path must be absolute: {0}")]
    RelativePath(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
