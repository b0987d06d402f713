//! SDK Error Types

use slimdown_ipc::IpcError;
use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Helper error ({code}): {message}")]
    Helper { code: i32, message: String },

    #[error("Version mismatch: expected {expected}, helper reports {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Helper installation failed: {0}")]
    Install(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IpcError> for SdkError {
    fn from(e: IpcError) -> Self {
        match e {
            IpcError::Io(e) => SdkError::Transport(e.to_string()),
            IpcError::Codec(e) => SdkError::Serialization(e),
            other => SdkError::Transport(other.to_string()),
        }
    }
}
