//! IPC Error Types
//!
//! Maps application errors to protocol error codes.

use crate::types::Response;
use slimdown_core::error::AppError;
use thiserror::Error;

/// Protocol error codes carried in `error` frames
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const VERSION_MISMATCH: i32 = 4001;
    pub const INVALID_STATE: i32 = 4002;
    pub const BUSY: i32 = 4003;
    pub const ALREADY_SUBMITTED: i32 = 4004;
    pub const UNAUTHORIZED: i32 = 4010;
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// Transport-level failures
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed frame: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },

    #[error("Connection closed mid-frame")]
    Truncated,

    #[error("Peer uid {0} is not authorized")]
    Unauthorized(u32),
}

/// Convert AppError to an `error` frame
pub fn to_error_response(err: &AppError) -> Response {
    let code = match err {
        AppError::Validation(_) | AppError::Domain(_) | AppError::Serialization(_) => {
            code::VALIDATION_ERROR
        }
        AppError::VersionMismatch { .. } => code::VERSION_MISMATCH,
        AppError::InvalidState(_) => code::INVALID_STATE,
        _ => code::INTERNAL_ERROR,
    };
    Response::error(code, err.to_string())
}
