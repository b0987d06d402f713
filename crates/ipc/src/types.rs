//! Wire Request/Response Types
//!
//! Every frame is one JSON object tagged by `"type"`.

use serde::{Deserialize, Serialize};
use slimdown_core::domain::{ItemFailure, JobId, JobResult, JobSpec, ProgressEvent};

/// Bumped on any incompatible schema change; checked during the handshake
pub const PROTOCOL_VERSION: u32 = 1;

/// Requester -> helper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Handshake: ask for the helper's version
    Version,
    /// Start the one job this connection may run
    Submit { job: JobSpec },
    /// Stop the running job after the in-flight item
    Cancel,
}

/// Helper -> requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Version {
        version: String,
        protocol: u32,
    },
    Accepted {
        #[serde(rename = "jobId")]
        job_id: JobId,
    },
    Progress(ProgressEvent),
    ItemFailed(ItemFailure),
    /// Terminal frame of a job; sent exactly once
    Finished(JobResult),
    Error {
        code: i32,
        message: String,
    },
}

impl Response {
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }

    /// The helper's own handshake reply
    pub fn current_version() -> Self {
        Response::Version {
            version: slimdown_core::VERSION.to_string(),
            protocol: PROTOCOL_VERSION,
        }
    }
}
