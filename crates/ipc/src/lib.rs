//! Helper IPC Layer
//!
//! Newline-delimited JSON over a Unix domain socket between the
//! unprivileged requester and the privileged helper.

pub mod auth;
pub mod codec;
pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use error::{code, IpcError};
pub use server::{HelperServer, ServerConfig};
pub use types::{Request, Response, PROTOCOL_VERSION};
