// Slimdown Core - Removal Engine, Domain & Ports
// NO transport and NO OS adapters (those live in infra-fs / ipc)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tracing target for the audit trail (every mutation and per-item failure)
pub const AUDIT_TARGET: &str = "slimdown::audit";
