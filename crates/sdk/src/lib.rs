//! Slimdown SDK - Requester Library
//!
//! Talks to the privileged helper: handshake, job submission, progress
//! streaming and cancellation.
//!
//! # Example
//!
//! ```no_run
//! use slimdown_core::application::CancelToken;
//! use slimdown_core::domain::{Mode, Root};
//! use slimdown_sdk::{build_job, installer::mocks::MockInstaller, JobOptions, Requester};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let roots = vec![Root::new("/Applications", true, false)];
//!     let job = build_job(Mode::Languages, ["fr.lproj"], &roots, &[], JobOptions::default());
//!
//!     let requester = Requester::new("/var/run/slimdown/helper.sock", Arc::new(MockInstaller::new()));
//!     let result = requester
//!         .run(&job, CancelToken::never(), |update| println!("{:?}", update))
//!         .await?;
//!
//!     println!("Freed {} bytes ({})", result.total_bytes_freed, result.status);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
pub mod installer;
mod requester;
pub mod session;
mod types;

pub use client::{HelperClient, RunningJob};
pub use error::{Result, SdkError};
pub use installer::Installer;
pub use requester::Requester;
pub use session::{Effect, SessionEvent, SessionMachine, SessionState};
pub use types::{
    build_job, load_blocklist, load_roots, parse_blocklist, HelperVersion, JobOptions, JobUpdate,
};
