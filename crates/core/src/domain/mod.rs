// Domain Layer - Pure data model and invariants

pub mod architecture;
pub mod bundle;
pub mod error;
pub mod job;
pub mod language;
pub mod root;

// Re-exports
pub use architecture::{architecture_named, Architecture, KNOWN_ARCHITECTURES};
pub use bundle::{enclosing_bundle_name, is_bundle_path, normalize, PROTECTED_PATHS};
pub use error::DomainError;
pub use job::{
    ExitStatus, FailureKind, ItemFailure, JobEvent, JobId, JobResult, JobSpec, JobTarget, Mode,
    ProgressEvent,
};
pub use language::{Language, KNOWN_LANGUAGES};
pub use root::{blocklist_for_mode, resolve_roots, BlocklistEntry, Root};
