// Application Layer - Removal engine use cases

pub mod language_remover;
pub mod matcher;
pub mod runner;
pub mod thinning;
pub mod traversal;
pub mod validation;

// Re-exports
pub use language_remover::LanguageRemover;
pub use matcher::{Classification, PathMatcher};
pub use runner::{cancel_channel, CancelSender, CancelToken, JobRunner};
pub use thinning::{ThinOptions, ThinOutcome, ThinningEngine};
pub use traversal::{Candidate, CandidateKind, Traversal};
pub use validation::validate_job;
