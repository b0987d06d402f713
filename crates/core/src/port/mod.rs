// Port Layer - Interfaces for external dependencies

pub mod bundle_inspector;
pub mod id_provider; // For deterministic testing
pub mod progress_sink;
pub mod symbol_stripper;
pub mod trash;

// Re-exports
pub use bundle_inspector::BundleInspector;
pub use id_provider::IdProvider;
pub use progress_sink::ProgressSink;
pub use symbol_stripper::{StripError, SymbolStripper};
pub use trash::Trash;
