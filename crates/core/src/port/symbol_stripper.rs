// Symbol Stripper Port
// Removes local (non-exported) symbols from a Mach-O file in place

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StripError {
    #[error("Failed to launch strip tool: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Strip tool exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Symbol stripper interface
///
/// Implementations:
/// - StripTool (infra-fs): runs `strip -x`
pub trait SymbolStripper: Send + Sync {
    /// Strip local symbols from `path` in place. The file is a private temp
    /// copy; the caller renames it over the original only on success.
    fn strip_local_symbols(&self, path: &Path) -> Result<(), StripError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock stripper behavior
    #[derive(Debug, Clone, Copy)]
    pub enum MockBehavior {
        /// Leave the file unchanged
        Noop,
        /// Drop this many trailing bytes (pretend symbols were removed)
        Truncate(u64),
        /// Always fail
        Fail,
    }

    pub struct MockStripper {
        behavior: MockBehavior,
        calls: AtomicUsize,
    }

    impl MockStripper {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SymbolStripper for MockStripper {
        fn strip_local_symbols(&self, path: &Path) -> Result<(), StripError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                MockBehavior::Noop => Ok(()),
                MockBehavior::Truncate(n) => {
                    let file = std::fs::OpenOptions::new().write(true).open(path)?;
                    let len = file.metadata()?.len();
                    file.set_len(len.saturating_sub(n))?;
                    Ok(())
                }
                MockBehavior::Fail => Err(StripError::Failed {
                    code: Some(1),
                    stderr: "mock failure".to_string(),
                }),
            }
        }
    }
}
