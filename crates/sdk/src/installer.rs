//! Installer Port
//! Provisions (installs, upgrades or launches) the privileged helper

use crate::error::Result;
use async_trait::async_trait;

/// Helper provisioning interface
///
/// Implementations:
/// - `SpawnHelper` (cli): launches the helper binary
/// - Platform installers (launchd blessing, signing) live outside this crate
#[async_trait]
pub trait Installer: Send + Sync {
    /// Make a helper of the requester's version reachable on the socket
    async fn install(&self) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::SdkError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Counts calls; optionally always fails
    #[derive(Default)]
    pub struct MockInstaller {
        calls: AtomicU32,
        fail: bool,
    }

    impl MockInstaller {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail: true,
            }
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Installer for MockInstaller {
        async fn install(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SdkError::Install("mock installer failure".to_string()))
            } else {
                Ok(())
            }
        }
    }
}
