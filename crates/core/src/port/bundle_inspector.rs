// Bundle Inspector Port
// Resolves a bundle directory to its bundle identifier (Info.plist lookup lives in infra)

use std::path::Path;

/// Bundle inspector interface
///
/// Implementations:
/// - PlistBundleInspector (infra-fs): reads `CFBundleIdentifier` from Info.plist
pub trait BundleInspector: Send + Sync {
    /// Bundle identifier of the bundle rooted at `bundle_path`, if it has one
    fn bundle_identifier(&self, bundle_path: &Path) -> Option<String>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Fixed path -> identifier table
    #[derive(Default)]
    pub struct StaticBundleInspector {
        ids: HashMap<PathBuf, String>,
    }

    impl StaticBundleInspector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_bundle(mut self, path: impl Into<PathBuf>, id: impl Into<String>) -> Self {
            self.ids.insert(path.into(), id.into());
            self
        }
    }

    impl BundleInspector for StaticBundleInspector {
        fn bundle_identifier(&self, bundle_path: &Path) -> Option<String> {
            self.ids.get(bundle_path).cloned()
        }
    }
}
