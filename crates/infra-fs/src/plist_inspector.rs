// Bundle inspector backed by Info.plist
use slimdown_core::port::BundleInspector;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate Info.plist locations, relative to the bundle root.
/// macOS app bundles use `Contents/`, frameworks `Resources/`, iOS-style
/// bundles keep it at the top level.
const INFO_PLIST_LOCATIONS: &[&str] = &[
    "Contents/Info.plist",
    "Resources/Info.plist",
    "Info.plist",
];

const BUNDLE_ID_KEY: &str = "CFBundleIdentifier";

/// Reads `CFBundleIdentifier` from a bundle's Info.plist (XML or binary)
#[derive(Debug, Default, Clone, Copy)]
pub struct PlistBundleInspector;

impl PlistBundleInspector {
    pub fn new() -> Self {
        Self
    }

    fn info_plist(bundle_path: &Path) -> Option<PathBuf> {
        INFO_PLIST_LOCATIONS
            .iter()
            .map(|rel| bundle_path.join(rel))
            .find(|p| p.is_file())
    }
}

impl BundleInspector for PlistBundleInspector {
    fn bundle_identifier(&self, bundle_path: &Path) -> Option<String> {
        let plist_path = Self::info_plist(bundle_path)?;
        let value = match plist::Value::from_file(&plist_path) {
            Ok(value) => value,
            Err(e) => {
                debug!(path = %plist_path.display(), error = %e, "Unreadable Info.plist");
                return None;
            }
        };
        value
            .as_dictionary()?
            .get(BUNDLE_ID_KEY)?
            .as_string()
            .map(str::to_string)
    }
}
