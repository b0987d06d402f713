// Roots & Blocklist - caller-owned configuration resolved into a JobSpec

use super::job::Mode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A configured filesystem root with per-mode permission flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Root {
    pub path: PathBuf,
    #[serde(default)]
    pub remove_languages_here: bool,
    #[serde(default)]
    pub remove_architectures_here: bool,
}

impl Root {
    pub fn new(path: impl Into<PathBuf>, languages: bool, architectures: bool) -> Self {
        Self {
            path: path.into(),
            remove_languages_here: languages,
            remove_architectures_here: architectures,
        }
    }

    /// Whether this root is an include root for `mode`
    pub fn includes(&self, mode: Mode) -> bool {
        match mode {
            Mode::Languages => self.remove_languages_here,
            Mode::Architectures => self.remove_architectures_here,
        }
    }
}

/// Split roots into (includes, excludes) for `mode`.
///
/// A root whose flag for the mode is off protects its subtree.
pub fn resolve_roots(roots: &[Root], mode: Mode) -> (Vec<PathBuf>, Vec<PathBuf>) {
    roots
        .iter()
        .fold((Vec::new(), Vec::new()), |(mut inc, mut exc), root| {
            if root.includes(mode) {
                inc.push(root.path.clone());
            } else {
                exc.push(root.path.clone());
            }
            (inc, exc)
        })
}

/// A bundle exempt from modification in one or both modes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlocklistEntry {
    pub bundle_identifier: String,
    #[serde(default)]
    pub applies_to_languages: bool,
    #[serde(default)]
    pub applies_to_architectures: bool,
}

impl BlocklistEntry {
    pub fn applies_to(&self, mode: Mode) -> bool {
        match mode {
            Mode::Languages => self.applies_to_languages,
            Mode::Architectures => self.applies_to_architectures,
        }
    }
}

/// Project the merged blocklist onto the bundle ids relevant for `mode`
pub fn blocklist_for_mode(entries: &[BlocklistEntry], mode: Mode) -> BTreeSet<String> {
    entries
        .iter()
        .filter(|e| e.applies_to(mode))
        .map(|e| e.bundle_identifier.clone())
        .collect()
}
