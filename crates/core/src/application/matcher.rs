// Path Matcher - include / exclude / blocklist resolution for one job

use crate::domain::{is_bundle_path, normalize, JobSpec, PROTECTED_PATHS};
use crate::port::BundleInspector;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Outcome of classifying a path against a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Eligible,
    Excluded,
    Blocklisted,
}

/// Pure classifier over a job's include/exclude/blocklist sets.
///
/// Evaluation order is fixed: exclude, then blocklist, then include. An
/// exclude root therefore wins even when an include root is more specific.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    includes: Vec<PathBuf>,
    excludes: Vec<PathBuf>,
    blocklist: BTreeSet<String>,
}

impl PathMatcher {
    /// Build a matcher for `spec`; protected system paths are always excluded
    pub fn new(spec: &JobSpec) -> Self {
        let excludes = spec
            .excludes
            .iter()
            .map(|p| normalize(p))
            .chain(PROTECTED_PATHS.iter().map(PathBuf::from))
            .collect();

        Self {
            includes: spec.includes.iter().map(|p| normalize(p)).collect(),
            excludes,
            blocklist: spec.blocklist.clone(),
        }
    }

    /// Classify `path`, given the identifier of the bundle rooted exactly at
    /// `path` (if it is one).
    ///
    /// Ancestors are not inspected: the traversal prunes at bundle roots, so
    /// anything it visits below a bundle already passed this check.
    pub fn classify(&self, path: &Path, bundle_id: Option<&str>) -> Classification {
        let path = normalize(path);
        if self.is_excluded(&path) {
            return Classification::Excluded;
        }
        if bundle_id.is_some_and(|id| self.blocklist.contains(id)) {
            return Classification::Blocklisted;
        }
        self.include_check(&path)
    }

    /// Classify a standalone path, resolving every enclosing bundle through
    /// `inspector`.
    pub fn classify_with(&self, path: &Path, inspector: &dyn BundleInspector) -> Classification {
        let path = normalize(path);
        if self.is_excluded(&path) {
            return Classification::Excluded;
        }
        if !self.blocklist.is_empty() {
            let blocked = path
                .ancestors()
                .filter(|p| is_bundle_path(p))
                .filter_map(|p| inspector.bundle_identifier(p))
                .any(|id| self.blocklist.contains(&id));
            if blocked {
                return Classification::Blocklisted;
            }
        }
        self.include_check(&path)
    }

    /// Whether `path` lies under an exclude root (component-wise prefix)
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excludes.iter().any(|root| path.starts_with(root))
    }

    /// Whether the active-mode blocklist has any entries
    pub fn has_blocklist(&self) -> bool {
        !self.blocklist.is_empty()
    }

    /// Include roots to walk: normalized, deduplicated, nested roots dropped
    pub fn walk_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.includes.clone();
        roots.sort();
        roots.dedup();

        let mut out: Vec<PathBuf> = Vec::with_capacity(roots.len());
        for root in roots {
            // Sorted order puts a parent before its descendants
            if !out.iter().any(|kept| root.starts_with(kept)) {
                out.push(root);
            }
        }
        out
    }

    fn include_check(&self, path: &Path) -> Classification {
        if self.includes.iter().any(|root| path.starts_with(root)) {
            Classification::Eligible
        } else {
            // Outside every include root: never eligible
            Classification::Excluded
        }
    }
}
