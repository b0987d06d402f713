// Traversal Engine - lazy depth-first walk yielding removal candidates

use crate::application::matcher::{Classification, PathMatcher};
use crate::application::runner::constants::MAX_WALK_DEPTH;
use crate::application::runner::CancelToken;
use crate::domain::{is_bundle_path, JobSpec, JobTarget};
use crate::error::{AppError, Result};
use crate::port::BundleInspector;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// What kind of work a candidate needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// A file or directory named like a targeted language folder
    LanguageFolder,
    /// A regular file that may be a universal binary
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub kind: CandidateKind,
}

/// Walks a job's include roots.
///
/// Excluded and blocklisted directories are pruned before descent, so a
/// blocklisted bundle's children are never visited. Symlinks are not followed.
pub struct Traversal<'a> {
    spec: &'a JobSpec,
    matcher: &'a PathMatcher,
    inspector: &'a dyn BundleInspector,
    cancel: &'a CancelToken,
}

impl<'a> Traversal<'a> {
    pub fn new(
        spec: &'a JobSpec,
        matcher: &'a PathMatcher,
        inspector: &'a dyn BundleInspector,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            spec,
            matcher,
            inspector,
            cancel,
        }
    }

    /// Lazy, finite, non-restartable sequence of candidates.
    ///
    /// Walk errors (unreadable directories etc.) are yielded as per-item
    /// `AppError::Filesystem` and the walk continues. Once cancellation is
    /// requested every remaining entry is pruned.
    pub fn candidates(self) -> impl Iterator<Item = Result<Candidate>> + 'a {
        let Traversal {
            spec,
            matcher,
            inspector,
            cancel,
        } = self;

        matcher
            .walk_roots()
            .into_iter()
            .filter(|root| {
                let exists = root.symlink_metadata().is_ok();
                if !exists {
                    warn!(root = %root.display(), "Include root does not exist, skipping");
                }
                exists
            })
            .filter(move |root| {
                // The walk only inspects bundles at or below the root; a root
                // inside a blocklisted bundle is caught here
                let blocked = matcher.has_blocklist()
                    && matcher.classify_with(root, inspector) == Classification::Blocklisted;
                if blocked {
                    warn!(
                        root = %root.display(),
                        "Include root lies in a blocklisted bundle, skipping"
                    );
                }
                !blocked
            })
            .flat_map(move |root| walk_root(root, spec, matcher, inspector, cancel))
    }
}

fn walk_root<'a>(
    root: PathBuf,
    spec: &'a JobSpec,
    matcher: &'a PathMatcher,
    inspector: &'a dyn BundleInspector,
    cancel: &'a CancelToken,
) -> impl Iterator<Item = Result<Candidate>> + 'a {
    let language_folders: Option<&'a BTreeSet<String>> = match &spec.target {
        JobTarget::Languages { language_folders } => Some(language_folders),
        JobTarget::Architectures { .. } => None,
    };

    WalkDir::new(root)
        .follow_links(false)
        .max_depth(MAX_WALK_DEPTH)
        .into_iter()
        .filter_entry(move |entry| {
            should_visit(entry, language_folders, matcher, inspector, cancel)
        })
        .filter_map(move |item| match item {
            Ok(entry) => {
                if entry.depth() == MAX_WALK_DEPTH && entry.file_type().is_dir() {
                    if let Some(err) = depth_limit_error(&entry, language_folders) {
                        return Some(Err(err));
                    }
                }
                to_candidate(entry, language_folders).map(Ok)
            }
            Err(err) => {
                let path = err.path().map(PathBuf::from).unwrap_or_default();
                let io_err = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                Some(Err(AppError::filesystem(path, io_err)))
            }
        })
}

/// Pruning predicate, evaluated before an entry is yielded or descended into
fn should_visit(
    entry: &DirEntry,
    language_folders: Option<&BTreeSet<String>>,
    matcher: &PathMatcher,
    inspector: &dyn BundleInspector,
    cancel: &CancelToken,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }

    // Never descend into a matched language folder: it is removed as a whole
    if let Some(folders) = language_folders {
        if entry.depth() > 0 {
            let parent_matched = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .is_some_and(|n| folders.contains(n));
            if parent_matched {
                return false;
            }
        }
    }

    let path = entry.path();
    let bundle_id = if entry.file_type().is_dir() && matcher.has_blocklist() && is_bundle_path(path)
    {
        inspector.bundle_identifier(path)
    } else {
        None
    };

    match matcher.classify(path, bundle_id.as_deref()) {
        Classification::Eligible => true,
        Classification::Excluded => {
            debug!(path = %path.display(), "Pruning excluded path");
            false
        }
        Classification::Blocklisted => {
            debug!(
                path = %path.display(),
                bundle_id = bundle_id.as_deref().unwrap_or_default(),
                "Pruning blocklisted bundle"
            );
            false
        }
    }
}

/// A directory at the depth limit whose contents the walk will not see.
/// Matched language folders are removed whole and need no descent.
fn depth_limit_error(
    entry: &DirEntry,
    language_folders: Option<&BTreeSet<String>>,
) -> Option<AppError> {
    let matched = language_folders.is_some_and(|folders| {
        entry
            .file_name()
            .to_str()
            .is_some_and(|name| folders.contains(name))
    });
    if matched {
        return None;
    }
    let has_children = std::fs::read_dir(entry.path())
        .map(|mut dir| dir.next().is_some())
        .unwrap_or(false);
    if !has_children {
        return None;
    }
    warn!(
        path = %entry.path().display(),
        max_depth = MAX_WALK_DEPTH,
        "Directory nesting too deep, contents skipped"
    );
    Some(AppError::filesystem(
        entry.path(),
        std::io::Error::other(format!(
            "nesting deeper than {} levels, contents not visited",
            MAX_WALK_DEPTH
        )),
    ))
}

fn to_candidate(entry: DirEntry, language_folders: Option<&BTreeSet<String>>) -> Option<Candidate> {
    match language_folders {
        Some(folders) => {
            let name = entry.file_name().to_str()?;
            if entry.depth() > 0 && folders.contains(name) {
                Some(Candidate {
                    path: entry.into_path(),
                    kind: CandidateKind::LanguageFolder,
                })
            } else {
                None
            }
        }
        None => entry.file_type().is_file().then(|| Candidate {
            path: entry.into_path(),
            kind: CandidateKind::Binary,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::runner::cancel_channel;
    use crate::port::bundle_inspector::mocks::StaticBundleInspector;
    use std::fs;
    use std::path::Path;

    fn touch(path: &Path, bytes: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'x'; bytes]).unwrap();
    }

    fn collect(spec: &JobSpec, inspector: &dyn BundleInspector) -> Vec<PathBuf> {
        let matcher = PathMatcher::new(spec);
        let cancel = CancelToken::never();
        let mut out: Vec<PathBuf> = Traversal::new(spec, &matcher, inspector, &cancel)
            .candidates()
            .map(|c| c.unwrap().path)
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_language_folders_exact_name_match() {
        let dir = tempfile::tempdir().unwrap();
        let res = dir.path().join("Foo.app/Contents/Resources");
        touch(&res.join("fr.lproj/a.strings"), 10);
        touch(&res.join("en.lproj/a.strings"), 10);
        touch(&res.join("xfr.lproj/a.strings"), 10);
        touch(&res.join("fr.lproj.bak/a.strings"), 10);

        let spec = JobSpec::languages(vec![dir.path().to_path_buf()], ["fr.lproj"]);
        let found = collect(&spec, &StaticBundleInspector::new());
        assert_eq!(found, vec![res.join("fr.lproj")]);
    }

    #[test]
    fn test_nested_language_folder_not_yielded_twice() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("A.app/fr.lproj/fr.lproj/x"), 1);

        let spec = JobSpec::languages(vec![dir.path().to_path_buf()], ["fr.lproj"]);
        let found = collect(&spec, &StaticBundleInspector::new());
        assert_eq!(found, vec![dir.path().join("A.app/fr.lproj")]);
    }

    #[test]
    fn test_excluded_subtree_pruned() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Keep.app/fr.lproj/a"), 1);
        touch(&dir.path().join("Skip/Other.app/fr.lproj/a"), 1);

        let spec = JobSpec::languages(vec![dir.path().to_path_buf()], ["fr.lproj"])
            .with_excludes(vec![dir.path().join("Skip")]);
        let found = collect(&spec, &StaticBundleInspector::new());
        assert_eq!(found, vec![dir.path().join("Keep.app/fr.lproj")]);
    }

    #[test]
    fn test_blocklisted_bundle_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("Locked.app");
        touch(&locked.join("Contents/Resources/fr.lproj/a"), 1);
        touch(&dir.path().join("Open.app/Contents/Resources/fr.lproj/a"), 1);

        let inspector = StaticBundleInspector::new().with_bundle(&locked, "com.example.locked");
        let spec = JobSpec::languages(vec![dir.path().to_path_buf()], ["fr.lproj"])
            .with_blocklist(["com.example.locked"]);
        let found = collect(&spec, &inspector);
        assert_eq!(
            found,
            vec![dir.path().join("Open.app/Contents/Resources/fr.lproj")]
        );
    }

    #[test]
    fn test_root_inside_blocklisted_bundle_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("Locked.app");
        let resources = locked.join("Contents/Resources");
        touch(&resources.join("fr.lproj/a"), 1);

        let inspector = StaticBundleInspector::new().with_bundle(&locked, "com.example.locked");
        let spec = JobSpec::languages(vec![resources], ["fr.lproj"])
            .with_blocklist(["com.example.locked"]);
        assert!(collect(&spec, &inspector).is_empty());
    }

    #[test]
    fn test_too_deep_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut deep = dir.path().to_path_buf();
        for _ in 0..MAX_WALK_DEPTH {
            deep.push("d");
        }
        touch(&deep.join("unseen"), 1);

        let spec = JobSpec::architectures(vec![dir.path().to_path_buf()], ["i386"]);
        let matcher = PathMatcher::new(&spec);
        let cancel = CancelToken::never();
        let inspector = StaticBundleInspector::new();
        let items: Vec<Result<Candidate>> = Traversal::new(&spec, &matcher, &inspector, &cancel)
            .candidates()
            .collect();

        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(AppError::Filesystem { path, .. }) => assert_eq!(path, &deep),
            other => panic!("expected filesystem error, got {:?}", other),
        }
    }

    #[test]
    fn test_architectures_mode_yields_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Foo.app/Contents/MacOS/Foo"), 8);
        touch(&dir.path().join("Foo.app/Contents/Info.plist"), 8);

        let spec = JobSpec::architectures(vec![dir.path().to_path_buf()], ["i386"]);
        let found = collect(&spec, &StaticBundleInspector::new());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_include_root_itself_is_not_a_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("fr.lproj");
        touch(&root.join("x"), 1);

        let spec = JobSpec::languages(vec![root.clone()], ["fr.lproj"]);
        assert!(collect(&spec, &StaticBundleInspector::new()).is_empty());
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let spec = JobSpec::languages(vec!["/nonexistent/slimdown-test".into()], ["fr.lproj"]);
        assert!(collect(&spec, &StaticBundleInspector::new()).is_empty());
    }

    #[test]
    fn test_cancel_prunes_remaining_walk() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            touch(&dir.path().join(format!("App{}.app/fr.lproj/a", i)), 1);
        }
        let spec = JobSpec::languages(vec![dir.path().to_path_buf()], ["fr.lproj"]);
        let matcher = PathMatcher::new(&spec);
        let inspector = StaticBundleInspector::new();
        let (tx, token) = cancel_channel();
        tx.cancel();

        let count = Traversal::new(&spec, &matcher, &inspector, &token)
            .candidates()
            .count();
        assert_eq!(count, 0);
    }
}
