// Language Remover - deletes or trashes one matched language folder

use crate::domain::{enclosing_bundle_name, JobSpec, ProgressEvent};
use crate::error::{AppError, Result};
use crate::port::Trash;
use crate::AUDIT_TARGET;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

pub struct LanguageRemover {
    trash: Arc<dyn Trash>,
}

impl LanguageRemover {
    pub fn new(trash: Arc<dyn Trash>) -> Self {
        Self { trash }
    }

    /// Remove one candidate and report what it freed.
    ///
    /// A candidate that no longer exists yields a zero-byte event. An event is
    /// emitted even when nothing was freed so per-item counts stay accurate.
    ///
    /// # Errors
    /// - `AppError::Filesystem` if sizing, deleting or trashing fails
    pub fn remove(&self, candidate: &Path, spec: &JobSpec) -> Result<ProgressEvent> {
        let bundle_name = enclosing_bundle_name(candidate);

        let size = match disk_usage(candidate) {
            Ok(size) => size,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %candidate.display(), "Already gone, nothing to remove");
                return Ok(ProgressEvent::new(candidate, 0).with_bundle_name(bundle_name));
            }
            Err(e) => return Err(AppError::filesystem(candidate, e)),
        };

        if spec.dry_run {
            info!(
                target: AUDIT_TARGET,
                path = %candidate.display(),
                bytes = size,
                "Would remove language folder (dry run)"
            );
        } else if spec.trash_instead_of_delete {
            match self.trash.move_to_trash(candidate, spec.uid) {
                Ok(dest) => info!(
                    target: AUDIT_TARGET,
                    path = %candidate.display(),
                    trashed_to = %dest.display(),
                    bytes = size,
                    "Moved language folder to trash"
                ),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(ProgressEvent::new(candidate, 0).with_bundle_name(bundle_name));
                }
                Err(e) => return Err(AppError::filesystem(candidate, e)),
            }
        } else {
            match delete(candidate) {
                Ok(()) => info!(
                    target: AUDIT_TARGET,
                    path = %candidate.display(),
                    bytes = size,
                    "Removed language folder"
                ),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(ProgressEvent::new(candidate, 0).with_bundle_name(bundle_name));
                }
                Err(e) => return Err(AppError::filesystem(candidate, e)),
            }
        }

        Ok(ProgressEvent::new(candidate, size).with_bundle_name(bundle_name))
    }
}

/// Logical size of `path` in bytes; directories are summed recursively.
/// Symlinks count as themselves and are never followed.
pub fn disk_usage(path: &Path) -> io::Result<u64> {
    let meta = path.symlink_metadata()?;
    if !meta.is_dir() {
        return Ok(meta.len());
    }

    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| io::Error::other("filesystem loop detected"))
        })?;
        if !entry.file_type().is_dir() {
            total += entry.metadata().map_err(io::Error::from)?.len();
        }
    }
    Ok(total)
}

fn delete(path: &Path) -> io::Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
