// Trash Port
// Moves an item to a recoverable location instead of deleting it

use std::io;
use std::path::{Path, PathBuf};

/// Trash interface
///
/// Implementations:
/// - UserTrash (infra-fs): the requesting user's trash directory
pub trait Trash: Send + Sync {
    /// Move `path` into the trash of user `uid` (or the process owner when None).
    /// Returns the new location.
    fn move_to_trash(&self, path: &Path, uid: Option<u32>) -> io::Result<PathBuf>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Renames items into a fixed directory and remembers them
    pub struct DirTrash {
        dir: PathBuf,
        moved: Mutex<Vec<PathBuf>>,
    }

    impl DirTrash {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self {
                dir: dir.into(),
                moved: Mutex::new(Vec::new()),
            }
        }

        pub fn moved(&self) -> Vec<PathBuf> {
            self.moved.lock().unwrap().clone()
        }
    }

    impl Trash for DirTrash {
        fn move_to_trash(&self, path: &Path, _uid: Option<u32>) -> io::Result<PathBuf> {
            let mut moved = self.moved.lock().unwrap();
            let name = path
                .file_name()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no file name"))?;
            let dest = self.dir.join(format!("{}-{}", moved.len(), name.to_string_lossy()));
            std::fs::rename(path, &dest)?;
            moved.push(path.to_path_buf());
            Ok(dest)
        }
    }

    /// Refuses every move
    pub struct FailingTrash;

    impl Trash for FailingTrash {
        fn move_to_trash(&self, _path: &Path, _uid: Option<u32>) -> io::Result<PathBuf> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "trash unavailable"))
        }
    }
}
