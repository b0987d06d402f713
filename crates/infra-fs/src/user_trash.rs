// Trash adapter: moves items into the requesting user's trash directory
use slimdown_core::port::Trash;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(target_os = "macos")]
const TRASH_SUBDIR: &str = ".Trash";
#[cfg(not(target_os = "macos"))]
const TRASH_SUBDIR: &str = ".local/share/Trash/files";

/// Give up on finding a free name after this many attempts
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Moves items into `~/.Trash` of the user the job runs for.
///
/// The helper runs as root, so the trash is resolved from the requesting
/// uid (passwd lookup) rather than from `$HOME`. A move is a single
/// `rename(2)`: items on another volume fail with an error instead of
/// being copied.
#[derive(Debug, Default, Clone)]
pub struct UserTrash {
    root: Option<PathBuf>,
}

/// Owner to hand a freshly created trash directory to
type Owner = Option<(u32, u32)>;

impl UserTrash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed trash directory (tests, sandboxes)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn trash_dir(&self, uid: Option<u32>) -> io::Result<(PathBuf, Owner)> {
        if let Some(root) = &self.root {
            return Ok((root.clone(), None));
        }
        match uid {
            Some(uid) => {
                let (home, gid) = home_of(uid)?;
                Ok((home.join(TRASH_SUBDIR), Some((uid, gid))))
            }
            None => {
                let home = dirs::home_dir().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "cannot determine home directory")
                })?;
                Ok((home.join(TRASH_SUBDIR), None))
            }
        }
    }

    fn ensure_dir(dir: &Path, owner: Owner) -> io::Result<()> {
        if dir.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(dir)?;
        if let Some((uid, gid)) = owner {
            std::os::unix::fs::chown(dir, Some(uid), Some(gid))?;
        }
        Ok(())
    }
}

impl Trash for UserTrash {
    fn move_to_trash(&self, path: &Path, uid: Option<u32>) -> io::Result<PathBuf> {
        // Fail fast on a vanished item before touching the trash directory
        path.symlink_metadata()?;

        let (dir, owner) = self.trash_dir(uid)?;
        Self::ensure_dir(&dir, owner)?;

        let name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let dest = unique_destination(&dir, Path::new(name))?;

        std::fs::rename(path, &dest).map_err(|e| {
            if e.raw_os_error() == Some(nix::errno::Errno::EXDEV as i32) {
                io::Error::other(format!(
                    "{} is on a different volume than {}",
                    path.display(),
                    dir.display()
                ))
            } else {
                e
            }
        })?;

        debug!(from = %path.display(), to = %dest.display(), "Moved to trash");
        Ok(dest)
    }
}

/// `name`, then `name 2`, `name 3`, ... keeping the extension last
fn unique_destination(dir: &Path, name: &Path) -> io::Result<PathBuf> {
    let first = dir.join(name);
    if first.symlink_metadata().is_err() {
        return Ok(first);
    }

    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = name.extension().map(|e| e.to_string_lossy().into_owned());

    for n in 2..MAX_NAME_ATTEMPTS {
        let candidate = match &ext {
            Some(ext) => dir.join(format!("{} {}.{}", stem, n, ext)),
            None => dir.join(format!("{} {}", stem, n)),
        };
        if candidate.symlink_metadata().is_err() {
            return Ok(candidate);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {} in trash", name.display()),
    ))
}

/// Home directory and primary group of `uid` from the user database
fn home_of(uid: u32) -> io::Result<(PathBuf, u32)> {
    use nix::unistd::{Uid, User};

    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => Ok((user.dir, user.gid.as_raw())),
        Ok(None) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no user with uid {}", uid),
        )),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_moves_directory_into_trash() {
        let src = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let fr = src.path().join("fr.lproj");
        fs::create_dir_all(&fr).unwrap();
        fs::write(fr.join("a.strings"), b"bonjour").unwrap();

        let dest = UserTrash::with_root(bin.path())
            .move_to_trash(&fr, None)
            .unwrap();
        assert_eq!(dest, bin.path().join("fr.lproj"));
        assert!(!fr.exists());
        assert_eq!(fs::read(dest.join("a.strings")).unwrap(), b"bonjour");
    }

    #[test]
    fn test_name_clash_gets_numbered() {
        let src = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        fs::create_dir_all(bin.path().join("fr.lproj")).unwrap();
        fs::create_dir_all(bin.path().join("fr 2.lproj")).unwrap();
        let fr = src.path().join("fr.lproj");
        fs::create_dir_all(&fr).unwrap();

        let dest = UserTrash::with_root(bin.path())
            .move_to_trash(&fr, None)
            .unwrap();
        assert_eq!(dest, bin.path().join("fr 3.lproj"));
    }

    #[test]
    fn test_creates_missing_trash_dir() {
        let src = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        let bin = base.path().join("nested/Trash");
        let file = src.path().join("Base.lproj");
        fs::write(&file, b"x").unwrap();

        UserTrash::with_root(&bin).move_to_trash(&file, None).unwrap();
        assert!(bin.join("Base.lproj").is_file());
    }

    #[test]
    fn test_missing_item_is_not_found() {
        let bin = tempfile::tempdir().unwrap();
        let err = UserTrash::with_root(bin.path())
            .move_to_trash(Path::new("/nonexistent/slimdown/fr.lproj"), None)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let bin = tempfile::tempdir().unwrap();
        fs::write(bin.path().join("Foo"), b"").unwrap();
        assert_eq!(
            unique_destination(bin.path(), Path::new("Foo")).unwrap(),
            bin.path().join("Foo 2")
        );
    }
}
