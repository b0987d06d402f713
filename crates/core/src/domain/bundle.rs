// Bundle detection, protected system paths and lexical path helpers

use std::path::{Component, Path, PathBuf};

/// Directory extensions that denote an application or component bundle
pub const BUNDLE_EXTENSIONS: &[&str] = &[
    "app",
    "appex",
    "bundle",
    "component",
    "framework",
    "kext",
    "mdimporter",
    "plugin",
    "prefPane",
    "qlgenerator",
    "saver",
    "service",
    "systemextension",
    "xpc",
];

/// OS-immutable locations, excluded from every job regardless of caller input
pub const PROTECTED_PATHS: &[&str] = &[
    "/System",
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/usr/lib",
    "/usr/libexec",
    "/usr/share",
    "/usr/standalone",
    "/Library/Apple",
    "/private/var/db/dyld",
];

/// Whether `path` names a bundle directory (by extension only)
pub fn is_bundle_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| BUNDLE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Display name of the nearest bundle strictly above `path`
/// (`/Applications/Foo.app/Contents/Resources/fr.lproj` -> `Foo`)
pub fn enclosing_bundle_name(path: &Path) -> Option<String> {
    path.ancestors()
        .skip(1)
        .find(|p| is_bundle_path(p))
        .and_then(|p| p.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Lexically normalize an absolute path: drops `.` and resolves `..`
/// without touching the filesystem (targets may not exist).
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
