// Slimdown Infrastructure - Filesystem Adapters
// Implements: BundleInspector, Trash, SymbolStripper

pub mod plist_inspector;
pub mod strip_tool;
pub mod user_trash;

pub use plist_inspector::PlistBundleInspector;
pub use strip_tool::StripTool;
pub use user_trash::UserTrash;
