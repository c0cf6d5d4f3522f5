//! Locating the daemon executable on disk.

use std::path::PathBuf;

/// Port for resolving the daemon executable's path.
///
/// Isolation rules are bound to this path, so it has to be resolved before
/// any rule is touched.
pub trait ExecutableLocatorPort: Send + Sync {
    /// Absolute path of the daemon executable, if it can be found.
    fn locate(&self) -> Option<PathBuf>;
}
