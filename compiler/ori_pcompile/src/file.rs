//! Opaque compilation-unit handles.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A source file submitted for compilation.
///
/// Equality and hashing are by path only. Cloning is an `Arc` bump, so
/// `File` can be handed to worker threads and echoed back in events
/// without re-allocating the path.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct File(Arc<PathBuf>);

impl File {
    /// Wrap a path as a compilation unit.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        File(Arc::new(path.into()))
    }

    /// Borrow the underlying path.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Path rendered relative to `base` when possible, falling back to the
    /// absolute/given path otherwise. Used for diagnostic headers.
    pub fn display_relative_to(&self, base: &Path) -> String {
        self.0
            .strip_prefix(base)
            .unwrap_or(&self.0)
            .display()
            .to_string()
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.0.display())
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for File {
    fn from(value: &str) -> Self {
        File::new(value)
    }
}

impl From<PathBuf> for File {
    fn from(value: PathBuf) -> Self {
        File::new(value)
    }
}
