//! Filesystem services used by the harness.

use crate::Result;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that redirects the scratch directory.
pub const TEST_TMPDIR_ENV: &str = "TEST_TMPDIR";

/// Directory name used under the system temp dir when no override is set.
const DEFAULT_TEST_DIR_NAME: &str = "sstfuzztest";

/// Minimal filesystem capability set needed to produce and discard artifacts.
pub trait FileSystem {
    /// Returns a directory that scratch files may be written to, creating it
    /// if it does not exist.
    fn test_directory(&self) -> Result<PathBuf>;

    /// Removes a file.
    fn delete_file(&self, path: &Path) -> Result<()>;
}

/// The process's local filesystem.
#[derive(Debug, Clone, Default)]
pub struct DefaultFileSystem {
    root: Option<PathBuf>,
}

impl DefaultFileSystem {
    /// Scratch directory resolved from `TEST_TMPDIR`, falling back to the
    /// system temp dir.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch directory pinned to `root`, ignoring the environment.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl FileSystem for DefaultFileSystem {
    fn test_directory(&self) -> Result<PathBuf> {
        let dir = match &self.root {
            Some(root) => root.clone(),
            None => resolve_test_directory(std::env::var_os(TEST_TMPDIR_ENV)),
        };
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "resolved test directory");
        Ok(dir)
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Picks the scratch directory from an optional `TEST_TMPDIR` value. Empty
/// values are treated as unset.
pub fn resolve_test_directory(override_dir: Option<OsString>) -> PathBuf {
    match override_dir {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir().join(DEFAULT_TEST_DIR_NAME),
    }
}
