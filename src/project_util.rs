//! Test-only scaffolding for throwaway driver workspaces: disposable
//! directories built from `tempfile` for integration tests.

use crate::error::Result;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// A throwaway directory tree with a working/scratch split, torn down on
/// drop via `TempDir`.
pub struct TestWorkspace {
    _root: TempDir,
    pub working_dir: PathBuf,
    pub scratch_dir: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let root = tempfile::tempdir()?;
        let working_dir = root.path().join("src");
        let scratch_dir = root.path().join("scratch");
        fs::create_dir_all(&working_dir)?;
        fs::create_dir_all(&scratch_dir)?;
        Ok(Self { _root: root, working_dir, scratch_dir })
    }

    /// Writes `contents` to `relative` under the working directory,
    /// creating parent directories as needed, and returns the absolute
    /// path.
    pub fn write_source(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.working_dir.join(relative);
        crate::utils::create_parent_dir_all(&path)?;
        fs::write(&path, contents)?;
        Ok(path)
    }
}
