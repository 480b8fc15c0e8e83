//! Virtual paths: every path a job can reference is one of a small set of
//! kinds, resolved to a concrete string lazily and idempotently. An explicit
//! scoped guard (`TempScope`) handles cleanup of any materialized scratch
//! files.

use crate::error::{DriverError, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

/// A path that has not yet been resolved to a concrete filesystem location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VirtualPath {
    /// Already absolute.
    Absolute(PathBuf),
    /// Resolved against the driver's working directory.
    Relative(PathBuf),
    /// A scratch file with no required name or contents; the resolver picks
    /// a unique name in the scratch directory the first time it is
    /// resolved.
    Temporary { hint: String },
    /// A scratch file whose contents are known up front and identical
    /// content shares one file (deduplicated by content hash).
    TemporaryWithContents { hint: String, contents: Vec<u8> },
    /// A newline-separated list of other virtual paths, materialized into a
    /// scratch file when first resolved.
    FileList(Vec<VirtualPath>),
    Stdin,
    Stdout,
}

impl VirtualPath {
    pub fn absolute(path: impl Into<PathBuf>) -> Self {
        Self::Absolute(path.into())
    }

    pub fn relative(path: impl Into<PathBuf>) -> Self {
        Self::Relative(path.into())
    }

    pub fn temporary(hint: impl Into<String>) -> Self {
        Self::Temporary { hint: hint.into() }
    }

    pub fn temporary_with_contents(hint: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self::TemporaryWithContents { hint: hint.into(), contents: contents.into() }
    }
}

/// The recognized file types a [`TypedPath`] may carry. Mirrors the typed
/// products a job may produce or consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    Source,
    CompiledModule,
    ModuleInterface,
    PrivateModuleInterface,
    Object,
    Image,
    StaticArchive,
    DependencyInfo,
    PerFileDependencyRecord,
    PrecompiledHeader,
    ModuleMap,
    PrecompiledClangModule,
    AutolinkData,
    ApiBaseline,
    AbiBaseline,
    SerializedDiagnostics,
}

/// A (virtual path, file type) pair: what a job input or output actually is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedPath {
    pub path: VirtualPath,
    pub file_type: FileType,
}

impl TypedPath {
    pub fn new(path: VirtualPath, file_type: FileType) -> Self {
        Self { path, file_type }
    }
}

/// Resolves [`VirtualPath`]s to concrete strings, materializing temporaries
/// and file-lists on demand. Resolving the same virtual path twice within
/// one execution always yields the same concrete string.
pub struct PathResolver {
    working_dir: PathBuf,
    scratch_dir: PathBuf,
    counter: AtomicU64,
    resolved_temporaries: std::sync::Mutex<HashMap<VirtualPath, PathBuf>>,
    by_content_hash: std::sync::Mutex<HashMap<String, PathBuf>>,
    materialized: std::sync::Mutex<Vec<PathBuf>>,
}

impl PathResolver {
    pub fn new(working_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            scratch_dir: scratch_dir.into(),
            counter: AtomicU64::new(0),
            resolved_temporaries: Default::default(),
            by_content_hash: Default::default(),
            materialized: Default::default(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Every temporary path materialized so far; used by the executor's
    /// cleanup step.
    pub fn materialized_temporaries(&self) -> Vec<PathBuf> {
        self.materialized.lock().unwrap().clone()
    }

    pub fn resolve(&self, path: &VirtualPath) -> Result<PathBuf> {
        match path {
            VirtualPath::Absolute(p) => Ok(p.clone()),
            VirtualPath::Relative(p) => Ok(self.working_dir.join(p)),
            VirtualPath::Stdin | VirtualPath::Stdout => {
                Err(DriverError::msg("stdio virtual path has no concrete filesystem path"))
            }
            VirtualPath::Temporary { hint } => {
                if let Some(existing) = self.resolved_temporaries.lock().unwrap().get(path) {
                    return Ok(existing.clone());
                }
                let resolved = self.fresh_scratch_path(hint);
                self.resolved_temporaries.lock().unwrap().insert(path.clone(), resolved.clone());
                self.materialized.lock().unwrap().push(resolved.clone());
                Ok(resolved)
            }
            VirtualPath::TemporaryWithContents { hint, contents } => {
                if let Some(existing) = self.resolved_temporaries.lock().unwrap().get(path) {
                    return Ok(existing.clone());
                }
                let hash = crate::utils::content_hash(contents);
                let resolved = {
                    let mut by_hash = self.by_content_hash.lock().unwrap();
                    if let Some(existing) = by_hash.get(&hash) {
                        existing.clone()
                    } else {
                        let fresh = self.fresh_scratch_path(hint);
                        fs::create_dir_all(&self.scratch_dir)?;
                        fs::write(&fresh, contents)?;
                        by_hash.insert(hash, fresh.clone());
                        self.materialized.lock().unwrap().push(fresh.clone());
                        fresh
                    }
                };
                self.resolved_temporaries.lock().unwrap().insert(path.clone(), resolved.clone());
                Ok(resolved)
            }
            VirtualPath::FileList(entries) => {
                if let Some(existing) = self.resolved_temporaries.lock().unwrap().get(path) {
                    return Ok(existing.clone());
                }
                let mut lines = String::new();
                for entry in entries {
                    let resolved = self.resolve(entry)?;
                    lines.push_str(&resolved.to_string_lossy());
                    lines.push('\n');
                }
                let fresh = self.fresh_scratch_path("filelist");
                fs::create_dir_all(&self.scratch_dir)?;
                fs::write(&fresh, lines)?;
                self.resolved_temporaries.lock().unwrap().insert(path.clone(), fresh.clone());
                self.materialized.lock().unwrap().push(fresh.clone());
                Ok(fresh)
            }
        }
    }

    fn fresh_scratch_path(&self, hint: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.scratch_dir.join(format!("{n:08x}-{hint}"))
    }
}

/// A scoped guard that removes every temporary materialized through its
/// resolver on drop, unless cleanup has been suppressed. Covers both normal
/// return and unwind (a panic during job execution still triggers cleanup)
/// unless suppressed by `-save-temps` or an abnormal job exit.
pub struct TempScope<'a> {
    resolver: &'a PathResolver,
    suppress: bool,
}

impl<'a> TempScope<'a> {
    pub fn new(resolver: &'a PathResolver) -> Self {
        Self { resolver, suppress: false }
    }

    /// Suppresses cleanup, e.g. because `-save-temps` was passed or a job
    /// aborted abnormally and temporaries should be preserved for
    /// debugging.
    pub fn suppress(&mut self) {
        self.suppress = true;
    }
}

impl Drop for TempScope<'_> {
    fn drop(&mut self) {
        if self.suppress {
            return;
        }
        for path in self.resolver.materialized_temporaries() {
            let _ = fs::remove_file(&path);
        }
    }
}
