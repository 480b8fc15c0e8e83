//! The dependency scanner oracle: a process-wide cache around an external
//! scanner library, keyed on (working directory, argv), with CAS-path
//! consistency tracked across the whole process lifetime independent of any
//! single request's cache key.

use crate::{
    error::{DriverError, Result},
    imdg::InterModuleDependencyGraph,
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScannerSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScannerDiagnostic {
    pub severity: ScannerSeverity,
    pub message: String,
}

impl ScannerDiagnostic {
    /// The `tracing` level this diagnostic surfaces at, so scanner output
    /// reaches the same logging path as everything else instead of being a
    /// dead-end data structure.
    pub fn log(&self) {
        match self.severity {
            ScannerSeverity::Error => error!(scanner = true, "{}", self.message),
            ScannerSeverity::Warning => warn!(scanner = true, "{}", self.message),
        }
    }
}

/// What the external scanner library actually does, kept as a trait so
/// tests can supply a fake without a real scanner binary.
pub trait ScanLibrary: Send + Sync {
    fn supports_caching(&self) -> bool;
    fn supports_binary_header_deps(&self) -> bool;
    fn scan(&self, working_dir: &Path, command_line: &[String]) -> Result<InterModuleDependencyGraph>;
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct RequestKey {
    working_dir: PathBuf,
    command_line: Vec<String>,
}

/// The process-wide oracle: `verify_or_create` is idempotent, and two
/// `get_dependencies` calls with equal working directory and argv return
/// the same IMDG without re-invoking the scan library.
pub struct ScannerOracle {
    lib_path: Mutex<Option<PathBuf>>,
    cache: Mutex<HashMap<RequestKey, InterModuleDependencyGraph>>,
    /// The `-cas-path` established by the first call that named one; every
    /// later call naming a different one conflicts, regardless of what
    /// else is on its command line.
    established_cas_path: Mutex<Option<PathBuf>>,
    diagnostics: Mutex<Vec<ScannerDiagnostic>>,
    library: Box<dyn ScanLibrary>,
}

impl ScannerOracle {
    pub fn new(library: Box<dyn ScanLibrary>) -> Self {
        Self {
            lib_path: Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
            established_cas_path: Mutex::new(None),
            diagnostics: Mutex::new(Vec::new()),
            library,
        }
    }

    /// Idempotent: repeated calls with the same `lib_path` succeed without
    /// re-initializing. Fails if the library is absent.
    pub fn verify_or_create(&self, lib_path: &Path) -> Result<bool> {
        if !lib_path.exists() {
            return Err(DriverError::ScannerLibraryNotPresent(lib_path.to_path_buf()));
        }
        let mut guard = self.lib_path.lock().unwrap();
        *guard = Some(lib_path.to_path_buf());
        Ok(true)
    }

    pub fn supports_caching(&self) -> bool {
        self.library.supports_caching()
    }

    pub fn supports_binary_header_deps(&self) -> bool {
        self.library.supports_binary_header_deps()
    }

    /// Scans `working_dir`/`command_line`, reusing a cached result for an
    /// identical request. Fails with [`DriverError::ConflictingCasOptions`]
    /// if a later call names a different `-cas-path` for an otherwise
    /// identical request (the same logical scan against the same CAS
    /// store must use one consistent set of CAS options).
    pub fn get_dependencies(
        &self,
        working_dir: &Path,
        command_line: &[String],
    ) -> Result<InterModuleDependencyGraph> {
        if !self.supports_caching() && command_line.iter().any(|a| a == "-cache-compile-job") {
            return Err(DriverError::ScannerCachingUnsupported);
        }

        if let Some(cas_path) = extract_cas_path(command_line) {
            let mut established = self.established_cas_path.lock().unwrap();
            match established.as_ref() {
                Some(existing) if *existing != cas_path => {
                    self.diagnostics.lock().unwrap().push(ScannerDiagnostic {
                        severity: ScannerSeverity::Error,
                        message: "CAS error encountered: conflicting CAS options used in scanning service".into(),
                    });
                    return Err(DriverError::ConflictingCasOptions);
                }
                Some(_) => {}
                None => *established = Some(cas_path),
            }
        }

        let key = RequestKey { working_dir: working_dir.to_path_buf(), command_line: command_line.to_vec() };

        let mut cache = self.cache.lock().unwrap();
        if let Some(existing) = cache.get(&key) {
            return Ok(existing.clone());
        }

        let graph = self.library.scan(working_dir, command_line)?;
        cache.insert(key, graph.clone());
        Ok(graph)
    }

    pub fn get_scanner_diagnostics(&self) -> Vec<ScannerDiagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }
}

fn extract_cas_path(command_line: &[String]) -> Option<PathBuf> {
    command_line
        .iter()
        .position(|a| a == "-cas-path")
        .and_then(|i| command_line.get(i + 1))
        .map(PathBuf::from)
}
