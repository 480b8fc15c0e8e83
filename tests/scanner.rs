//! Exercises the scanner oracle's idempotent cache and CAS-conflict
//! detection.

use moddriver::{
    error::DriverError,
    imdg::InterModuleDependencyGraph,
    scanner::{ScanLibrary, ScannerOracle},
};
use std::path::Path;

struct FakeScanner;

impl ScanLibrary for FakeScanner {
    fn supports_caching(&self) -> bool {
        true
    }

    fn supports_binary_header_deps(&self) -> bool {
        true
    }

    fn scan(&self, _working_dir: &Path, _command_line: &[String]) -> moddriver::error::Result<InterModuleDependencyGraph> {
        Ok(InterModuleDependencyGraph::default())
    }
}

#[test]
fn repeated_calls_with_distinct_cas_paths_conflict() {
    let oracle = ScannerOracle::new(Box::new(FakeScanner));
    let working_dir = Path::new("/tmp/project");

    let first = oracle.get_dependencies(
        working_dir,
        &["-cache-compile-job".into(), "-cas-path".into(), "/cas/a".into()],
    );
    assert!(first.is_ok());

    let second = oracle.get_dependencies(
        working_dir,
        &["-cache-compile-job".into(), "-cas-path".into(), "/cas/b".into()],
    );
    assert!(matches!(second, Err(DriverError::ConflictingCasOptions)));

    let diagnostics = oracle.get_scanner_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].message,
        "CAS error encountered: conflicting CAS options used in scanning service"
    );
}

#[test]
fn repeated_identical_calls_are_cached() {
    let oracle = ScannerOracle::new(Box::new(FakeScanner));
    let working_dir = Path::new("/tmp/project");
    let argv = vec!["-I".to_string(), "include".to_string()];

    let first = oracle.get_dependencies(working_dir, &argv).unwrap();
    let second = oracle.get_dependencies(working_dir, &argv).unwrap();
    assert_eq!(first.modules.len(), second.modules.len());
}

#[test]
fn verify_or_create_is_idempotent_and_fails_on_missing_library() {
    let oracle = ScannerOracle::new(Box::new(FakeScanner));
    let missing = Path::new("/does/not/exist/libscan.so");
    assert!(oracle.verify_or_create(missing).is_err());
}
