//! The driver's error taxonomy and the diagnostic engine that accumulates
//! planning-time diagnostics before any job runs.

use std::{fmt, path::PathBuf};

pub type Result<T, E = DriverError> = std::result::Result<T, E>;

/// Severity of a [`Diagnostic`]. Errors abort planning; warnings and notes
/// are informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A single planning/validation diagnostic. The `message` is the stable,
/// prefix-matchable string described in the error handling section; callers
/// should never need to pattern-match on anything but `message` and
/// `severity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Accumulates diagnostics emitted while parsing and validating options, and
/// while planning jobs, so that every violation is surfaced before a single
/// job is spawned.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            error!(message = %diagnostic.message, "diagnostic");
        } else {
            warn!(message = %diagnostic.message, "diagnostic");
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::error(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::warning(message));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.has_errors() {
            Err(DriverError::Diagnostics(self.diagnostics))
        } else {
            Ok(value)
        }
    }
}

/// The stable exit-code class of an error: user errors exit non-zero but
/// cleanly, crashes are bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    UserError,
    Crash,
}

/// The full error taxonomy. Each variant's `Display` impl produces the
/// stable, prefix-matchable message named in the error handling design.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// One or more accumulated diagnostics from option parsing/validation or
    /// planning.
    #[error("{}", .0.first().map(|d| d.message.as_str()).unwrap_or("unknown diagnostic"))]
    Diagnostics(Vec<Diagnostic>),

    #[error("unknown driver mode '{0}'")]
    UnknownDriverMode(String),

    #[error("unsupported configuration for caching: {module}")]
    UnsupportedConfigurationForCaching { module: String },

    #[error("missing required input for job '{0}'")]
    MissingRequiredInput(String),

    #[error("invalid output-file-map: {0}")]
    InvalidOutputFileMap(String),

    #[error("scanner library not present at '{0}'")]
    ScannerLibraryNotPresent(PathBuf),

    #[error("scanner does not support caching")]
    ScannerCachingUnsupported,

    #[error("CAS error encountered: conflicting CAS options used in scanning service")]
    ConflictingCasOptions,

    #[error("placeholder module '{0}' encountered in an explicit module build")]
    PlaceholderModuleEncountered(String),

    #[error("mismatched-serialized-graph-version(expected {expected}, read {read})")]
    MismatchedSerializedGraphVersion { expected: u32, read: u32 },

    #[error("malformed per-file dependency record: {0}")]
    MalformedDependencyRecord(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("job '{0}' crashed")]
    JobCrashed(String),

    #[error("input-unexpectedly-modified({0})")]
    InputUnexpectedlyModified(PathBuf),

    #[error("response-file materialization failed: {0}")]
    ResponseFileFailed(String),

    #[error("bug: invariant violated: {0}")]
    FatalInternal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

impl DriverError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// The exit-code class used to pick a process exit status; crashes are
    /// everything a sane build script should treat as a bug report.
    pub fn exit_class(&self) -> ExitClass {
        match self {
            Self::FatalInternal(_) => ExitClass::Crash,
            _ => ExitClass::UserError,
        }
    }
}
