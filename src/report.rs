//! Thread-scoped reporting, grounded on the same scoped-thread-local idiom
//! used to carry a reporter across `rayon` worker threads: each worker
//! copies the scope's reporter into its own thread before compiling so logs
//! interleave through one sink regardless of which thread produced them.

use std::cell::RefCell;

/// Receives human-readable lifecycle notifications. The default
/// implementation forwards everything to `tracing`; callers that need a
/// different sink (a progress bar, a test harness) can install their own for
/// the duration of a scope.
pub trait Reporter: Send + Sync {
    fn job_started(&self, name: &str) {
        debug!(job = name, "started");
    }

    fn job_finished(&self, name: &str, success: bool) {
        if success {
            debug!(job = name, "finished");
        } else {
            warn!(job = name, "failed");
        }
    }

    fn message(&self, message: &str) {
        trace!("{message}");
    }
}

/// The default reporter: everything goes through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {}

thread_local! {
    static SCOPED: RefCell<Option<&'static dyn Reporter>> = const { RefCell::new(None) };
}

fn default_reporter() -> &'static dyn Reporter {
    static DEFAULT: TracingReporter = TracingReporter;
    &DEFAULT
}

/// Returns the reporter active for the current thread, or the default
/// tracing-backed one if none has been scoped in.
pub fn get_default() -> &'static dyn Reporter {
    SCOPED.with(|cell| cell.borrow().unwrap_or_else(default_reporter))
}

/// Installs `reporter` for the current thread for the duration of `f`,
/// restoring whatever was previously scoped in afterwards. Used by the
/// executor to propagate a caller-supplied reporter into worker threads
/// that `rayon` spawns.
pub fn set_scoped<R>(reporter: &'static dyn Reporter, f: impl FnOnce() -> R) -> R {
    let previous = SCOPED.with(|cell| cell.replace(Some(reporter)));
    let result = f();
    SCOPED.with(|cell| *cell.borrow_mut() = previous);
    result
}
