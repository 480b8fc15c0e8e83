//! The `Frontend` trait: the one seam where this crate touches the actual
//! per-file compiler. The planner never needs to know which concrete tool
//! it is driving; it only needs a resolved path and a way to turn a `Job`
//! into a `std::process::Command`.

use crate::{job::Job, toolchain::ResolvedTool};
use std::process::Command;

/// Capability bits a resolved tool advertises, consulted by the executor
/// when deciding whether a job's command line can be materialized as a
/// response file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolCapabilities {
    pub supports_response_files: bool,
}

/// A frontend (or linker, archiver, auxiliary tool) invoked as a
/// subprocess. Implementors only need to know how to turn a planned `Job`
/// into the external `Command` that realizes it; the executor owns
/// spawning, lifecycle messages, and cleanup.
pub trait Frontend: Send + Sync {
    /// Builds the `std::process::Command` that executes `job`, with
    /// `tool`'s resolved path and `args` already expanded from the job's
    /// `ArgTemplate` (flags resolved, paths resolved, any response file
    /// already materialized).
    fn configure_command(&self, job: &Job, tool: &ResolvedTool, args: &[String]) -> Command {
        let mut cmd = Command::new(&tool.path);
        cmd.args(args);
        if let Some(dir) = &job.working_directory {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn capabilities(&self, tool: &ResolvedTool) -> ToolCapabilities {
        tool.capabilities
    }
}

/// The default frontend: shells out verbatim with no tool-specific
/// adjustments. Sufficient for every job kind this core plans, since the
/// frontend/linker/archiver/scanner are all opaque executables to this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessFrontend;

impl Frontend for ProcessFrontend {}
