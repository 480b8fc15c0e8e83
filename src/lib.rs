//! Core of a compiler driver: job planning, the incremental module
//! dependency graph, the explicit-module inter-module dependency graph, and
//! the parallel job executor.
//!
//! The frontend, linker, archiver, module scanner and digester are treated
//! as opaque external tools; this crate only decides what commands to send
//! them and what to do with the artifacts they hand back.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod executor;
pub mod frontend;
pub mod imdg;
pub mod job;
pub mod mdg;
pub mod options;
pub mod planner;
#[cfg(feature = "project-util")]
pub mod project_util;
pub mod report;
pub mod scanner;
pub mod toolchain;
pub mod utils;
pub mod vpath;

pub use error::{DriverError, Result};
pub use job::{Job, JobGraph, JobKind};
pub use options::{DriverKind, Options};
pub use planner::plan;
