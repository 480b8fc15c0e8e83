//! The parallel job executor: runs a [`JobGraph`] on a bounded worker pool,
//! resolves each job's command line, reports lifecycle messages, detects
//! input modification, and cleans up temporaries. Grounded on the
//! teacher's `compile_parallel` (`compile/project.rs`), which builds a
//! `rayon::ThreadPoolBuilder` pool and threads the scoped reporter into
//! each worker thread so logging stays coherent across threads.

pub mod messages;

use crate::{
    error::{DriverError, Result},
    frontend::Frontend,
    job::{ArgTemplate, JobGraph, JobKind},
    report::{self, Reporter},
    toolchain::ResolvedTool,
    vpath::PathResolver,
};
use messages::{LifecycleMessage, OutputEntry, ProcessInfo};
use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicI64, Ordering},
        Mutex,
    },
    time::SystemTime,
};

/// Outcome of running one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Finished { exit_status: i32 },
    Signalled { signal: i32 },
    AbnormalExit,
}

pub struct ExecutorConfig {
    /// Worker count; defaults to `num_cpus::get()` when `None`.
    pub jobs: Option<usize>,
    pub save_temps: bool,
    pub parseable_output: bool,
    /// When set, argv longer than this threshold is materialized as a
    /// `@file` response file, provided the tool supports it.
    pub filelist_threshold: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { jobs: None, save_temps: false, parseable_output: false, filelist_threshold: None }
    }
}

/// Runs `graph` to completion (or first abort), returning one [`JobOutcome`]
/// per job index in the order jobs appear in the graph.
pub fn execute(
    graph: &JobGraph,
    resolver: &PathResolver,
    tools: &BTreeMap<String, ResolvedTool>,
    frontend: &dyn Frontend,
    config: &ExecutorConfig,
    reporter: &'static dyn Reporter,
    emit_line: &(dyn Fn(String) + Sync),
) -> Result<Vec<JobOutcome>> {
    let order = graph.topological_order()?;

    let recorded_mtimes = record_input_mtimes(graph, resolver)?;

    let mut scope = crate::vpath::TempScope::new(resolver);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs.unwrap_or_else(num_cpus::get))
        .build()
        .map_err(|e| DriverError::msg(e.to_string()))?;

    let outcomes: Mutex<BTreeMap<usize, JobOutcome>> = Mutex::new(BTreeMap::new());
    let aborted = std::sync::atomic::AtomicBool::new(false);
    let any_abnormal = std::sync::atomic::AtomicBool::new(false);
    let synthetic_pid = AtomicI64::new(-1000);

    // Schedule in dependency-respecting waves: every job in a wave has all
    // its dependencies already finished, and `rayon::scope` runs the wave's
    // jobs in parallel before the next wave is computed. The executor makes
    // no promise about ordering beyond the DAG's edges, so wave boundaries
    // (rather than fully dynamic work-stealing across the whole graph) are
    // a correct, simple scheduling discipline.
    let mut remaining: Vec<usize> = order.clone();
    while !remaining.is_empty() && !aborted.load(Ordering::SeqCst) {
        let (ready, not_ready): (Vec<usize>, Vec<usize>) = remaining.iter().partition(|&&index| {
            graph
                .dependencies
                .get(&index)
                .map(|deps| {
                    deps.iter().all(|d| {
                        matches!(outcomes.lock().unwrap().get(d), Some(JobOutcome::Finished { exit_status: 0 }))
                    })
                })
                .unwrap_or(true)
        });
        if ready.is_empty() {
            break;
        }
        remaining = not_ready;

        pool.scope(|s| {
            for &index in &ready {
                s.spawn(|_| {
                    report::set_scoped(reporter, || {
                        let job = &graph.jobs[index];
                        reporter.job_started(&job.module_name);

                        let result = run_one_job(
                            job,
                            resolver,
                            tools,
                            frontend,
                            config,
                            &recorded_mtimes,
                            &synthetic_pid,
                            emit_line,
                        );

                        match result {
                            Ok(outcome) => {
                                let ok = matches!(outcome, JobOutcome::Finished { exit_status: 0 });
                                reporter.job_finished(&job.module_name, ok);
                                if !ok {
                                    aborted.store(true, Ordering::SeqCst);
                                }
                                if matches!(outcome, JobOutcome::AbnormalExit) {
                                    any_abnormal.store(true, Ordering::SeqCst);
                                }
                                outcomes.lock().unwrap().insert(index, outcome);
                            }
                            Err(_) => {
                                aborted.store(true, Ordering::SeqCst);
                                any_abnormal.store(true, Ordering::SeqCst);
                                outcomes.lock().unwrap().insert(index, JobOutcome::AbnormalExit);
                            }
                        }
                    });
                });
            }
        });
    }

    if config.save_temps || any_abnormal.load(Ordering::SeqCst) {
        scope.suppress();
    }
    drop(scope);

    let outcomes = outcomes.into_inner().unwrap();
    Ok(order.iter().map(|i| *outcomes.get(i).unwrap_or(&JobOutcome::AbnormalExit)).collect())
}

fn record_input_mtimes(
    graph: &JobGraph,
    resolver: &PathResolver,
) -> Result<BTreeMap<PathBuf, SystemTime>> {
    let mut recorded = BTreeMap::new();
    for job in &graph.jobs {
        for input in &job.inputs {
            if let Ok(resolved) = resolver.resolve(&input.path) {
                if let Ok(mtime) = crate::utils::modified_time(&resolved) {
                    recorded.insert(resolved, mtime);
                }
            }
        }
    }
    Ok(recorded)
}

#[allow(clippy::too_many_arguments)]
fn run_one_job(
    job: &crate::job::Job,
    resolver: &PathResolver,
    tools: &BTreeMap<String, ResolvedTool>,
    frontend: &dyn Frontend,
    config: &ExecutorConfig,
    recorded_mtimes: &BTreeMap<PathBuf, SystemTime>,
    synthetic_pid: &AtomicI64,
    emit_line: &(dyn Fn(String) + Sync),
) -> Result<JobOutcome> {
    for input in &job.inputs {
        let resolved = resolver.resolve(&input.path)?;
        if let Some(&recorded) = recorded_mtimes.get(&resolved) {
            if let Ok(current) = crate::utils::modified_time(&resolved) {
                if current != recorded {
                    return Err(DriverError::InputUnexpectedlyModified(resolved));
                }
            }
        }
    }

    let mut args = Vec::new();
    for item in &job.command_line {
        match item {
            ArgTemplate::Literal(s) => args.push(s.clone()),
            ArgTemplate::Path(p) => args.push(resolver.resolve(&p.path)?.to_string_lossy().into_owned()),
            ArgTemplate::Squashed { prefix, path } => {
                let resolved = resolver.resolve(&path.path)?;
                args.push(format!("{prefix}{}", resolved.to_string_lossy()));
            }
        }
    }

    let tool = tools
        .get(&job.tool_name)
        .ok_or_else(|| DriverError::ToolNotFound(job.tool_name.clone()))?;

    let args = maybe_materialize_response_file(resolver, frontend, tool, &args, config)?;

    // Batch-compile jobs run one subprocess for every primary but are
    // reported as `k` distinct lifecycle messages sharing that subprocess's
    // `real_pid`, each with its own synthetic pid, so observers can
    // correlate per-primary output with per-primary began/finished.
    let primary_count = if job.kind == JobKind::Compile { job.primary_inputs.len().max(1) } else { 1 };
    let real_pid = synthetic_pid.fetch_sub(1, Ordering::SeqCst);
    let primary_pids: Vec<i64> = if primary_count > 1 {
        (0..primary_count).map(|_| synthetic_pid.fetch_sub(1, Ordering::SeqCst)).collect()
    } else {
        vec![real_pid]
    };

    if config.parseable_output {
        emit_began(job, tool, &args, real_pid, &primary_pids, emit_line)?;
    }

    let mut command = frontend.configure_command(job, tool, &args);
    let output = command.output().map_err(|_| DriverError::JobCrashed(job.module_name.clone()))?;

    let outcome = if let Some(code) = output.status.code() {
        JobOutcome::Finished { exit_status: code }
    } else {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            match output.status.signal() {
                Some(signal) => JobOutcome::Signalled { signal },
                None => JobOutcome::AbnormalExit,
            }
        }
        #[cfg(not(unix))]
        {
            JobOutcome::AbnormalExit
        }
    };

    if config.parseable_output {
        emit_finished(job, &outcome, real_pid, &primary_pids, &output, emit_line)?;
    }

    Ok(outcome)
}

/// Expands argv to a response file when its length exceeds
/// `filelist_threshold` and the tool advertises support for one.
fn maybe_materialize_response_file(
    resolver: &PathResolver,
    frontend: &dyn Frontend,
    tool: &ResolvedTool,
    args: &[String],
    config: &ExecutorConfig,
) -> Result<Vec<String>> {
    let Some(threshold) = config.filelist_threshold else { return Ok(args.to_vec()) };
    if args.len() <= threshold {
        return Ok(args.to_vec());
    }
    if !frontend.capabilities(tool).supports_response_files {
        return Ok(args.to_vec());
    }

    let contents = args.join("\n");
    let list = crate::vpath::VirtualPath::temporary_with_contents("response", contents.into_bytes());
    let resolved = resolver.resolve(&list)?;
    Ok(vec![format!("@{}", resolved.to_string_lossy())])
}

/// The `outputs` entries a per-primary `began`/`finished` message should
/// carry: just that primary's own output when `pids.len() > 1` (batch
/// compile), or the job's full output set otherwise.
fn outputs_for_primary(job: &crate::job::Job, index: usize, pids: &[i64]) -> Vec<OutputEntry> {
    if pids.len() > 1 {
        job.outputs
            .get(index)
            .map(|p| vec![OutputEntry { path: format!("{:?}", p.path), kind: format!("{:?}", p.file_type) }])
            .unwrap_or_default()
    } else {
        job.outputs
            .iter()
            .map(|p| OutputEntry { path: format!("{:?}", p.path), kind: format!("{:?}", p.file_type) })
            .collect()
    }
}

fn emit_began(
    job: &crate::job::Job,
    tool: &ResolvedTool,
    args: &[String],
    real_pid: i64,
    primary_pids: &[i64],
    emit_line: &(dyn Fn(String) + Sync),
) -> Result<()> {
    for (index, &pid) in primary_pids.iter().enumerate() {
        let message = LifecycleMessage::Began {
            kind: format!("{:?}", job.kind),
            name: job.module_name.clone(),
            pid,
            process: ProcessInfo { real_pid },
            inputs: job.inputs.iter().map(|p| format!("{:?}", p.path)).collect(),
            outputs: outputs_for_primary(job, index, primary_pids),
            command_executable: tool.path.to_string_lossy().into_owned(),
            command_arguments: args.to_vec(),
        };
        emit_line(messages::to_line(&message)?);
    }
    Ok(())
}

fn emit_finished(
    job: &crate::job::Job,
    outcome: &JobOutcome,
    real_pid: i64,
    primary_pids: &[i64],
    output: &std::process::Output,
    emit_line: &(dyn Fn(String) + Sync),
) -> Result<()> {
    for &pid in primary_pids {
        let message = match outcome {
            JobOutcome::Finished { exit_status } => LifecycleMessage::Finished {
                kind: format!("{:?}", job.kind),
                name: job.module_name.clone(),
                pid,
                process: ProcessInfo { real_pid },
                exit_status: *exit_status,
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
            },
            JobOutcome::Signalled { signal } => LifecycleMessage::Signalled {
                kind: format!("{:?}", job.kind),
                name: job.module_name.clone(),
                pid,
                process: ProcessInfo { real_pid },
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
                error_message: String::from_utf8_lossy(&output.stderr).into_owned(),
                signal: *signal,
            },
            JobOutcome::AbnormalExit => LifecycleMessage::AbnormalExit {
                kind: format!("{:?}", job.kind),
                name: job.module_name.clone(),
                pid,
                process: ProcessInfo { real_pid },
                exception: "abnormal exit".into(),
            },
        };
        emit_line(messages::to_line(&message)?);
    }
    Ok(())
}
