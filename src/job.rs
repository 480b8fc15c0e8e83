//! The `Job` record and the DAG that holds them. A `Job` is immutable data
//! rather than a method call: the planner builds the whole graph up front,
//! and the executor only ever reads it.

use crate::vpath::TypedPath;
use std::{collections::BTreeMap, path::PathBuf};

/// What a job does: every compiler/linker invocation this core ever plans
/// is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Compile,
    CompileModuleFromInterface,
    GeneratePcm,
    Link,
    VerifyModuleInterface,
    GenerateApiBaseline,
    GenerateAbiBaseline,
    CompareBaseline,
    AutolinkExtract,
    MergeModule,
    EmitModule,
    Repl,
}

/// One item of a job's command-line template: either a literal flag or a
/// reference to one of the job's typed paths, resolved lazily by the
/// executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgTemplate {
    Literal(String),
    Path(TypedPath),
    /// A squashed argument, e.g. `--opt=<path>`; resolves to one shell
    /// token even though it references a path.
    Squashed { prefix: String, path: TypedPath },
}

impl ArgTemplate {
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }
}

/// A single planned unit of work. Immutable once the planner produces it;
/// the executor resolves its `ArgTemplate`s, spawns its tool, and reports
/// lifecycle messages.
#[derive(Debug, Clone)]
pub struct Job {
    pub module_name: String,
    pub kind: JobKind,
    pub tool_name: String,
    pub command_line: Vec<ArgTemplate>,
    pub inputs: Vec<TypedPath>,
    /// Indices into `inputs` identifying the primary inputs: the subset
    /// whose presence/change triggers this job (used for per-primary
    /// lifecycle messages in batch-compile jobs).
    pub primary_inputs: Vec<usize>,
    pub outputs: Vec<TypedPath>,
    pub requires_in_place_execution: bool,
    pub working_directory: Option<PathBuf>,
}

impl Job {
    /// The typed paths designated as primary by `primary_inputs`.
    pub fn primary_inputs(&self) -> impl Iterator<Item = &TypedPath> {
        self.primary_inputs.iter().filter_map(|&i| self.inputs.get(i))
    }
}

/// An immutable DAG of jobs plus their dependency edges (job index depends
/// on a set of other job indices). Jobs are indexed by position; the
/// planner is responsible for producing edges in an order consistent with
/// the dependency relation, though the executor must be correct under any
/// valid topological order.
#[derive(Debug, Clone, Default)]
pub struct JobGraph {
    pub jobs: Vec<Job>,
    /// job index -> set of job indices it depends on.
    pub dependencies: BTreeMap<usize, Vec<usize>>,
}

impl JobGraph {
    pub fn push(&mut self, job: Job, depends_on: Vec<usize>) -> usize {
        let index = self.jobs.len();
        self.jobs.push(job);
        if !depends_on.is_empty() {
            self.dependencies.insert(index, depends_on);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// A topological order over job indices. Errors if the graph contains a
    /// cycle, which would be a planner bug.
    pub fn topological_order(&self) -> crate::error::Result<Vec<usize>> {
        let n = self.jobs.len();
        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (&job, deps) in &self.dependencies {
            indegree[job] = deps.len();
            for &dep in deps {
                dependents[dep].push(job);
            }
        }

        let mut queue: std::collections::VecDeque<usize> =
            (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(job) = queue.pop_front() {
            order.push(job);
            for &dependent in &dependents[job] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() != n {
            return Err(crate::error::DriverError::FatalInternal(
                "job graph contains a cycle".into(),
            ));
        }

        Ok(order)
    }
}
