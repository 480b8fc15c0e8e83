//! Exercises the executor end to end against a trivial job graph backed by
//! real `/bin/echo`-style processes, plus temporary-file cleanup.

use moddriver::{
    executor::{execute, ExecutorConfig},
    frontend::ProcessFrontend,
    job::{ArgTemplate, Job, JobGraph, JobKind},
    report::TracingReporter,
    toolchain::ResolvedTool,
    vpath::{FileType, PathResolver, TypedPath, VirtualPath},
};
use std::collections::BTreeMap;

fn echo_tool() -> ResolvedTool {
    ResolvedTool {
        name: "echo".into(),
        path: which_echo(),
        capabilities: Default::default(),
    }
}

fn which_echo() -> std::path::PathBuf {
    for candidate in ["/bin/echo", "/usr/bin/echo"] {
        if std::path::Path::new(candidate).exists() {
            return candidate.into();
        }
    }
    panic!("no echo binary found for test");
}

static REPORTER: TracingReporter = TracingReporter;

#[test]
fn runs_a_single_job_and_cleans_up_temporaries() {
    let workspace = tempfile::tempdir().unwrap();
    let resolver = PathResolver::new(workspace.path(), workspace.path().join("scratch"));

    let mut graph = JobGraph::default();
    let temp_out = VirtualPath::temporary_with_contents("out.txt", b"scratch".to_vec());
    graph.push(
        Job {
            module_name: "hello".into(),
            kind: JobKind::Compile,
            tool_name: "echo".into(),
            command_line: vec![
                ArgTemplate::literal("hi"),
                ArgTemplate::Path(TypedPath::new(temp_out.clone(), FileType::Object)),
            ],
            inputs: vec![],
            primary_inputs: vec![],
            outputs: vec![TypedPath::new(temp_out.clone(), FileType::Object)],
            requires_in_place_execution: false,
            working_directory: None,
        },
        vec![],
    );

    let mut tools = BTreeMap::new();
    tools.insert("echo".to_string(), echo_tool());

    let config = ExecutorConfig::default();
    let outcomes = execute(
        &graph,
        &resolver,
        &tools,
        &ProcessFrontend,
        &config,
        &REPORTER,
        &|_line| {},
    )
    .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], moddriver::executor::JobOutcome::Finished { exit_status: 0 }));

    let resolved = resolver.resolve(&temp_out).unwrap();
    assert!(!resolved.exists(), "temporaries must be cleaned up absent -save-temps");
}

#[test]
fn save_temps_suppresses_cleanup_of_materialized_contents() {
    let workspace = tempfile::tempdir().unwrap();
    let resolver = PathResolver::new(workspace.path(), workspace.path().join("scratch"));

    let contents = VirtualPath::temporary_with_contents("kept.txt", b"hello".to_vec());
    let resolved = resolver.resolve(&contents).unwrap();
    assert!(resolved.exists());

    let mut graph = JobGraph::default();
    graph.push(
        Job {
            module_name: "noop".into(),
            kind: JobKind::Compile,
            tool_name: "echo".into(),
            command_line: vec![ArgTemplate::literal("ok")],
            inputs: vec![],
            primary_inputs: vec![],
            outputs: vec![],
            requires_in_place_execution: false,
            working_directory: None,
        },
        vec![],
    );

    let mut tools = BTreeMap::new();
    tools.insert("echo".to_string(), echo_tool());

    let config = ExecutorConfig { save_temps: true, ..Default::default() };
    execute(&graph, &resolver, &tools, &ProcessFrontend, &config, &REPORTER, &|_line| {}).unwrap();

    assert!(resolved.exists(), "save-temps must preserve materialized temporaries");
}

#[test]
fn batch_compile_job_emits_one_began_finished_pair_per_primary() {
    let workspace = tempfile::tempdir().unwrap();
    let resolver = PathResolver::new(workspace.path(), workspace.path().join("scratch"));

    let mut graph = JobGraph::default();
    graph.push(
        Job {
            module_name: "batch0".into(),
            kind: JobKind::Compile,
            tool_name: "echo".into(),
            command_line: vec![ArgTemplate::literal("ok")],
            inputs: vec![],
            primary_inputs: vec![0, 1],
            outputs: vec![],
            requires_in_place_execution: false,
            working_directory: None,
        },
        vec![],
    );

    let mut tools = BTreeMap::new();
    tools.insert("echo".to_string(), echo_tool());

    let lines = std::sync::Mutex::new(Vec::new());
    let config = ExecutorConfig { parseable_output: true, ..Default::default() };
    execute(&graph, &resolver, &tools, &ProcessFrontend, &config, &REPORTER, &|line| {
        lines.lock().unwrap().push(line);
    })
    .unwrap();

    let lines = lines.into_inner().unwrap();
    let messages: Vec<serde_json::Value> =
        lines.iter().map(|l| serde_json::from_str(l).unwrap()).collect();

    let began: Vec<_> = messages.iter().filter(|m| m["message"] == "began").collect();
    let finished: Vec<_> = messages.iter().filter(|m| m["message"] == "finished").collect();
    assert_eq!(began.len(), 2, "one began message per primary");
    assert_eq!(finished.len(), 2, "one finished message per primary");

    let real_pid = began[0]["process"]["real_pid"].clone();
    assert!(began.iter().all(|m| m["process"]["real_pid"] == real_pid), "primaries share one real_pid");

    let pids: std::collections::BTreeSet<i64> = began.iter().map(|m| m["pid"].as_i64().unwrap()).collect();
    assert_eq!(pids.len(), 2, "each primary gets its own synthetic pid");
}
