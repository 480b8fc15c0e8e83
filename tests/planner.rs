//! Exercises job planning: compile/link sequencing, API/ABI baseline job
//! shape, and digester-mode validation.

use moddriver::{
    job::JobKind,
    options::{self, DriverKind},
    planner::plan,
};

fn parse(args: &[&str]) -> options::Options {
    let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    options::parse(&owned).unwrap()
}

#[test]
fn compile_and_link_main() {
    let options = parse(&["main.swift"]);
    let graph = plan(DriverKind::Batch, &options, None).unwrap();

    assert_eq!(graph.len(), 2);
    assert_eq!(graph.jobs[0].kind, JobKind::Compile);
    assert_eq!(graph.jobs[1].kind, JobKind::Link);
    assert_eq!(graph.dependencies.get(&1), Some(&vec![0]));
}

#[test]
fn api_baseline_job_has_no_abi_flag() {
    let options = parse(&["-emit-module", "-emit-api-baseline", "foo.swift"]);
    let graph = plan(DriverKind::Batch, &options, None).unwrap();

    let baseline_jobs: Vec<_> =
        graph.jobs.iter().filter(|j| j.kind == JobKind::GenerateApiBaseline).collect();
    assert_eq!(baseline_jobs.len(), 1);

    let has_abi_flag = baseline_jobs[0].command_line.iter().any(|arg| {
        matches!(arg, moddriver::job::ArgTemplate::Literal(s) if s == "-abi")
    });
    assert!(!has_abi_flag);
}

#[test]
fn abi_baseline_job_resolves_output_file_map_entry() {
    use std::io::Write;
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("map.json");
    let mut file = std::fs::File::create(&map_path).unwrap();
    write!(
        file,
        r#"{{"foo.swift": {{"abi-baseline-json": "/path/to/baseline.abi.json"}}}}"#
    )
    .unwrap();

    let options = parse(&[
        "-emit-module",
        "-emit-module-interface",
        "-enable-library-evolution",
        "-emit-digester-baseline",
        "-digester-mode",
        "abi",
        "foo.swift",
        "-o",
        "/tmp/foo.swiftmodule",
        "-output-file-map",
        map_path.to_str().unwrap(),
    ]);

    let graph = plan(DriverKind::Batch, &options, None).unwrap();
    let baseline = graph.jobs.iter().find(|j| j.kind == JobKind::GenerateAbiBaseline).unwrap();

    let has_abi_flag = baseline
        .command_line
        .iter()
        .any(|arg| matches!(arg, moddriver::job::ArgTemplate::Literal(s) if s == "-abi"));
    assert!(has_abi_flag);

    assert_eq!(
        baseline.outputs[0].path,
        moddriver::vpath::VirtualPath::absolute("/path/to/baseline.abi.json")
    );
}

#[test]
fn batch_mode_groups_inputs_into_one_job_per_batch() {
    let options = parse(&[
        "-enable-batch-mode",
        "-driver-batch-count",
        "2",
        "a.swift",
        "b.swift",
        "c.swift",
    ]);
    let graph = plan(DriverKind::Batch, &options, None).unwrap();

    let compiles: Vec<_> = graph.jobs.iter().filter(|j| j.kind == JobKind::Compile).collect();
    assert_eq!(compiles.len(), 2, "three inputs split across two batches");

    let total_primaries: usize = compiles.iter().map(|j| j.primary_inputs().count()).sum();
    assert_eq!(total_primaries, 3, "every input remains a primary of some batch job");

    for job in &compiles {
        assert_eq!(job.outputs.len(), job.primary_inputs.len(), "one object per primary");
    }

    let link = graph.jobs.iter().find(|j| j.kind == JobKind::Link).unwrap();
    assert_eq!(link.inputs.len(), 3, "link job collects one object per original input");
}

#[test]
fn batch_mode_is_a_no_op_for_a_single_input() {
    let options = parse(&["-enable-batch-mode", "-driver-batch-count", "4", "only.swift"]);
    let graph = plan(DriverKind::Batch, &options, None).unwrap();

    let compiles: Vec<_> = graph.jobs.iter().filter(|j| j.kind == JobKind::Compile).collect();
    assert_eq!(compiles.len(), 1);
    assert_eq!(compiles[0].primary_inputs, vec![0]);
}

#[test]
fn invalid_digester_mode_produces_no_jobs() {
    let options = parse(&["-emit-module", "-emit-digester-baseline", "-digester-mode", "notamode", "foo.swift"]);
    let err = plan(DriverKind::Batch, &options, None).unwrap_err();
    assert!(err.to_string().contains("invalid value 'notamode' in '-digester-mode'"));
}

#[test]
fn digester_abi_mode_requires_library_evolution() {
    let options = parse(&[
        "-emit-module",
        "-emit-module-interface",
        "-emit-digester-baseline",
        "-digester-mode",
        "abi",
        "foo.swift",
    ]);
    let err = options::validate(&options).unwrap_err();
    assert!(err
        .to_string()
        .contains("'-digester-mode abi' cannot be specified if '-enable-library-evolution' is not present"));
}
