//! Exercises the incremental engine's change-detection queries directly
//! against the mock dependency-record format.

use moddriver::mdg::{integrate::DependencyRecord, ModuleDependencyGraph};
use std::path::PathBuf;

fn file(name: &str) -> PathBuf {
    PathBuf::from(name)
}

#[test]
fn reflexive_and_transitive_invalidation() {
    let mut graph = ModuleDependencyGraph::new();

    let load0 = DependencyRecord::parse_mock("topLevel={a,b,c}").unwrap();
    graph.integrate(&file("0"), &load0).unwrap();

    let load1 = DependencyRecord::parse_mock("topLevel={x->,b->,z->}").unwrap();
    graph.integrate(&file("1"), &load1).unwrap();

    let result = graph.find_swift_deps_to_recompile_when_whole_swift_deps_changes(&file("0"));
    let expected: std::collections::BTreeSet<PathBuf> = [file("0"), file("1")].into_iter().collect();
    assert_eq!(result, expected);
}

#[test]
fn second_query_for_same_source_is_still_reflexive() {
    let mut graph = ModuleDependencyGraph::new();
    let load0 = DependencyRecord::parse_mock("topLevel={a}").unwrap();
    graph.integrate(&file("0"), &load0).unwrap();

    let first = graph.find_swift_deps_to_recompile_when_whole_swift_deps_changes(&file("0"));
    let second = graph.find_swift_deps_to_recompile_when_whole_swift_deps_changes(&file("0"));
    assert!(first.contains(&file("0")));
    assert!(second.contains(&file("0")));
}

#[test]
fn noncascading_use_does_not_propagate_past_immediate_user() {
    let mut graph = ModuleDependencyGraph::new();

    graph.integrate(&file("0"), &DependencyRecord::parse_mock("topLevel={a}").unwrap()).unwrap();
    // file "1" has a noncascading use of `a`.
    graph.integrate(&file("1"), &DependencyRecord::parse_mock("topLevel={#a->}").unwrap()).unwrap();
    // file "2" depends on something file "1" provides, but file "1"
    // provides nothing here, so "2" should not appear when "0" changes.
    graph.integrate(&file("2"), &DependencyRecord::parse_mock("topLevel={q->}").unwrap()).unwrap();

    let result = graph.find_swift_deps_to_recompile_when_whole_swift_deps_changes(&file("0"));
    assert!(result.contains(&file("0")));
    assert!(result.contains(&file("1")));
    assert!(!result.contains(&file("2")));
}

#[test]
fn untraced_external_dependency_closure_is_monotone() {
    let mut graph = ModuleDependencyGraph::new();
    graph
        .integrate(
            &file("0"),
            &DependencyRecord {
                uses: vec![moddriver::mdg::integrate::RecordEntry {
                    aspect: moddriver::mdg::Aspect::Interface,
                    designator: moddriver::mdg::Designator::ExternalDepend(PathBuf::from("/ext/header.h")),
                    fingerprint: None,
                    noncascading: false,
                }],
                ..Default::default()
            },
        )
        .unwrap();

    let first = graph.find_untraced_swift_deps_dependent_on_external(&PathBuf::from("/ext/header.h"));
    assert!(first.contains(&file("0")));

    let second = graph.find_untraced_swift_deps_dependent_on_external(&PathBuf::from("/ext/header.h"));
    assert!(second.is_empty());
}

#[test]
fn round_trip_preserves_nodes_and_use_map() {
    let mut graph = ModuleDependencyGraph::new();
    graph.integrate(&file("0"), &DependencyRecord::parse_mock("topLevel={a,b}").unwrap()).unwrap();
    graph.integrate(&file("1"), &DependencyRecord::parse_mock("topLevel={a->}").unwrap()).unwrap();

    let mut buffer = Vec::new();
    graph.serialize_to(&mut buffer).unwrap();
    let restored = ModuleDependencyGraph::deserialize_from(&buffer[..]).unwrap();

    assert_eq!(graph.nodes, restored.nodes);
    assert_eq!(graph.uses_by_def, restored.uses_by_def);
    assert_eq!(graph.external_fingerprints, restored.external_fingerprints);
}

#[test]
fn stable_provider_fingerprint_narrows_invalidation_to_changed_providers() {
    use moddriver::mdg::integrate::RecordEntry;
    use moddriver::mdg::{Aspect, Designator};

    let mut graph = ModuleDependencyGraph::new();

    let provide = |name: &str, fingerprint: &str| RecordEntry {
        aspect: Aspect::Interface,
        designator: Designator::TopLevel(name.to_string()),
        fingerprint: Some(fingerprint.to_string()),
        noncascading: false,
    };
    let uses = |name: &str| RecordEntry {
        aspect: Aspect::Interface,
        designator: Designator::TopLevel(name.to_string()),
        fingerprint: None,
        noncascading: false,
    };

    // file "0" provides `a` and `b`, each with a stable initial fingerprint.
    graph
        .integrate(
            &file("0"),
            &DependencyRecord {
                provides: vec![provide("a", "fp-a-1"), provide("b", "fp-b-1")],
                ..Default::default()
            },
        )
        .unwrap();
    // file "1" uses `a`; file "2" uses `b`.
    graph
        .integrate(&file("1"), &DependencyRecord { uses: vec![uses("a")], ..Default::default() })
        .unwrap();
    graph
        .integrate(&file("2"), &DependencyRecord { uses: vec![uses("b")], ..Default::default() })
        .unwrap();

    // Reintegrate file "0": `a`'s fingerprint is stable, `b`'s changed.
    graph
        .integrate(
            &file("0"),
            &DependencyRecord {
                provides: vec![provide("a", "fp-a-1"), provide("b", "fp-b-2")],
                ..Default::default()
            },
        )
        .unwrap();

    let result = graph.find_swift_deps_to_recompile_when_whole_swift_deps_changes(&file("0"));
    assert!(result.contains(&file("0")));
    assert!(result.contains(&file("2")), "user of the changed provider must be invalidated");
    assert!(!result.contains(&file("1")), "user of the stable provider must not be invalidated");
}

#[test]
fn version_drift_is_rejected() {
    let mut graph = ModuleDependencyGraph::new();
    graph.integrate(&file("0"), &DependencyRecord::parse_mock("topLevel={a}").unwrap()).unwrap();

    let mut buffer = Vec::new();
    graph.serialize_to(&mut buffer).unwrap();

    let mut value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
    value["header"]["minor"] = serde_json::json!(999);
    let corrupted = serde_json::to_vec(&value).unwrap();

    let err = ModuleDependencyGraph::deserialize_from(&corrupted[..]).unwrap_err();
    assert!(err.to_string().contains("mismatched-serialized-graph-version"));
}
