//! # CLI Integration Tests
//!
//! Commands run against on-disk fixtures in a temporary directory.

#![allow(clippy::unwrap_used, clippy::panic)]

use reasoner::cli::{cmd_hash, cmd_merge, cmd_normalize, cmd_validate, load_message};
use reasoner_core::{Message, ParseOptions, ReasonerError, StableHash};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn service_message(aggregator: &str, edge_key: &str) -> Value {
    json!({
        "query_graph": {
            "nodes": {"n0": {"ids": ["CHEBI:6801"]}, "n1": {"categories": ["biolink:Disease"]}},
            "edges": {"e0": {"subject": "n0", "object": "n1", "predicates": ["biolink:treats"]}}
        },
        "knowledge_graph": {
            "nodes": {
                "CHEBI:6801": {"name": "metformin"},
                "MONDO:5148": {"name": "type 2 diabetes mellitus"}
            },
            "edges": {
                edge_key: {
                    "subject": "CHEBI:6801",
                    "object": "MONDO:5148",
                    "predicate": "biolink:treats",
                    "sources": [
                        {"resource_id": "infores:kp1", "resource_role": "primary_knowledge_source"},
                        {
                            "resource_id": aggregator,
                            "resource_role": "aggregator_knowledge_source",
                            "upstream_resource_ids": ["infores:kp1"]
                        }
                    ]
                }
            }
        },
        "results": [{
            "node_bindings": {"n0": [{"id": "CHEBI:6801"}], "n1": [{"id": "MONDO:5148"}]},
            "analyses": [{"resource_id": aggregator, "edge_bindings": {"e0": [{"id": edge_key}]}}]
        }]
    })
}

fn write(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, value.to_string()).unwrap();
    path
}

fn read_message(path: &Path) -> Message {
    Message::parse(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn validate_accepts_a_well_formed_message() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "ara1.json", &service_message("infores:ara1", "e1"));
    cmd_validate(&path, true, false).unwrap();
}

#[test]
fn validate_reports_bad_predicate() {
    let dir = TempDir::new().unwrap();
    let mut value = service_message("infores:ara1", "e1");
    value["knowledge_graph"]["edges"]["e1"]["predicate"] = json!("treats");
    let path = write(&dir, "bad.json", &value);

    let err = cmd_validate(&path, true, true).unwrap_err();
    let ReasonerError::Validation { violations } = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert!(
        violations
            .iter()
            .any(|v| v.path == "message.knowledge_graph.edges.e1.predicate")
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = cmd_validate(&dir.path().join("absent.json"), true, false).unwrap_err();
    assert!(matches!(err, ReasonerError::IoError(_)));
}

#[test]
fn response_envelope_is_unwrapped() {
    let dir = TempDir::new().unwrap();
    let envelope = json!({
        "message": service_message("infores:ara1", "e1"),
        "status": "Success",
        "logs": []
    });
    let path = write(&dir, "response.json", &envelope);

    let message = load_message(&path, ParseOptions::default()).unwrap();
    assert_eq!(message.knowledge_graph.unwrap().edges.len(), 1);
}

#[test]
fn normalize_writes_content_keys() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "ara1.json", &service_message("infores:ara1", "e1"));
    let output = dir.path().join("normalized.json");

    cmd_normalize(&input, Some(&output), false).unwrap();

    let written = read_message(&output);
    let graph = written.knowledge_graph.unwrap();
    let key = graph.edges.keys().next().unwrap();
    assert_ne!(key.as_str(), "e1");
    assert_eq!(key.as_str().len(), 12);
}

#[test]
fn merge_combines_services_into_one_edge() {
    let dir = TempDir::new().unwrap();
    let first = write(&dir, "ara1.json", &service_message("infores:ara1", "e1"));
    let second = write(&dir, "ara2.json", &service_message("infores:ara2", "edge-7"));
    let output = dir.path().join("merged.json");

    cmd_merge(&[first, second], Some(&output), true, true).unwrap();

    let merged = read_message(&output);
    let graph = merged.knowledge_graph.as_ref().unwrap();
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges.values().next().unwrap().sources.len(), 3);

    let results = merged.results.as_ref().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].analyses.len(), 2);
}

#[test]
fn merge_of_one_file_is_its_normalized_form() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "ara1.json", &service_message("infores:ara1", "e1"));
    let merged_path = dir.path().join("merged.json");
    let normalized_path = dir.path().join("normalized.json");

    cmd_merge(&[input.clone()], Some(&merged_path), true, false).unwrap();
    cmd_normalize(&input, Some(&normalized_path), false).unwrap();

    assert_eq!(
        read_message(&merged_path).stable_digest(),
        read_message(&normalized_path).stable_digest()
    );
}

#[test]
fn merge_of_different_questions_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let first = write(&dir, "ara1.json", &service_message("infores:ara1", "e1"));
    let mut other = service_message("infores:ara2", "e1");
    other["query_graph"]["nodes"]["n0"]["ids"] = json!(["CHEBI:15365"]);
    let second = write(&dir, "ara2.json", &other);
    let output = dir.path().join("merged.json");

    let err = cmd_merge(&[first, second], Some(&output), true, false).unwrap_err();
    assert!(matches!(err, ReasonerError::IdentityMismatch { .. }));
    assert!(!output.exists());
}

#[test]
fn output_into_missing_directory_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "ara1.json", &service_message("infores:ara1", "e1"));
    let output = dir.path().join("missing").join("out.json");

    let err = cmd_normalize(&input, Some(&output), false).unwrap_err();
    assert!(matches!(err, ReasonerError::IoError(_)));
}

#[test]
fn hash_runs_on_a_bare_message() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "ara1.json", &service_message("infores:ara1", "e1"));
    cmd_hash(&path, true, true).unwrap();
}
