//! # Property-Based Tests
//!
//! Identity and merge invariants checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use reasoner_core::{
    Attribute, Edge, EdgeReindexer, HashableSet, KnowledgeGraph, Message, Node, ResourceRole,
    RetrievalSource, StableHash, Update,
};
use serde_json::json;

fn curie() -> impl Strategy<Value = String> {
    ("[A-Z]{2,6}", 1u32..100_000).prop_map(|(prefix, id)| format!("{prefix}:{id}"))
}

fn predicate() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "biolink:treats",
        "biolink:affects",
        "biolink:related_to",
        "biolink:gene_associated_with_condition",
    ])
    .prop_map(str::to_string)
}

fn edge() -> impl Strategy<Value = Edge> {
    (curie(), predicate(), curie(), 1u32..5, vec(1u32..5, 0..3)).prop_map(
        |(subject, predicate, object, primary, aggregators)| {
            let mut edge = Edge::new(subject, predicate, object);
            edge.sources.insert(RetrievalSource::new(
                format!("infores:kp{primary}"),
                ResourceRole::PrimaryKnowledgeSource,
            ));
            for aggregator in aggregators {
                edge.sources.insert(
                    RetrievalSource::new(
                        format!("infores:ara{aggregator}"),
                        ResourceRole::AggregatorKnowledgeSource,
                    )
                    .with_upstream([format!("infores:kp{primary}")]),
                );
            }
            edge
        },
    )
}

fn knowledge_graph() -> impl Strategy<Value = KnowledgeGraph> {
    (vec((curie(), "[a-z ]{0,12}"), 0..8), vec(edge(), 0..8)).prop_map(|(nodes, edges)| {
        let mut graph = KnowledgeGraph::new();
        for (id, name) in nodes {
            graph.nodes.insert(id.into(), Node::named(name));
        }
        for (index, edge) in edges.into_iter().enumerate() {
            graph.edges.insert(format!("producer-{index}").into(), edge);
        }
        graph
    })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Set identity does not depend on insertion order.
    #[test]
    fn set_identity_is_order_independent(items in vec("[a-z]{1,8}", 0..20)) {
        let forward: HashableSet<String> = items.iter().cloned().collect();
        let backward: HashableSet<String> = items.iter().rev().cloned().collect();
        prop_assert_eq!(forward.stable_digest(), backward.stable_digest());
    }

    /// Serializing then parsing preserves a knowledge graph's identity.
    #[test]
    fn knowledge_graph_hash_survives_round_trip(graph in knowledge_graph()) {
        let json = serde_json::to_string(&graph).expect("serialize");
        let parsed: KnowledgeGraph = serde_json::from_str(&json).expect("parse");
        prop_assert_eq!(graph.stable_digest(), parsed.stable_digest());
    }

    /// Re-keying the same edge under any producer key yields one key.
    #[test]
    fn rekeying_is_deterministic(edge in edge(), first in "[a-z0-9]{1,10}", second in "[a-z0-9]{1,10}") {
        let mut a = KnowledgeGraph::new();
        a.edges.insert(first.into(), edge.clone());
        let mut b = KnowledgeGraph::new();
        b.edges.insert(second.into(), edge);

        EdgeReindexer::reindex(&mut a).expect("reindex");
        EdgeReindexer::reindex(&mut b).expect("reindex");
        let key_a: Vec<_> = a.edges.keys().cloned().collect();
        let key_b: Vec<_> = b.edges.keys().cloned().collect();
        prop_assert_eq!(key_a, key_b);
    }

    /// Normalization is idempotent.
    #[test]
    fn reindex_twice_is_reindex_once(graph in knowledge_graph()) {
        let mut once = graph;
        EdgeReindexer::reindex(&mut once).expect("reindex");
        let mut twice = once.clone();
        EdgeReindexer::reindex(&mut twice).expect("reindex");
        prop_assert_eq!(once.stable_digest(), twice.stable_digest());
    }

    /// Merging a graph into a copy of itself changes nothing.
    #[test]
    fn graph_self_merge_is_idempotent(graph in knowledge_graph()) {
        let mut normalized = graph;
        EdgeReindexer::reindex(&mut normalized).expect("reindex");
        let mut merged = normalized.clone();
        merged.update(normalized.clone()).expect("update");
        prop_assert_eq!(merged.stable_digest(), normalized.stable_digest());
    }

    /// Merging an empty message is the identity.
    #[test]
    fn empty_merge_is_identity(graph in knowledge_graph()) {
        let mut message = Message {
            knowledge_graph: Some(graph),
            ..Message::default()
        };
        message.normalize().expect("normalize");
        let before = message.stable_digest();

        let empty = Message {
            knowledge_graph: Some(KnowledgeGraph::new()),
            ..Message::default()
        };
        message.update(&empty, true).expect("update");
        prop_assert_eq!(message.stable_digest(), before);
    }

    /// For disjoint messages, (A + B) + C equals A + (B + C).
    #[test]
    fn disjoint_merge_is_associative(
        a in knowledge_graph(),
        b in knowledge_graph(),
        c in knowledge_graph(),
    ) {
        // Disjointness: give each graph's nodes a distinct namespace.
        let tag = |graph: KnowledgeGraph, prefix: &str| {
            let mut tagged = KnowledgeGraph::new();
            for (id, node) in graph.nodes {
                tagged.nodes.insert(format!("{prefix}{id}").into(), node);
            }
            tagged.edges = graph.edges;
            let mut message = Message { knowledge_graph: Some(tagged), ..Message::default() };
            message.normalize().expect("normalize");
            message
        };
        let (a, b, c) = (tag(a, "A"), tag(b, "B"), tag(c, "C"));

        let mut left = a.clone();
        left.update(&b, true).expect("update");
        left.update(&c, true).expect("update");

        let mut right_tail = b;
        right_tail.update(&c, true).expect("update");
        let mut right = a;
        right.update(&right_tail, true).expect("update");

        prop_assert_eq!(left.stable_digest(), right.stable_digest());
    }

    /// Attribute identity covers the JSON value; integral floats equal integers.
    #[test]
    fn integral_float_equals_integer(value in -1_000_000i64..1_000_000) {
        let as_int = Attribute::new("biolink:p_value", json!(value));
        let as_float = Attribute::new("biolink:p_value", json!(value as f64));
        prop_assert_eq!(as_int.stable_digest(), as_float.stable_digest());
    }
}
