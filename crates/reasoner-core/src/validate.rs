//! # Validation Pass
//!
//! Structural checks run by serde at parse time; this pass covers what serde
//! cannot express: identifier patterns and non-empty lists.
//!
//! - Walks the whole message and collects every violation with its path
//! - Reports at most [`MAX_REPORTED_VIOLATIONS`]
//! - Never mutates the message

use crate::containers::{HashableSequence, HashableSet};
use crate::kgraph::{Edge, KnowledgeGraph, Node};
use crate::message::Message;
use crate::primitives::{
    BIOLINK_ENTITY_PATTERN, BIOLINK_PREDICATE_PATTERN, CURIE_PATTERN, MAX_REPORTED_VIOLATIONS,
};
use crate::qgraph::{AttributeConstraint, QEdge, QNode, QPath, QueryGraph};
use crate::results::{AnyAnalysis, QueryResult};
use crate::shared::{Attribute, Qualifier};
use crate::types::{BiolinkEntity, BiolinkPredicate, Curie, ReasonerError, Violation};
use regex::Regex;
use std::sync::LazyLock;

static CURIE: LazyLock<Regex> = LazyLock::new(|| compile(CURIE_PATTERN));
static BIOLINK_PREDICATE: LazyLock<Regex> = LazyLock::new(|| compile(BIOLINK_PREDICATE_PATTERN));
static BIOLINK_ENTITY: LazyLock<Regex> = LazyLock::new(|| compile(BIOLINK_ENTITY_PATTERN));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern compiles")
}

/// Whether `value` looks like `prefix:local_id`.
pub fn is_curie(value: &str) -> bool {
    CURIE.is_match(value)
}

/// Whether `value` looks like `biolink:lower_snake_case`.
pub fn is_biolink_predicate(value: &str) -> bool {
    BIOLINK_PREDICATE.is_match(value)
}

/// Whether `value` looks like `biolink:UpperCamelCase`.
pub fn is_biolink_entity(value: &str) -> bool {
    BIOLINK_ENTITY.is_match(value)
}

/// Pattern validation over a parsed message.
pub struct Validator;

impl Validator {
    /// Validate `message`, reporting paths rooted at `message`.
    pub fn validate(message: &Message) -> Result<(), ReasonerError> {
        Self::validate_at(message, "message")
    }

    /// Validate `message`, reporting paths rooted at `root`.
    pub fn validate_at(message: &Message, root: &str) -> Result<(), ReasonerError> {
        let violations = Self::violations(message, root);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ReasonerError::Validation { violations })
        }
    }

    /// Every violation in `message`, in document order.
    pub fn violations(message: &Message, root: &str) -> Vec<Violation> {
        let mut report = Report::default();
        if let Some(graph) = &message.query_graph {
            report.query_graph(&format!("{root}.query_graph"), graph);
        }
        if let Some(graph) = &message.knowledge_graph {
            report.knowledge_graph(&format!("{root}.knowledge_graph"), graph);
        }
        if let Some(results) = &message.results {
            for (index, result) in results.iter().enumerate() {
                report.result(&format!("{root}.results[{index}]"), result);
            }
        }
        if let Some(graphs) = &message.auxiliary_graphs {
            for (id, graph) in graphs.iter() {
                report.attributes(
                    &format!("{root}.auxiliary_graphs.{id}.attributes"),
                    &graph.attributes,
                );
            }
        }
        report.violations
    }
}

#[derive(Default)]
struct Report {
    violations: Vec<Violation>,
}

impl Report {
    fn push(&mut self, path: String, message: impl Into<String>) {
        if self.violations.len() < MAX_REPORTED_VIOLATIONS {
            self.violations.push(Violation::new(path, message));
        }
    }

    fn curie(&mut self, path: &str, value: &Curie) {
        if !is_curie(value.as_str()) {
            self.push(path.to_string(), format!("'{value}' is not a CURIE"));
        }
    }

    fn predicate(&mut self, path: &str, value: &BiolinkPredicate) {
        if !is_biolink_predicate(value.as_str()) {
            self.push(path.to_string(), format!("'{value}' is not a Biolink predicate"));
        }
    }

    fn entity(&mut self, path: &str, value: &BiolinkEntity) {
        if !is_biolink_entity(value.as_str()) {
            self.push(path.to_string(), format!("'{value}' is not a Biolink category"));
        }
    }

    fn non_empty<T>(&mut self, path: &str, list: &HashableSequence<T>) {
        if list.is_empty() {
            self.push(path.to_string(), "must not be empty when present");
        }
    }

    fn attributes<'a, I>(&mut self, path: &str, attributes: I)
    where
        I: IntoIterator<Item = &'a Attribute>,
    {
        for (index, attribute) in attributes.into_iter().enumerate() {
            self.attribute(&format!("{path}[{index}]"), attribute);
        }
    }

    fn attribute(&mut self, path: &str, attribute: &Attribute) {
        self.curie(&format!("{path}.attribute_type_id"), &attribute.attribute_type_id);
        if let Some(value_type) = &attribute.value_type_id {
            self.curie(&format!("{path}.value_type_id"), value_type);
        }
        if let Some(nested) = &attribute.attributes {
            self.attributes(&format!("{path}.attributes"), nested.iter());
        }
    }

    fn qualifiers(&mut self, path: &str, qualifiers: &HashableSet<Qualifier>) {
        for (index, qualifier) in qualifiers.iter().enumerate() {
            self.predicate(
                &format!("{path}[{index}].qualifier_type_id"),
                &qualifier.qualifier_type_id,
            );
        }
    }

    // -------------------------------------------------------------------------
    // Query graph
    // -------------------------------------------------------------------------

    fn query_graph(&mut self, path: &str, graph: &QueryGraph) {
        match graph {
            QueryGraph::Standard(graph) => {
                for (key, node) in &graph.nodes {
                    self.qnode(&format!("{path}.nodes.{key}"), node);
                }
                for (key, edge) in &graph.edges {
                    self.qedge(&format!("{path}.edges.{key}"), edge);
                }
            }
            QueryGraph::Pathfinder(graph) => {
                for (key, node) in &graph.nodes {
                    self.qnode(&format!("{path}.nodes.{key}"), node);
                }
                for (key, qpath) in &graph.paths {
                    self.qpath(&format!("{path}.paths.{key}"), qpath);
                }
            }
        }
    }

    fn qnode(&mut self, path: &str, node: &QNode) {
        if let Some(ids) = &node.ids {
            self.non_empty(&format!("{path}.ids"), ids);
            for (index, id) in ids.iter().enumerate() {
                self.curie(&format!("{path}.ids[{index}]"), id);
            }
        }
        if let Some(categories) = &node.categories {
            self.non_empty(&format!("{path}.categories"), categories);
            for (index, category) in categories.iter().enumerate() {
                self.entity(&format!("{path}.categories[{index}]"), category);
            }
        }
        for (index, id) in node.member_ids.iter().enumerate() {
            self.curie(&format!("{path}.member_ids[{index}]"), id);
        }
        for (index, constraint) in node.constraints.iter().enumerate() {
            self.constraint(&format!("{path}.constraints[{index}]"), constraint);
        }
    }

    fn qedge(&mut self, path: &str, edge: &QEdge) {
        if let Some(predicates) = &edge.predicates {
            self.non_empty(&format!("{path}.predicates"), predicates);
            for (index, predicate) in predicates.iter().enumerate() {
                self.predicate(&format!("{path}.predicates[{index}]"), predicate);
            }
        }
        for (index, constraint) in edge.attribute_constraints.iter().enumerate() {
            self.constraint(&format!("{path}.attribute_constraints[{index}]"), constraint);
        }
        for (index, constraint) in edge.qualifier_constraints.iter().enumerate() {
            for (position, qualifier) in constraint.qualifier_set.iter().enumerate() {
                self.predicate(
                    &format!(
                        "{path}.qualifier_constraints[{index}].qualifier_set[{position}].qualifier_type_id"
                    ),
                    &qualifier.qualifier_type_id,
                );
            }
        }
    }

    fn qpath(&mut self, path: &str, qpath: &QPath) {
        if let Some(predicates) = &qpath.predicates {
            self.non_empty(&format!("{path}.predicates"), predicates);
            for (index, predicate) in predicates.iter().enumerate() {
                self.predicate(&format!("{path}.predicates[{index}]"), predicate);
            }
        }
        for (index, constraint) in qpath.constraints.iter().flat_map(|list| list.iter()).enumerate() {
            if let Some(categories) = &constraint.intermediate_categories {
                let base = format!("{path}.constraints[{index}].intermediate_categories");
                self.non_empty(&base, categories);
                for (position, category) in categories.iter().enumerate() {
                    self.entity(&format!("{base}[{position}]"), category);
                }
            }
        }
    }

    fn constraint(&mut self, path: &str, constraint: &AttributeConstraint) {
        self.curie(&format!("{path}.id"), &constraint.id);
    }

    // -------------------------------------------------------------------------
    // Knowledge graph
    // -------------------------------------------------------------------------

    fn knowledge_graph(&mut self, path: &str, graph: &KnowledgeGraph) {
        for (id, node) in &graph.nodes {
            let node_path = format!("{path}.nodes.{id}");
            self.curie(&node_path, id);
            self.node(&node_path, node);
        }
        for (key, edge) in &graph.edges {
            self.edge(&format!("{path}.edges.{key}"), edge);
        }
    }

    fn node(&mut self, path: &str, node: &Node) {
        for (index, category) in node.categories.iter().enumerate() {
            self.entity(&format!("{path}.categories[{index}]"), category);
        }
        self.attributes(&format!("{path}.attributes"), &node.attributes);
    }

    fn edge(&mut self, path: &str, edge: &Edge) {
        self.curie(&format!("{path}.subject"), &edge.subject);
        self.curie(&format!("{path}.object"), &edge.object);
        self.predicate(&format!("{path}.predicate"), &edge.predicate);
        for (index, source) in edge.sources.iter().enumerate() {
            let source_path = format!("{path}.sources[{index}]");
            self.curie(&format!("{source_path}.resource_id"), &source.resource_id);
            for (position, upstream) in source.upstream_resource_ids.iter().flatten().enumerate() {
                self.curie(
                    &format!("{source_path}.upstream_resource_ids[{position}]"),
                    upstream,
                );
            }
        }
        if let Some(qualifiers) = &edge.qualifiers {
            self.qualifiers(&format!("{path}.qualifiers"), qualifiers);
        }
        if let Some(attributes) = &edge.attributes {
            self.attributes(&format!("{path}.attributes"), attributes);
        }
    }

    // -------------------------------------------------------------------------
    // Results
    // -------------------------------------------------------------------------

    fn result(&mut self, path: &str, result: &QueryResult) {
        for (qnode, bindings) in &result.node_bindings {
            for (index, binding) in bindings.iter().enumerate() {
                let binding_path = format!("{path}.node_bindings.{qnode}[{index}]");
                self.curie(&format!("{binding_path}.id"), &binding.id);
                if let Some(query_id) = &binding.query_id {
                    self.curie(&format!("{binding_path}.query_id"), query_id);
                }
                self.attributes(&format!("{binding_path}.attributes"), &binding.attributes);
            }
        }
        for (index, analysis) in result.analyses.iter().enumerate() {
            let analysis_path = format!("{path}.analyses[{index}]");
            self.curie(&format!("{analysis_path}.resource_id"), analysis.resource_id());
            match analysis {
                AnyAnalysis::Standard(analysis) => {
                    for (qedge, bindings) in &analysis.edge_bindings {
                        for (position, binding) in bindings.iter().enumerate() {
                            self.attributes(
                                &format!("{analysis_path}.edge_bindings.{qedge}[{position}].attributes"),
                                &binding.attributes,
                            );
                        }
                    }
                    if let Some(attributes) = &analysis.attributes {
                        self.attributes(&format!("{analysis_path}.attributes"), attributes);
                    }
                }
                AnyAnalysis::Pathfinder(analysis) => {
                    if let Some(attributes) = &analysis.attributes {
                        self.attributes(&format!("{analysis_path}.attributes"), attributes);
                    }
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
