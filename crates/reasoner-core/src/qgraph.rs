//! # Query Graph
//!
//! The question a message answers. Query graphs are never merged: two
//! messages can only be combined when their query graphs are identical, so
//! here they only need a faithful wire shape and a content digest.

use crate::containers::{HashableMapping, HashableSequence};
use crate::hash::{StableHash, StableHasher};
use crate::shared::Qualifier;
use crate::types::{BiolinkEntity, BiolinkPredicate, Curie, KnowledgeType};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// =============================================================================
// CONSTRAINTS
// =============================================================================

/// Comparison operator of an attribute constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    EqualTo,
    #[serde(rename = "===")]
    DeepEqualTo,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "matches")]
    Matches,
}

impl Operator {
    const fn as_str(self) -> &'static str {
        match self {
            Self::EqualTo => "==",
            Self::DeepEqualTo => "===",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::Matches => "matches",
        }
    }
}

/// Constraint on a query node's or query edge's attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeConstraint {
    pub name: String,
    pub id: Curie,
    /// Serialized as `not`.
    #[serde(rename = "not", default)]
    pub negated: bool,
    pub operator: Operator,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<serde_json::Value>,
}

impl StableHash for AttributeConstraint {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("AttributeConstraint");
        self.name.stable_hash(hasher);
        self.id.stable_hash(hasher);
        self.negated.stable_hash(hasher);
        self.operator.as_str().stable_hash(hasher);
        self.value.stable_hash(hasher);
        self.unit_id.stable_hash(hasher);
        self.unit_name.stable_hash(hasher);
    }
}

/// A conjunction of qualifiers a matching edge must carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualifierConstraint {
    #[serde(default)]
    pub qualifier_set: HashableSequence<Qualifier>,
}

impl StableHash for QualifierConstraint {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("QualifierConstraint");
        self.qualifier_set.stable_hash(hasher);
    }
}

/// How a query node binding set should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SetInterpretation {
    Batch,
    All,
    Many,
}

impl StableHash for SetInterpretation {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        match self {
            Self::Batch => "BATCH",
            Self::All => "ALL",
            Self::Many => "MANY",
        }
        .stable_hash(hasher);
    }
}

// =============================================================================
// QUERY NODE / EDGE / PATH
// =============================================================================

/// Query node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<HashableSequence<Curie>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<HashableSequence<BiolinkEntity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_interpretation: Option<SetInterpretation>,
    #[serde(default)]
    pub constraints: HashableSequence<AttributeConstraint>,
    #[serde(default)]
    pub member_ids: HashableSequence<Curie>,
}

impl StableHash for QNode {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("QNode");
        self.ids.stable_hash(hasher);
        self.categories.stable_hash(hasher);
        self.set_interpretation.stable_hash(hasher);
        self.constraints.stable_hash(hasher);
        self.member_ids.stable_hash(hasher);
    }
}

/// Query edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QEdge {
    pub subject: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_type: Option<KnowledgeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicates: Option<HashableSequence<BiolinkPredicate>>,
    #[serde(default)]
    pub attribute_constraints: HashableSequence<AttributeConstraint>,
    #[serde(default)]
    pub qualifier_constraints: HashableSequence<QualifierConstraint>,
}

impl QEdge {
    #[must_use]
    pub fn new(subject: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            knowledge_type: None,
            predicates: None,
            attribute_constraints: HashableSequence::new(),
            qualifier_constraints: HashableSequence::new(),
        }
    }
}

impl StableHash for QEdge {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("QEdge");
        self.subject.stable_hash(hasher);
        self.object.stable_hash(hasher);
        self.knowledge_type.stable_hash(hasher);
        self.predicates.stable_hash(hasher);
        self.attribute_constraints.stable_hash(hasher);
        self.qualifier_constraints.stable_hash(hasher);
    }
}

/// Constraint on the intermediate nodes of a query path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_categories: Option<HashableSequence<BiolinkEntity>>,
}

impl StableHash for PathConstraint {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("PathConstraint");
        self.intermediate_categories.stable_hash(hasher);
    }
}

/// Query path between two query nodes, for pathfinder queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QPath {
    pub subject: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicates: Option<HashableSequence<BiolinkPredicate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<HashableSequence<PathConstraint>>,
}

impl StableHash for QPath {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("QPath");
        self.subject.stable_hash(hasher);
        self.object.stable_hash(hasher);
        self.predicates.stable_hash(hasher);
        self.constraints.stable_hash(hasher);
    }
}

// =============================================================================
// QUERY GRAPH
// =============================================================================

/// Query graph of nodes and edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StandardQueryGraph {
    pub nodes: HashableMapping<String, QNode>,
    #[serde(default)]
    pub edges: HashableMapping<String, QEdge>,
}

/// Query graph of nodes and paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathfinderQueryGraph {
    pub nodes: HashableMapping<String, QNode>,
    pub paths: HashableMapping<String, QPath>,
}

/// Either shape of query graph. The wire form carries no tag: a graph with
/// `paths` is pathfinder, anything else standard.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueryGraph {
    Standard(StandardQueryGraph),
    Pathfinder(PathfinderQueryGraph),
}

impl<'de> Deserialize<'de> for QueryGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(QueryGraphVisitor)
    }
}

const QUERY_GRAPH_FIELDS: &[&str] = &["nodes", "edges", "paths"];

struct QueryGraphVisitor;

impl<'de> Visitor<'de> for QueryGraphVisitor {
    type Value = QueryGraph;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a query graph with nodes and either edges or paths")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut nodes: Option<HashableMapping<String, QNode>> = None;
        let mut edges: Option<HashableMapping<String, QEdge>> = None;
        let mut paths: Option<HashableMapping<String, QPath>> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "nodes" => nodes = Some(map.next_value()?),
                "edges" => edges = Some(map.next_value()?),
                "paths" => paths = Some(map.next_value()?),
                other => return Err(de::Error::unknown_field(other, QUERY_GRAPH_FIELDS)),
            }
        }

        let nodes = nodes.ok_or_else(|| de::Error::missing_field("nodes"))?;
        match (edges, paths) {
            (Some(_), Some(_)) => Err(de::Error::custom(
                "query graph has both edges and paths",
            )),
            (None, Some(paths)) => Ok(QueryGraph::Pathfinder(PathfinderQueryGraph { nodes, paths })),
            (edges, None) => Ok(QueryGraph::Standard(StandardQueryGraph {
                nodes,
                edges: edges.unwrap_or_default(),
            })),
        }
    }
}

impl QueryGraph {
    /// Query node keys, whichever the shape.
    pub fn nodes(&self) -> &HashableMapping<String, QNode> {
        match self {
            Self::Standard(graph) => &graph.nodes,
            Self::Pathfinder(graph) => &graph.nodes,
        }
    }
}

impl StableHash for QueryGraph {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        match self {
            Self::Standard(graph) => {
                hasher.write_tag("QueryGraph");
                graph.nodes.stable_hash(hasher);
                graph.edges.stable_hash(hasher);
            }
            Self::Pathfinder(graph) => {
                hasher.write_tag("PathfinderQueryGraph");
                graph.nodes.stable_hash(hasher);
                graph.paths.stable_hash(hasher);
            }
        }
    }
}

impl PartialEq for QueryGraph {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

// =============================================================================
// TESTS
// =============================================================================
