//! # Results
//!
//! Node bindings, analyses and the result collection.
//!
//! A result is identified by its node bindings alone: two results binding
//! the same knowledge-graph nodes to the same query nodes are the same
//! answer, however differently they were scored. Their analyses are unioned.

use crate::containers::{HashableMapping, HashableSet};
use crate::hash::{Digest, StableHash, StableHasher};
use crate::merge::{Update, merge_extra, union_optional};
use crate::shared::{Attribute, Extra};
use crate::types::{Curie, EdgeIdentifier, ReasonerError};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use tracing::debug;

// =============================================================================
// BINDINGS
// =============================================================================

/// Binding of a query node to a knowledge-graph node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeBinding {
    pub id: Curie,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<Curie>,
    #[serde(default)]
    pub attributes: HashableSet<Attribute>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl NodeBinding {
    #[must_use]
    pub fn new(id: impl Into<Curie>) -> Self {
        Self {
            id: id.into(),
            query_id: None,
            attributes: HashableSet::new(),
            extra: Extra::new(),
        }
    }
}

impl StableHash for NodeBinding {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("NodeBinding");
        self.id.stable_hash(hasher);
        self.query_id.stable_hash(hasher);
        self.attributes.stable_hash(hasher);
    }
}

/// Binding of a query edge to a knowledge-graph edge key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeBinding {
    pub id: EdgeIdentifier,
    #[serde(default)]
    pub attributes: HashableSet<Attribute>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl EdgeBinding {
    #[must_use]
    pub fn new(id: impl Into<EdgeIdentifier>) -> Self {
        Self {
            id: id.into(),
            attributes: HashableSet::new(),
            extra: Extra::new(),
        }
    }
}

impl StableHash for EdgeBinding {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("EdgeBinding");
        self.id.stable_hash(hasher);
        self.attributes.stable_hash(hasher);
    }
}

/// Binding of a query path to an auxiliary graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathBinding {
    pub id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PathBinding {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Extra::new(),
        }
    }
}

impl StableHash for PathBinding {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("PathBinding");
        self.id.stable_hash(hasher);
    }
}

// =============================================================================
// ANALYSES
// =============================================================================

/// One reasoning service's justification of a result.
///
/// Identity is everything except attributes and extra members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub resource_id: Curie,
    pub edge_bindings: HashableMapping<String, HashableSet<EdgeBinding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_graphs: Option<HashableSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashableSet<Attribute>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Analysis {
    #[must_use]
    pub fn new(resource_id: impl Into<Curie>) -> Self {
        Self {
            resource_id: resource_id.into(),
            edge_bindings: HashableMapping::new(),
            score: None,
            support_graphs: None,
            scoring_method: None,
            attributes: None,
            extra: Extra::new(),
        }
    }

    /// Add a binding for query edge `qedge`.
    pub fn bind_edge(&mut self, qedge: impl Into<String>, binding: EdgeBinding) {
        let qedge = qedge.into();
        match self.edge_bindings.get_mut(&qedge) {
            Some(bindings) => {
                bindings.insert(binding);
            }
            None => {
                self.edge_bindings
                    .insert(qedge, std::iter::once(binding).collect());
            }
        }
    }
}

impl StableHash for Analysis {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("Analysis");
        self.resource_id.stable_hash(hasher);
        self.edge_bindings.stable_hash(hasher);
        self.score.stable_hash(hasher);
        self.support_graphs.stable_hash(hasher);
        self.scoring_method.stable_hash(hasher);
    }
}

impl Update for Analysis {
    /// Edge bindings are unioned per query edge; support graphs and
    /// attributes are unioned.
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        self.edge_bindings
            .merge_entries(other.edge_bindings, |_, existing, incoming| {
                existing.extend(incoming);
                Ok::<(), ReasonerError>(())
            })?;
        union_optional(&mut self.support_graphs, other.support_graphs);
        union_optional(&mut self.attributes, other.attributes);
        merge_extra(&mut self.extra, other.extra);
        Ok(())
    }
}

/// Analysis of a pathfinder result, binding query paths to auxiliary graphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathfinderAnalysis {
    pub resource_id: Curie,
    pub path_bindings: HashableMapping<String, HashableSet<PathBinding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_graphs: Option<HashableSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashableSet<Attribute>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PathfinderAnalysis {
    #[must_use]
    pub fn new(resource_id: impl Into<Curie>) -> Self {
        Self {
            resource_id: resource_id.into(),
            path_bindings: HashableMapping::new(),
            score: None,
            support_graphs: None,
            scoring_method: None,
            attributes: None,
            extra: Extra::new(),
        }
    }
}

impl StableHash for PathfinderAnalysis {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("PathfinderAnalysis");
        self.resource_id.stable_hash(hasher);
        self.path_bindings.stable_hash(hasher);
        self.score.stable_hash(hasher);
        self.support_graphs.stable_hash(hasher);
        self.scoring_method.stable_hash(hasher);
    }
}

impl Update for PathfinderAnalysis {
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        self.path_bindings
            .merge_entries(other.path_bindings, |_, existing, incoming| {
                existing.extend(incoming);
                Ok::<(), ReasonerError>(())
            })?;
        union_optional(&mut self.support_graphs, other.support_graphs);
        union_optional(&mut self.attributes, other.attributes);
        merge_extra(&mut self.extra, other.extra);
        Ok(())
    }
}

/// Either kind of analysis. A result's analyses may mix both.
///
/// The wire form carries no tag: an analysis with `path_bindings` is a
/// pathfinder analysis, one with `edge_bindings` a standard one.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnyAnalysis {
    Standard(Analysis),
    Pathfinder(PathfinderAnalysis),
}

impl AnyAnalysis {
    pub fn resource_id(&self) -> &Curie {
        match self {
            Self::Standard(analysis) => &analysis.resource_id,
            Self::Pathfinder(analysis) => &analysis.resource_id,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Standard(analysis) => analysis.score,
            Self::Pathfinder(analysis) => analysis.score,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Standard(_) => "Analysis",
            Self::Pathfinder(_) => "PathfinderAnalysis",
        }
    }
}

impl<'de> Deserialize<'de> for AnyAnalysis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AnalysisVisitor)
    }
}

/// Reads either analysis shape in a single pass over the object, so an
/// error inside a field is reported at that field.
struct AnalysisVisitor;

impl<'de> Visitor<'de> for AnalysisVisitor {
    type Value = AnyAnalysis;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an analysis object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut resource_id: Option<Curie> = None;
        let mut edge_bindings: Option<HashableMapping<String, HashableSet<EdgeBinding>>> = None;
        let mut path_bindings: Option<HashableMapping<String, HashableSet<PathBinding>>> = None;
        let mut score: Option<f64> = None;
        let mut support_graphs: Option<HashableSet<String>> = None;
        let mut scoring_method: Option<String> = None;
        let mut attributes: Option<HashableSet<Attribute>> = None;
        let mut extra = Extra::new();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "resource_id" => resource_id = Some(map.next_value()?),
                "edge_bindings" => edge_bindings = Some(map.next_value()?),
                "path_bindings" => path_bindings = Some(map.next_value()?),
                "score" => score = map.next_value()?,
                "support_graphs" => support_graphs = map.next_value()?,
                "scoring_method" => scoring_method = map.next_value()?,
                "attributes" => attributes = map.next_value()?,
                other => {
                    extra.insert(other.to_string(), map.next_value()?);
                }
            }
        }

        let resource_id = resource_id.ok_or_else(|| de::Error::missing_field("resource_id"))?;
        match (edge_bindings, path_bindings) {
            (Some(_), Some(_)) => Err(de::Error::custom(
                "analysis has both edge_bindings and path_bindings",
            )),
            (Some(edge_bindings), None) => Ok(AnyAnalysis::Standard(Analysis {
                resource_id,
                edge_bindings,
                score,
                support_graphs,
                scoring_method,
                attributes,
                extra,
            })),
            (None, Some(path_bindings)) => Ok(AnyAnalysis::Pathfinder(PathfinderAnalysis {
                resource_id,
                path_bindings,
                score,
                support_graphs,
                scoring_method,
                attributes,
                extra,
            })),
            (None, None) => Err(de::Error::missing_field("edge_bindings")),
        }
    }
}

impl From<Analysis> for AnyAnalysis {
    fn from(analysis: Analysis) -> Self {
        Self::Standard(analysis)
    }
}

impl From<PathfinderAnalysis> for AnyAnalysis {
    fn from(analysis: PathfinderAnalysis) -> Self {
        Self::Pathfinder(analysis)
    }
}

impl StableHash for AnyAnalysis {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        match self {
            Self::Standard(analysis) => analysis.stable_hash(hasher),
            Self::Pathfinder(analysis) => analysis.stable_hash(hasher),
        }
    }
}

impl PartialEq for AnyAnalysis {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl Update for AnyAnalysis {
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        match (self, other) {
            (Self::Standard(existing), Self::Standard(incoming)) => existing.update(incoming),
            (Self::Pathfinder(existing), Self::Pathfinder(incoming)) => {
                existing.update(incoming)
            }
            (existing, incoming) => Err(ReasonerError::TypeMismatch {
                expected: existing.kind(),
                found: incoming.kind(),
            }),
        }
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// One answer to the query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub node_bindings: HashableMapping<String, HashableSet<NodeBinding>>,
    #[serde(default)]
    pub analyses: HashableSet<AnyAnalysis>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl QueryResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding for query node `qnode`.
    pub fn bind_node(&mut self, qnode: impl Into<String>, binding: NodeBinding) {
        let qnode = qnode.into();
        match self.node_bindings.get_mut(&qnode) {
            Some(bindings) => {
                bindings.insert(binding);
            }
            None => {
                self.node_bindings
                    .insert(qnode, std::iter::once(binding).collect());
            }
        }
    }

    /// Collapse analyses that share a resource id into one per resource.
    ///
    /// Standard and pathfinder analyses are grouped separately. The first
    /// analysis seen for a resource keeps its score and scoring method;
    /// bindings, support graphs and attributes of the others are folded in.
    pub fn combine_analyses_by_resource_id(&mut self) -> Result<(), ReasonerError> {
        let mut combined: Vec<AnyAnalysis> = Vec::new();
        let mut index: BTreeMap<(&'static str, Curie), usize> = BTreeMap::new();
        for analysis in std::mem::take(&mut self.analyses) {
            let key = (analysis.kind(), analysis.resource_id().clone());
            match index.get(&key) {
                Some(&position) => combined[position].update(analysis)?,
                None => {
                    index.insert(key, combined.len());
                    combined.push(analysis);
                }
            }
        }
        self.analyses
            .union_with(combined, |existing, incoming| existing.update(incoming))
    }

    /// Highest analysis score, if any analysis is scored.
    pub fn max_score(&self) -> Option<f64> {
        self.analyses
            .iter()
            .filter_map(AnyAnalysis::score)
            .reduce(f64::max)
    }
}

impl StableHash for QueryResult {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("Result");
        self.node_bindings.stable_hash(hasher);
    }
}

impl PartialEq for QueryResult {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl Update for QueryResult {
    /// Analyses are unioned, identity-equal analyses merged.
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        self.analyses
            .union_with(other.analyses, |existing, incoming| existing.update(incoming))?;
        merge_extra(&mut self.extra, other.extra);
        Ok(())
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Result collection in which no two results share node bindings.
///
/// Deserialization collapses duplicate results. Merging keeps the order in
/// which each distinct result was first seen, but identity ignores order:
/// position is not part of what a result means.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Results {
    items: Vec<QueryResult>,
}

impl Results {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, merging duplicate results.
    pub fn from_results<I>(results: I) -> Result<Self, ReasonerError>
    where
        I: IntoIterator<Item = QueryResult>,
    {
        let mut collection = Self::new();
        collection.absorb(results)?;
        Ok(collection)
    }

    /// Append a result, merging it into an existing one with the same node
    /// bindings.
    pub fn add(&mut self, result: QueryResult) -> Result<(), ReasonerError> {
        self.absorb(std::iter::once(result))
    }

    /// Merge results that have become duplicates.
    pub fn deduplicate(&mut self) -> Result<(), ReasonerError> {
        let items = std::mem::take(&mut self.items);
        let before = items.len();
        self.absorb(items)?;
        if self.items.len() < before {
            debug!(
                results_in = before,
                results_out = self.items.len(),
                "Duplicate results collapsed"
            );
        }
        Ok(())
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, QueryResult> {
        self.items.iter_mut()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<QueryResult> {
        self.items
    }

    fn absorb<I>(&mut self, incoming: I) -> Result<(), ReasonerError>
    where
        I: IntoIterator<Item = QueryResult>,
    {
        let mut index: BTreeMap<Digest, usize> = self
            .items
            .iter()
            .enumerate()
            .map(|(position, result)| (result.stable_digest(), position))
            .collect();
        for result in incoming {
            let digest = result.stable_digest();
            match index.get(&digest) {
                Some(&position) => self.items[position].update(result)?,
                None => {
                    index.insert(digest, self.items.len());
                    self.items.push(result);
                }
            }
        }
        Ok(())
    }
}

impl Deref for Results {
    type Target = [QueryResult];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl IntoIterator for Results {
    type Item = QueryResult;
    type IntoIter = std::vec::IntoIter<QueryResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Results {
    type Item = &'a QueryResult;
    type IntoIter = std::slice::Iter<'a, QueryResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl StableHash for Results {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("Results");
        hasher.write_unordered(self.items.iter().map(StableHash::stable_digest).collect());
    }
}

impl PartialEq for Results {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl Update for Results {
    /// Results with equal node bindings are merged; the rest are appended.
    ///
    /// Not transactional on its own: an error leaves earlier merges applied.
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        self.absorb(other.items)
    }
}

impl<'de> Deserialize<'de> for Results {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<QueryResult>::deserialize(deserializer)?;
        Self::from_results(items).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// TESTS
// =============================================================================
