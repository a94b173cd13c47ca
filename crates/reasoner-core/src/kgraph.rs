//! # Knowledge Graph
//!
//! Nodes keyed by CURIE, edges keyed by edge identifier, and the merge rules
//! that let independently produced graphs be unioned.
//!
//! ## Edge Identity
//!
//! An edge is identified by (subject, object, predicate, qualifiers,
//! primary knowledge source). Aggregator provenance and attributes are
//! mergeable extras: two edges that differ only there are the same edge.

use crate::containers::{HashableMapping, HashableSet};
use crate::hash::{StableHash, StableHasher};
use crate::merge::{Update, merge_extra, union_optional};
use crate::primitives::{AGENT_TYPE_ATTRIBUTE, EDGE_KEY_DIGEST_BYTES, KNOWLEDGE_LEVEL_ATTRIBUTE};
use crate::shared::{Attribute, Extra, Qualifier};
use crate::types::{
    BiolinkEntity, BiolinkPredicate, Curie, EdgeIdentifier, ReasonerError, ResourceRole,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// NODE
// =============================================================================

/// Knowledge graph vertex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Node {
    #[serde(default)]
    pub categories: HashableSet<BiolinkEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: HashableSet<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_set: Option<bool>,
}

impl Node {
    /// Create a node with a name and nothing else.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl StableHash for Node {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("Node");
        self.categories.stable_hash(hasher);
        self.name.stable_hash(hasher);
        self.attributes.stable_hash(hasher);
        self.is_set.stable_hash(hasher);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl Update for Node {
    /// Non-empty incoming name wins; categories and attributes are unioned.
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        if let Some(name) = other.name.filter(|name| !name.is_empty()) {
            self.name = Some(name);
        }
        self.categories.extend(other.categories);
        self.attributes.extend(other.attributes);
        Ok(())
    }
}

// =============================================================================
// RETRIEVAL SOURCE
// =============================================================================

/// One link in an edge's provenance chain.
///
/// Identity is (resource_id, resource_role); upstream ids and record URLs
/// accumulate on merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSource {
    pub resource_id: Curie,
    pub resource_role: ResourceRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_resource_ids: Option<HashableSet<Curie>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_record_urls: Option<HashableSet<String>>,
}

impl RetrievalSource {
    #[must_use]
    pub fn new(resource_id: impl Into<Curie>, resource_role: ResourceRole) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_role,
            upstream_resource_ids: None,
            source_record_urls: None,
        }
    }

    /// Builder-style helper naming the sources this one retrieved from.
    #[must_use]
    pub fn with_upstream<I, C>(mut self, upstream: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Curie>,
    {
        self.upstream_resource_ids = Some(upstream.into_iter().map(Into::into).collect());
        self
    }
}

impl StableHash for RetrievalSource {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("RetrievalSource");
        self.resource_id.stable_hash(hasher);
        self.resource_role.stable_hash(hasher);
    }
}

impl PartialEq for RetrievalSource {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl Update for RetrievalSource {
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        union_optional(&mut self.upstream_resource_ids, other.upstream_resource_ids);
        union_optional(&mut self.source_record_urls, other.source_record_urls);
        Ok(())
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// Knowledge graph arc.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Edge {
    pub subject: Curie,
    pub object: Curie,
    pub predicate: BiolinkPredicate,
    pub sources: HashableSet<RetrievalSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifiers: Option<HashableSet<Qualifier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashableSet<Attribute>>,
}

impl Edge {
    #[must_use]
    pub fn new(
        subject: impl Into<Curie>,
        predicate: impl Into<BiolinkPredicate>,
        object: impl Into<Curie>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            predicate: predicate.into(),
            sources: HashableSet::new(),
            qualifiers: None,
            attributes: None,
        }
    }

    /// Resource id of the primary knowledge source.
    ///
    /// At most one source should carry the primary role. If a malformed
    /// edge carries several, the lexicographically smallest id is returned
    /// so the answer never depends on set iteration order.
    pub fn primary_knowledge_source(&self) -> Option<&Curie> {
        self.sources
            .iter()
            .filter(|source| source.resource_role == ResourceRole::PrimaryKnowledgeSource)
            .map(|source| &source.resource_id)
            .min()
    }

    /// Content-derived key used by normalization.
    #[must_use]
    pub fn content_key(&self) -> EdgeIdentifier {
        EdgeIdentifier::new(self.stable_digest().short_hex(EDGE_KEY_DIGEST_BYTES))
    }
}

impl StableHash for Edge {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("Edge");
        self.subject.stable_hash(hasher);
        self.object.stable_hash(hasher);
        self.predicate.stable_hash(hasher);
        // An empty qualifier list and an absent one describe the same edge.
        match &self.qualifiers {
            Some(qualifiers) if !qualifiers.is_empty() => hasher.write_some(qualifiers),
            _ => hasher.write_none(),
        }
        self.primary_knowledge_source().stable_hash(hasher);
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

fn is_singleton_annotation(attribute: &Attribute) -> bool {
    attribute.attribute_type_id == KNOWLEDGE_LEVEL_ATTRIBUTE
        || attribute.attribute_type_id == AGENT_TYPE_ATTRIBUTE
}

impl Update for Edge {
    /// Attributes are unioned, except that an edge that already has
    /// attributes never takes a second knowledge-level or agent-type
    /// annotation. Sources are unioned with identity-equal sources merged.
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        if let Some(incoming) = other.attributes.filter(|set| !set.is_empty()) {
            match &mut self.attributes {
                Some(existing) if !existing.is_empty() => {
                    existing.extend(
                        incoming
                            .into_iter()
                            .filter(|attribute| !is_singleton_annotation(attribute)),
                    );
                }
                _ => self.attributes = Some(incoming),
            }
        }

        self.sources
            .union_with(other.sources, |existing, incoming| existing.update(incoming))?;

        Ok(())
    }
}

// =============================================================================
// KNOWLEDGE GRAPH
// =============================================================================

/// Nodes by CURIE and edges by edge identifier.
///
/// Edges are not required to reference existing nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: HashableMapping<Curie, Node>,
    #[serde(default)]
    pub edges: HashableMapping<EdgeIdentifier, Edge>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl KnowledgeGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl StableHash for KnowledgeGraph {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("KnowledgeGraph");
        self.nodes.stable_hash(hasher);
        self.edges.stable_hash(hasher);
    }
}

impl PartialEq for KnowledgeGraph {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl Update for KnowledgeGraph {
    /// Key-based union. After normalization a key collision implies an
    /// identity collision, so colliding entities are merged.
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        self.nodes
            .merge_entries(other.nodes, |_, existing, incoming| existing.update(incoming))?;
        self.edges
            .merge_entries(other.edges, |_, existing, incoming| existing.update(incoming))?;
        merge_extra(&mut self.extra, other.extra);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sourced_edge(aggregator: &str) -> Edge {
        let mut edge = Edge::new("CHEBI:6801", "biolink:treats", "MONDO:5148");
        edge.sources.insert(RetrievalSource::new(
            "infores:kp1",
            ResourceRole::PrimaryKnowledgeSource,
        ));
        edge.sources.insert(
            RetrievalSource::new(aggregator, ResourceRole::AggregatorKnowledgeSource)
                .with_upstream(["infores:kp1"]),
        );
        edge
    }

    #[test]
    fn node_update_prefers_nonempty_incoming_name() {
        let mut node = Node::named("Ebola");
        node.update(Node::named("Ebola Hemorrhagic Fever"))
            .expect("update");
        assert_eq!(node.name.as_deref(), Some("Ebola Hemorrhagic Fever"));

        node.update(Node::named("")).expect("update");
        assert_eq!(node.name.as_deref(), Some("Ebola Hemorrhagic Fever"));
    }

    #[test]
    fn node_update_unions_attributes_and_categories() {
        let mut a = Node::named("a");
        a.categories.insert("biolink:Disease".into());
        a.attributes
            .insert(Attribute::new("biolink:publication", json!("PMID:1")));
        let mut b = Node::named("b");
        b.categories.insert("biolink:DiseaseOrPhenotypicFeature".into());
        b.attributes
            .insert(Attribute::new("biolink:publication", json!("PMID:1")));
        b.attributes
            .insert(Attribute::new("biolink:publication", json!("PMID:2")));

        a.update(b).expect("update");
        assert_eq!(a.categories.len(), 2);
        assert_eq!(a.attributes.len(), 2);
    }

    #[test]
    fn edge_identity_ignores_aggregators() {
        assert_eq!(sourced_edge("infores:ara1"), sourced_edge("infores:ara2"));
        assert_eq!(
            sourced_edge("infores:ara1").content_key(),
            sourced_edge("infores:ara2").content_key()
        );
    }

    #[test]
    fn edge_identity_depends_on_primary_source() {
        let a = sourced_edge("infores:ara1");
        let mut b = Edge::new("CHEBI:6801", "biolink:treats", "MONDO:5148");
        b.sources.insert(RetrievalSource::new(
            "infores:kp2",
            ResourceRole::PrimaryKnowledgeSource,
        ));
        assert_ne!(a, b);
    }

    #[test]
    fn edge_identity_treats_empty_qualifiers_as_absent() {
        let a = Edge::new("A:1", "biolink:affects", "B:1");
        let mut b = a.clone();
        b.qualifiers = Some(HashableSet::new());
        assert_eq!(a, b);

        let mut c = a.clone();
        c.qualifiers = Some(
            [Qualifier::new("biolink:object_direction_qualifier", "increased")]
                .into_iter()
                .collect(),
        );
        assert_ne!(a, c);
    }

    #[test]
    fn primary_source_is_order_independent() {
        let mut a = Edge::new("A:1", "biolink:affects", "B:1");
        a.sources.insert(RetrievalSource::new("infores:z", ResourceRole::PrimaryKnowledgeSource));
        a.sources.insert(RetrievalSource::new("infores:a", ResourceRole::PrimaryKnowledgeSource));
        let mut b = Edge::new("A:1", "biolink:affects", "B:1");
        b.sources.insert(RetrievalSource::new("infores:a", ResourceRole::PrimaryKnowledgeSource));
        b.sources.insert(RetrievalSource::new("infores:z", ResourceRole::PrimaryKnowledgeSource));
        assert_eq!(a.primary_knowledge_source(), b.primary_knowledge_source());
        assert_eq!(a.content_key(), b.content_key());
    }

    #[test]
    fn content_key_is_twelve_hex_chars() {
        let key = sourced_edge("infores:ara1").content_key();
        assert_eq!(key.as_str().len(), 12);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn edge_update_unions_sources() {
        let mut a = sourced_edge("infores:ara1");
        a.update(sourced_edge("infores:ara2")).expect("update");
        assert_eq!(a.sources.len(), 3);
    }

    #[test]
    fn edge_update_accumulates_upstream_ids() {
        let mut a = sourced_edge("infores:ara1");
        let mut b = sourced_edge("infores:ara1");
        b.sources.for_each_mut(|source| {
            if source.resource_role == ResourceRole::AggregatorKnowledgeSource {
                source.upstream_resource_ids = Some(
                    ["infores:kp9"].into_iter().map(Curie::from).collect(),
                );
            }
        });

        a.update(b).expect("update");
        let aggregator = a
            .sources
            .iter()
            .find(|s| s.resource_role == ResourceRole::AggregatorKnowledgeSource)
            .expect("aggregator");
        assert_eq!(
            aggregator.upstream_resource_ids.as_ref().map(HashableSet::len),
            Some(2)
        );
    }

    #[test]
    fn edge_update_drops_duplicate_knowledge_level() {
        let mut a = Edge::new("A:1", "biolink:affects", "B:1");
        a.attributes = Some(
            [Attribute::new(KNOWLEDGE_LEVEL_ATTRIBUTE, json!("knowledge_assertion"))]
                .into_iter()
                .collect(),
        );
        let mut b = a.clone();
        b.attributes = Some(
            [
                Attribute::new(KNOWLEDGE_LEVEL_ATTRIBUTE, json!("prediction")),
                Attribute::new(AGENT_TYPE_ATTRIBUTE, json!("automated_agent")),
                Attribute::new("biolink:publications", json!(["PMID:1"])),
            ]
            .into_iter()
            .collect(),
        );

        a.update(b).expect("update");
        let attributes = a.attributes.expect("attributes");
        assert_eq!(attributes.len(), 2);
        assert_eq!(
            attributes
                .iter()
                .filter(|attr| attr.attribute_type_id == KNOWLEDGE_LEVEL_ATTRIBUTE)
                .count(),
            1
        );
    }

    #[test]
    fn edge_update_takes_all_attributes_when_empty() {
        let mut a = Edge::new("A:1", "biolink:affects", "B:1");
        let mut b = a.clone();
        b.attributes = Some(
            [Attribute::new(KNOWLEDGE_LEVEL_ATTRIBUTE, json!("prediction"))]
                .into_iter()
                .collect(),
        );
        a.update(b).expect("update");
        assert_eq!(a.attributes.map(|set| set.len()), Some(1));
    }

    #[test]
    fn knowledge_graph_update_merges_colliding_nodes() {
        let mut a = KnowledgeGraph::new();
        a.nodes.insert("MONDO:1".into(), Node::named("Ebola"));
        let mut b = KnowledgeGraph::new();
        b.nodes.insert("MONDO:1".into(), Node::named("Ebola Hemorrhagic Fever"));
        b.nodes.insert("NCBIGene:1".into(), Node::named("NPC1"));

        a.update(b).expect("update");
        assert_eq!(a.nodes.len(), 2);
        assert_eq!(
            a.nodes
                .get(&"MONDO:1".into())
                .and_then(|node| node.name.as_deref()),
            Some("Ebola Hemorrhagic Fever")
        );
    }

    #[test]
    fn edge_requires_sources_on_the_wire() {
        let result: Result<Edge, _> = serde_json::from_value(json!({
            "subject": "A:1",
            "object": "B:1",
            "predicate": "biolink:affects"
        }));
        assert!(result.is_err());
    }
}
