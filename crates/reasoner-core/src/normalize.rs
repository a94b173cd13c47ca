//! # Edge Normalization
//!
//! Re-keys knowledge-graph edges by content so that the same edge reported
//! by two services ends up under the same key.
//!
//! - Every edge is re-keyed to [`Edge::content_key`]
//! - Edges that land on the same key are merged
//! - Auxiliary graphs and analysis edge bindings are rewritten through the
//!   old-key → new-key mapping
//! - A reference to a key the knowledge graph never had is an error

use crate::auxgraphs::AuxiliaryGraphs;
use crate::containers::{HashableMapping, HashableSet};
use crate::kgraph::{Edge, KnowledgeGraph};
use crate::merge::Update;
use crate::results::{AnyAnalysis, EdgeBinding, Results};
use crate::types::{EdgeIdentifier, ReasonerError};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Old-key → new-key mapping produced by [`EdgeReindexer::reindex`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeIdMapping {
    renamed: BTreeMap<EdgeIdentifier, EdgeIdentifier>,
    current: BTreeSet<EdgeIdentifier>,
}

impl EdgeIdMapping {
    /// New key for `id`.
    ///
    /// A key that is already a normalized key of the graph resolves to
    /// itself, so references that were rewritten once stay valid.
    pub fn resolve(&self, id: &EdgeIdentifier) -> Option<&EdgeIdentifier> {
        self.renamed
            .get(id)
            .or_else(|| self.current.get(id))
    }

    /// Number of original keys.
    pub fn len(&self) -> usize {
        self.renamed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renamed.is_empty()
    }

    /// (old, new) pairs in old-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EdgeIdentifier, &EdgeIdentifier)> {
        self.renamed.iter()
    }
}

/// Content-based edge re-keying.
pub struct EdgeReindexer;

impl EdgeReindexer {
    /// Re-key every edge of `graph` by content, merging collisions.
    ///
    /// On error the graph's edges are left as they were.
    pub fn reindex(graph: &mut KnowledgeGraph) -> Result<EdgeIdMapping, ReasonerError> {
        let mut mapping = EdgeIdMapping::default();
        let mut rekeyed: HashableMapping<EdgeIdentifier, Edge> = HashableMapping::new();
        let mut collisions = 0usize;

        for (old_key, edge) in &graph.edges {
            let new_key = edge.content_key();
            mapping.renamed.insert(old_key.clone(), new_key.clone());
            match rekeyed.get_mut(&new_key) {
                Some(existing) => {
                    existing.update(edge.clone())?;
                    collisions += 1;
                }
                None => {
                    rekeyed.insert(new_key, edge.clone());
                }
            }
        }

        mapping.current = rekeyed.keys().cloned().collect();
        debug!(
            edges_in = graph.edges.len(),
            edges_out = rekeyed.len(),
            collisions,
            "Edges re-keyed by content"
        );
        graph.edges = rekeyed;
        Ok(mapping)
    }

    /// Rewrite every auxiliary graph's edge keys through `mapping`.
    pub fn remap_auxiliary_graphs(
        graphs: &mut AuxiliaryGraphs,
        mapping: &EdgeIdMapping,
    ) -> Result<(), ReasonerError> {
        for (graph_id, graph) in graphs.iter_mut() {
            graph.edges = remap_keys(&graph.edges, mapping, || {
                format!("auxiliary_graphs.{graph_id}.edges")
            })?;
        }
        Ok(())
    }

    /// Rewrite every analysis edge binding through `mapping`.
    ///
    /// Bindings that collapse onto the same key are deduplicated, and
    /// analyses that become identical are merged.
    pub fn remap_results(
        results: &mut Results,
        mapping: &EdgeIdMapping,
    ) -> Result<(), ReasonerError> {
        for (position, result) in results.iter_mut().enumerate() {
            let mut remapped: Vec<AnyAnalysis> = Vec::with_capacity(result.analyses.len());
            let analyses = std::mem::take(&mut result.analyses);
            for (index, analysis) in analyses.into_iter().enumerate() {
                let mut analysis = match analysis {
                    AnyAnalysis::Standard(analysis) => analysis,
                    other => {
                        remapped.push(other);
                        continue;
                    }
                };
                for (qedge, bindings) in analysis.edge_bindings.iter_mut() {
                    *bindings = std::mem::take(bindings)
                        .into_iter()
                        .map(|mut binding| -> Result<EdgeBinding, ReasonerError> {
                            binding.id = mapping.resolve(&binding.id).cloned().ok_or_else(|| {
                                ReasonerError::DanglingReference {
                                    edge_id: binding.id.to_string(),
                                    referenced_from: format!(
                                        "results[{position}].analyses[{index}].edge_bindings.{qedge}"
                                    ),
                                }
                            })?;
                            Ok(binding)
                        })
                        .collect::<Result<_, ReasonerError>>()?;
                }
                remapped.push(AnyAnalysis::Standard(analysis));
            }
            result
                .analyses
                .union_with(remapped, |existing, incoming| existing.update(incoming))?;
        }
        results.deduplicate()
    }

    /// Re-key the graph and rewrite every reference to its edges.
    pub fn normalize(
        graph: &mut KnowledgeGraph,
        results: Option<&mut Results>,
        auxiliary_graphs: Option<&mut AuxiliaryGraphs>,
    ) -> Result<EdgeIdMapping, ReasonerError> {
        let mapping = Self::reindex(graph)?;
        if let Some(graphs) = auxiliary_graphs {
            Self::remap_auxiliary_graphs(graphs, &mapping)?;
        }
        if let Some(results) = results {
            Self::remap_results(results, &mapping)?;
        }
        Ok(mapping)
    }
}

fn remap_keys<F>(
    keys: &HashableSet<EdgeIdentifier>,
    mapping: &EdgeIdMapping,
    referenced_from: F,
) -> Result<HashableSet<EdgeIdentifier>, ReasonerError>
where
    F: Fn() -> String,
{
    keys.iter()
        .map(|key| {
            mapping
                .resolve(key)
                .cloned()
                .ok_or_else(|| ReasonerError::DanglingReference {
                    edge_id: key.to_string(),
                    referenced_from: referenced_from(),
                })
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auxgraphs::AuxiliaryGraph;
    use crate::kgraph::RetrievalSource;
    use crate::results::{Analysis, NodeBinding, QueryResult};
    use crate::types::ResourceRole;

    fn edge(primary: &str, aggregator: &str) -> Edge {
        let mut edge = Edge::new("CHEBI:6801", "biolink:treats", "MONDO:5148");
        edge.sources
            .insert(RetrievalSource::new(primary, ResourceRole::PrimaryKnowledgeSource));
        edge.sources.insert(
            RetrievalSource::new(aggregator, ResourceRole::AggregatorKnowledgeSource)
                .with_upstream([primary]),
        );
        edge
    }

    fn graph(edges: Vec<(&str, Edge)>) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        for (key, edge) in edges {
            graph.edges.insert(key.into(), edge);
        }
        graph
    }

    #[test]
    fn reindex_merges_identical_edges() {
        let mut kg = graph(vec![
            ("e1", edge("infores:kp1", "infores:ara1")),
            ("e2", edge("infores:kp1", "infores:ara2")),
        ]);
        let mapping = EdgeReindexer::reindex(&mut kg).expect("reindex");

        assert_eq!(kg.edges.len(), 1);
        assert_eq!(mapping.len(), 2);
        let merged = kg.edges.values().next().expect("edge");
        assert_eq!(merged.sources.len(), 3);
        assert_eq!(
            mapping.resolve(&"e1".into()),
            mapping.resolve(&"e2".into())
        );
    }

    #[test]
    fn reindex_keeps_distinct_edges_apart() {
        let mut kg = graph(vec![
            ("e1", edge("infores:kp1", "infores:ara1")),
            ("e2", edge("infores:kp2", "infores:ara1")),
        ]);
        EdgeReindexer::reindex(&mut kg).expect("reindex");
        assert_eq!(kg.edges.len(), 2);
    }

    #[test]
    fn reindex_is_idempotent() {
        let mut kg = graph(vec![("e1", edge("infores:kp1", "infores:ara1"))]);
        EdgeReindexer::reindex(&mut kg).expect("reindex");
        let once = kg.clone();
        EdgeReindexer::reindex(&mut kg).expect("reindex");
        assert_eq!(once, kg);
    }

    #[test]
    fn normalized_key_resolves_to_itself() {
        let mut kg = graph(vec![("e1", edge("infores:kp1", "infores:ara1"))]);
        let mapping = EdgeReindexer::reindex(&mut kg).expect("reindex");
        let key = kg.edges.keys().next().expect("key").clone();
        assert_eq!(mapping.resolve(&key), Some(&key));
    }

    #[test]
    fn auxiliary_graph_references_follow_the_mapping() {
        let mut kg = graph(vec![
            ("e1", edge("infores:kp1", "infores:ara1")),
            ("e2", edge("infores:kp1", "infores:ara2")),
        ]);
        let mut aux = AuxiliaryGraphs::new();
        aux.insert("aux1".into(), AuxiliaryGraph::from_edges(["e1", "e2"]));

        EdgeReindexer::normalize(&mut kg, None, Some(&mut aux)).expect("normalize");
        let key = kg.edges.keys().next().expect("key");
        let rewritten = aux.get(&"aux1".to_string()).expect("aux1");
        assert_eq!(rewritten.edges.len(), 1);
        assert!(rewritten.edges.contains(key));
    }

    #[test]
    fn dangling_auxiliary_reference_is_an_error() {
        let mut kg = graph(vec![("e1", edge("infores:kp1", "infores:ara1"))]);
        let mut aux = AuxiliaryGraphs::new();
        aux.insert("aux1".into(), AuxiliaryGraph::from_edges(["e9"]));

        let err = EdgeReindexer::normalize(&mut kg, None, Some(&mut aux)).expect_err("dangling");
        assert!(matches!(
            err,
            ReasonerError::DanglingReference { ref edge_id, .. } if edge_id == "e9"
        ));
    }

    #[test]
    fn edge_bindings_follow_the_mapping() {
        let mut kg = graph(vec![
            ("e1", edge("infores:kp1", "infores:ara1")),
            ("e2", edge("infores:kp1", "infores:ara2")),
        ]);
        let mut result = QueryResult::new();
        result.bind_node("n0", NodeBinding::new("MONDO:5148"));
        let mut analysis = Analysis::new("infores:ara1");
        analysis.bind_edge("e0", EdgeBinding::new("e1"));
        analysis.bind_edge("e0", EdgeBinding::new("e2"));
        result.analyses.insert(analysis.into());
        let mut results = Results::from_results([result]).expect("results");

        EdgeReindexer::normalize(&mut kg, Some(&mut results), None).expect("normalize");

        let key = kg.edges.keys().next().expect("key").clone();
        let analysis = results[0]
            .analyses
            .iter()
            .find_map(|analysis| match analysis {
                AnyAnalysis::Standard(analysis) => Some(analysis),
                AnyAnalysis::Pathfinder(_) => None,
            })
            .expect("standard analysis");
        let bindings = analysis.edge_bindings.get(&"e0".to_string()).expect("e0");
        assert_eq!(bindings.len(), 1);
        assert!(bindings.iter().all(|binding| binding.id == key));
    }

    #[test]
    fn dangling_edge_binding_is_an_error() {
        let mut kg = graph(vec![("e1", edge("infores:kp1", "infores:ara1"))]);
        let mut result = QueryResult::new();
        let mut analysis = Analysis::new("infores:ara1");
        analysis.bind_edge("e0", EdgeBinding::new("missing"));
        result.analyses.insert(analysis.into());
        let mut results = Results::from_results([result]).expect("results");

        let err = EdgeReindexer::normalize(&mut kg, Some(&mut results), None)
            .expect_err("dangling");
        assert!(matches!(err, ReasonerError::DanglingReference { .. }));
    }
}
