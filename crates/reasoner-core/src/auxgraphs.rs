//! # Auxiliary Graphs
//!
//! Named edge subsets used as supporting evidence by analyses and edges.

use crate::containers::{HashableMapping, HashableSet};
use crate::hash::{StableHash, StableHasher};
use crate::merge::{Update, merge_extra};
use crate::shared::{Attribute, Extra};
use crate::types::{EdgeIdentifier, ReasonerError};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// A set of knowledge-graph edge keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuxiliaryGraph {
    pub edges: HashableSet<EdgeIdentifier>,
    #[serde(default)]
    pub attributes: HashableSet<Attribute>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl AuxiliaryGraph {
    /// Create an auxiliary graph over the given edge keys.
    pub fn from_edges<I, E>(edges: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EdgeIdentifier>,
    {
        Self {
            edges: edges.into_iter().map(Into::into).collect(),
            attributes: HashableSet::new(),
            extra: Extra::new(),
        }
    }
}

impl StableHash for AuxiliaryGraph {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("AuxiliaryGraph");
        self.edges.stable_hash(hasher);
        self.attributes.stable_hash(hasher);
    }
}

impl PartialEq for AuxiliaryGraph {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

/// Auxiliary graphs by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuxiliaryGraphs(pub HashableMapping<String, AuxiliaryGraph>);

impl AuxiliaryGraphs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deref for AuxiliaryGraphs {
    type Target = HashableMapping<String, AuxiliaryGraph>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for AuxiliaryGraphs {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl StableHash for AuxiliaryGraphs {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("AuxiliaryGraphs");
        self.0.stable_hash(hasher);
    }
}

impl Update for AuxiliaryGraphs {
    /// Key union. The same id may appear on both sides only with identical
    /// content.
    fn update(&mut self, other: Self) -> Result<(), ReasonerError> {
        self.0.merge_entries(other.0, |id, existing, incoming| {
            if *existing == incoming {
                merge_extra(&mut existing.extra, incoming.extra);
                Ok(())
            } else {
                Err(ReasonerError::IdentityMismatch {
                    what: format!("auxiliary graph {id} differs between messages"),
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graphs(entries: &[(&str, &[&str])]) -> AuxiliaryGraphs {
        AuxiliaryGraphs(
            entries
                .iter()
                .map(|(id, edges)| ((*id).to_string(), AuxiliaryGraph::from_edges(edges.iter().copied())))
                .collect(),
        )
    }

    #[test]
    fn update_unions_disjoint_ids() {
        let mut a = graphs(&[("aux1", &["e1"])]);
        a.update(graphs(&[("aux2", &["e2"])])).expect("update");
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn update_accepts_identical_entries() {
        let mut a = graphs(&[("aux1", &["e1", "e2"])]);
        a.update(graphs(&[("aux1", &["e2", "e1"])])).expect("update");
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn unknown_members_are_kept_and_merged() {
        let mut a: AuxiliaryGraphs = serde_json::from_value(serde_json::json!({
            "aux1": {"edges": ["e1"], "label": "support"}
        }))
        .expect("parse");
        let b: AuxiliaryGraphs = serde_json::from_value(serde_json::json!({
            "aux1": {"edges": ["e1"], "weight": 2}
        }))
        .expect("parse");

        a.update(b).expect("update");
        let aux1 = a.get(&"aux1".to_string()).expect("aux1");
        assert_eq!(aux1.extra.len(), 2);
        let out = serde_json::to_value(&a).expect("serialize");
        assert_eq!(out["aux1"]["label"], serde_json::json!("support"));
    }

    #[test]
    fn update_rejects_conflicting_entries() {
        let mut a = graphs(&[("aux1", &["e1"])]);
        let err = a
            .update(graphs(&[("aux1", &["e9"])]))
            .expect_err("conflict");
        assert!(matches!(err, ReasonerError::IdentityMismatch { .. }));
    }
}
