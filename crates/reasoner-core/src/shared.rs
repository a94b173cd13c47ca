//! # Shared Models
//!
//! Attribute, qualifier and log entry types used across the knowledge graph,
//! query graph, results and response envelope.

use crate::containers::HashableSequence;
use crate::hash::{StableHash, StableHasher};
use crate::types::{BiolinkPredicate, Curie, LogLevel};
use serde::{Deserialize, Serialize};

// =============================================================================
// ATTRIBUTE
// =============================================================================

/// Node, edge or binding attribute.
///
/// Identity covers every field, including nested sub-attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Attribute {
    pub attribute_type_id: Curie,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type_id: Option<Curie>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_attribute_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashableSequence<Attribute>>,
}

impl Attribute {
    /// Create an attribute with only a type and a value.
    #[must_use]
    pub fn new(attribute_type_id: impl Into<Curie>, value: serde_json::Value) -> Self {
        Self {
            attribute_type_id: attribute_type_id.into(),
            value,
            value_type_id: None,
            original_attribute_name: None,
            value_url: None,
            attribute_source: None,
            description: None,
            attributes: None,
        }
    }
}

impl StableHash for Attribute {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("Attribute");
        self.attribute_type_id.stable_hash(hasher);
        self.value.stable_hash(hasher);
        self.value_type_id.stable_hash(hasher);
        self.original_attribute_name.stable_hash(hasher);
        self.value_url.stable_hash(hasher);
        self.attribute_source.stable_hash(hasher);
        self.description.stable_hash(hasher);
        self.attributes.stable_hash(hasher);
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl Eq for Attribute {}

// =============================================================================
// QUALIFIER
// =============================================================================

/// Edge qualifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Qualifier {
    pub qualifier_type_id: BiolinkPredicate,
    pub qualifier_value: String,
}

impl Qualifier {
    #[must_use]
    pub fn new(qualifier_type_id: impl Into<BiolinkPredicate>, value: impl Into<String>) -> Self {
        Self {
            qualifier_type_id: qualifier_type_id.into(),
            qualifier_value: value.into(),
        }
    }
}

impl StableHash for Qualifier {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("Qualifier");
        self.qualifier_type_id.stable_hash(hasher);
        self.qualifier_value.stable_hash(hasher);
    }
}

impl PartialEq for Qualifier {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl Eq for Qualifier {}

/// Members a producer sent that this model has no field for.
///
/// Carried through serialization untouched and never part of identity.
pub type Extra = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// LOG ENTRY
// =============================================================================

/// Response log entry. Unknown members are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: Extra,
}

// =============================================================================
// TESTS
// =============================================================================
