//! # Core Type Definitions
//!
//! This module contains the leaf types shared by every part of the message
//! model:
//! - String identifiers (`Curie`, `EdgeIdentifier`, `BiolinkEntity`, `BiolinkPredicate`)
//! - Closed vocabularies (`ResourceRole`, `KnowledgeType`, `LogLevel`)
//! - Error types (`ReasonerError`, `Violation`)
//!
//! ## Validation
//!
//! Identifiers are constructed without checks so that deserialization never
//! rejects a document half-way through. Pattern constraints are enforced by
//! the [`crate::validate`] pass, which reports every offending field path at
//! once.

use crate::hash::{StableHash, StableHasher};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// STRING IDENTIFIERS
// =============================================================================

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl StableHash for $name {
            fn stable_hash(&self, hasher: &mut StableHasher) {
                self.0.as_str().stable_hash(hasher);
            }
        }
    };
}

string_identifier!(
    /// Compact URI (`prefix:localid`) naming a biomedical entity or resource.
    Curie
);

string_identifier!(
    /// Key of an edge in a knowledge graph.
    ///
    /// Producer-assigned on the wire; replaced by a content-derived key
    /// during normalization.
    EdgeIdentifier
);

string_identifier!(
    /// Biolink category, e.g. `biolink:Disease`.
    BiolinkEntity
);

string_identifier!(
    /// Biolink predicate or qualifier type, e.g. `biolink:treats`.
    BiolinkPredicate
);

// =============================================================================
// VOCABULARIES
// =============================================================================

/// Role a resource plays in an edge's provenance chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceRole {
    #[serde(alias = "biolink:primary_knowledge_source")]
    PrimaryKnowledgeSource,
    #[serde(alias = "biolink:aggregator_knowledge_source")]
    AggregatorKnowledgeSource,
    #[serde(alias = "biolink:supporting_data_source")]
    SupportingDataSource,
}

impl ResourceRole {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryKnowledgeSource => "primary_knowledge_source",
            Self::AggregatorKnowledgeSource => "aggregator_knowledge_source",
            Self::SupportingDataSource => "supporting_data_source",
        }
    }
}

impl StableHash for ResourceRole {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        self.as_str().stable_hash(hasher);
    }
}

/// Knowledge type requested on a query edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    Lookup,
    Inferred,
}

impl StableHash for KnowledgeType {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        match self {
            Self::Lookup => "lookup",
            Self::Inferred => "inferred",
        }
        .stable_hash(hasher);
    }
}

/// Severity of a response log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// A single failed constraint, located by its field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted field path, e.g. `knowledge_graph.edges.e1.predicate`.
    pub path: String,
    /// What was wrong with the value at `path`.
    pub message: String,
}

impl Violation {
    /// Create a new violation.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur while parsing, normalizing or merging messages.
///
/// - No silent failures: a merge either applies completely or not at all
/// - None of these are retryable; the core performs no I/O
#[derive(Debug, Error)]
pub enum ReasonerError {
    /// The input is malformed or fails a pattern constraint.
    #[error("Validation failed ({} violation(s)): {}", .violations.len(), join_violations(.violations))]
    Validation { violations: Vec<Violation> },

    /// Two things that must be identical for a merge are not.
    #[error("Identity mismatch: {what}")]
    IdentityMismatch { what: String },

    /// An edge reference points at a key that is not in the knowledge graph.
    #[error("Dangling edge reference {edge_id} from {referenced_from}")]
    DanglingReference {
        edge_id: String,
        referenced_from: String,
    },

    /// An entity was updated with a different kind of entity.
    #[error("Type mismatch: cannot update {expected} with {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl ReasonerError {
    /// Shorthand for a validation error with a single violation.
    #[must_use]
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            violations: vec![Violation::new(path, message)],
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
