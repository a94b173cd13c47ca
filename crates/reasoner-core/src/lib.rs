//! # reasoner-core
//!
//! The deterministic merge engine for reasoner messages - THE LOGIC.
//!
//! Reasoning services exchange messages made of a query graph, a knowledge
//! graph, results and auxiliary graphs. This crate parses and validates
//! those messages, re-keys knowledge-graph edges by content, and merges
//! messages produced independently for the same query.
//!
//! ## Identity
//!
//! Every entity has a BLAKE3 content digest computed from its identity
//! fields (see [`hash`]). Equality throughout the model is digest equality,
//! and digests are always recomputed from current contents.
//!
//! ## Architectural Constraints
//!
//! - Pure and synchronous: no async, no network, no file I/O
//! - Deterministic: ordered maps, explicit digests, no process-salted hashing
//! - All-or-nothing merges: a failed [`Message::update`] leaves the target
//!   unchanged

// =============================================================================
// MODULES
// =============================================================================

pub mod auxgraphs;
pub mod containers;
pub mod hash;
pub mod kgraph;
pub mod merge;
pub mod message;
pub mod normalize;
pub mod primitives;
pub mod qgraph;
pub mod results;
pub mod shared;
pub mod types;
pub mod validate;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BiolinkEntity, BiolinkPredicate, Curie, EdgeIdentifier, KnowledgeType, LogLevel,
    ReasonerError, ResourceRole, Violation,
};

// =============================================================================
// RE-EXPORTS: Hashing and Containers
// =============================================================================

pub use containers::{HashableMapping, HashableSequence, HashableSet};
pub use hash::{Digest, StableHash, StableHasher};
pub use merge::Update;

// =============================================================================
// RE-EXPORTS: Message Model
// =============================================================================

pub use auxgraphs::{AuxiliaryGraph, AuxiliaryGraphs};
pub use kgraph::{Edge, KnowledgeGraph, Node, RetrievalSource};
pub use message::{Message, ParseOptions, Query, Response};
pub use qgraph::{
    AttributeConstraint, Operator, PathConstraint, PathfinderQueryGraph, QEdge, QNode, QPath,
    QualifierConstraint, QueryGraph, SetInterpretation, StandardQueryGraph,
};
pub use results::{
    Analysis, AnyAnalysis, EdgeBinding, NodeBinding, PathBinding, PathfinderAnalysis,
    QueryResult, Results,
};
pub use shared::{Attribute, Extra, LogEntry, Qualifier};

// =============================================================================
// RE-EXPORTS: Normalization and Validation
// =============================================================================

pub use normalize::{EdgeIdMapping, EdgeReindexer};
pub use validate::Validator;
