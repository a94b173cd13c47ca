//! # Innate Primitives
//!
//! Fixed constants for the reasoner message engine.
//!
//! These values are part of the wire contract: changing any of them changes
//! the edge keys produced by normalization, so two services built with
//! different values would no longer agree on edge identity.

/// Number of digest bytes kept when an edge is re-keyed by content.
///
/// - Edge keys are the lowercase hex of the first `EDGE_KEY_DIGEST_BYTES`
///   bytes of the edge identity digest (12 hex characters).
pub const EDGE_KEY_DIGEST_BYTES: usize = 6;

/// Attribute type id for the Biolink knowledge-level annotation.
///
/// An edge carries at most one of these; merges drop incoming copies when
/// the edge already has attributes.
pub const KNOWLEDGE_LEVEL_ATTRIBUTE: &str = "biolink:knowledge_level";

/// Attribute type id for the Biolink agent-type annotation.
///
/// Same merge rule as [`KNOWLEDGE_LEVEL_ATTRIBUTE`].
pub const AGENT_TYPE_ATTRIBUTE: &str = "biolink:agent_type";

// =============================================================================
// PATTERN CONSTRAINTS
// =============================================================================

/// Compact URI: `prefix:localid`.
pub const CURIE_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.\-]*:\S*$";

/// Biolink predicate (and qualifier type): `biolink:lower_snake_case`.
pub const BIOLINK_PREDICATE_PATTERN: &str = r"^biolink:[a-z][a-z_]*$";

/// Biolink category: `biolink:UpperCamelCase`.
pub const BIOLINK_ENTITY_PATTERN: &str = r"^biolink:[A-Z][a-zA-Z_]*$";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of violations collected by a single validation pass.
///
/// A badly broken document stops being interesting after this many
/// findings; the pass truncates rather than building an unbounded report.
pub const MAX_REPORTED_VIOLATIONS: usize = 256;
