//! # Merge Protocol
//!
//! The `Update` trait is the single seam every mergeable entity implements:
//! nodes, sources, edges, knowledge graphs, analyses, results and auxiliary
//! graphs. `update` folds `other` into `self` in place.
//!
//! - Identity fields never change through `update` on a key-matched entity
//!   (the match happened because they were equal).
//! - Mergeable extras (attributes, provenance, bindings) are unioned.
//! - Nothing here rolls back on error; all-or-nothing behaviour is provided
//!   one level up, by [`crate::message::Message::update`] staging into a copy.

use crate::containers::HashableSet;
use crate::hash::StableHash;
use crate::shared::Extra;
use crate::types::ReasonerError;

/// An entity that can absorb another entity of the same kind.
pub trait Update: Sized {
    /// Fold `other` into `self`.
    fn update(&mut self, other: Self) -> Result<(), ReasonerError>;
}

/// Union an optional set into another.
///
/// An empty or absent incoming set changes nothing; an empty or absent
/// target set is replaced outright.
pub(crate) fn union_optional<V: StableHash>(
    target: &mut Option<HashableSet<V>>,
    incoming: Option<HashableSet<V>>,
) {
    let Some(incoming) = incoming.filter(|set| !set.is_empty()) else {
        return;
    };
    match target {
        Some(existing) if !existing.is_empty() => existing.extend(incoming),
        _ => *target = Some(incoming),
    }
}

/// Keep every extra member of `incoming` that `target` does not already
/// have. On a shared key the target's value wins.
pub(crate) fn merge_extra(target: &mut Extra, incoming: Extra) {
    for (key, value) in incoming {
        target.entry(key).or_insert(value);
    }
}
