//! # Message
//!
//! The unit of exchange between reasoning services, plus the query and
//! response envelopes that carry it.
//!
//! ## Merge Protocol
//!
//! 1. Query graphs must be identical (by digest), else `IdentityMismatch`
//! 2. `other` is deep-copied, and normalized if requested
//! 3. The copy is merged into a staged clone of `self`: knowledge graph,
//!    results and auxiliary graphs each by their own update rule
//! 4. Only when every step succeeds is the staged clone swapped in
//!
//! A failed merge therefore leaves `self` exactly as it was.

use crate::auxgraphs::AuxiliaryGraphs;
use crate::hash::{Digest, StableHash, StableHasher};
use crate::kgraph::KnowledgeGraph;
use crate::merge::Update;
use crate::normalize::EdgeReindexer;
use crate::qgraph::QueryGraph;
use crate::results::Results;
use crate::shared::{Extra, LogEntry};
use crate::types::{LogLevel, ReasonerError, Violation};
use crate::validate::Validator;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Options applied when a message is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Re-key knowledge-graph edges by content after parsing.
    pub normalize: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { normalize: true }
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// Query graph, knowledge graph, results and auxiliary graphs.
///
/// Every part is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_graph: Option<QueryGraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_graph: Option<KnowledgeGraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Results>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_graphs: Option<AuxiliaryGraphs>,
}

impl Message {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse, validate and normalize a message from JSON text.
    pub fn parse(json: &str) -> Result<Self, ReasonerError> {
        Self::parse_with(json, ParseOptions::default())
    }

    /// Parse and validate a message, normalizing only if `options` say so.
    pub fn parse_with(json: &str, options: ParseOptions) -> Result<Self, ReasonerError> {
        let message: Self = from_json(json, "message")?;
        message.prepared(options, "message")
    }

    /// Same as [`Message::parse_with`], from an already-parsed JSON value.
    pub fn from_value(
        value: serde_json::Value,
        options: ParseOptions,
    ) -> Result<Self, ReasonerError> {
        let message: Self = serde_path_to_error::deserialize(value)
            .map_err(|err| structural_error("message", err))?;
        message.prepared(options, "message")
    }

    fn prepared(mut self, options: ParseOptions, path: &str) -> Result<Self, ReasonerError> {
        Validator::validate_at(&self, path)?;
        if options.normalize {
            self.normalize_in_place()?;
        }
        Ok(self)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String, ReasonerError> {
        serde_json::to_string(self).map_err(|err| ReasonerError::SerializationError(err.to_string()))
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, ReasonerError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| ReasonerError::SerializationError(err.to_string()))
    }

    pub fn to_value(&self) -> Result<serde_json::Value, ReasonerError> {
        serde_json::to_value(self).map_err(|err| ReasonerError::SerializationError(err.to_string()))
    }

    /// Re-key knowledge-graph edges by content and rewrite every reference.
    ///
    /// Idempotent. On error the message is unchanged.
    pub fn normalize(&mut self) -> Result<(), ReasonerError> {
        let mut staged = self.clone();
        staged.normalize_in_place()?;
        *self = staged;
        Ok(())
    }

    fn normalize_in_place(&mut self) -> Result<(), ReasonerError> {
        if let Some(graph) = self.knowledge_graph.as_mut() {
            EdgeReindexer::normalize(
                graph,
                self.results.as_mut(),
                self.auxiliary_graphs.as_mut(),
            )?;
        }
        Ok(())
    }

    /// Digest of the query graph; an absent query graph has a digest too.
    pub fn query_graph_digest(&self) -> Digest {
        self.query_graph.stable_digest()
    }

    /// Merge `other` into `self`.
    ///
    /// `other` is copied first and is never modified. With `normalize`, the
    /// copy's edges are re-keyed before merging; `self` is assumed to be
    /// normalized already.
    pub fn update(&mut self, other: &Self, normalize: bool) -> Result<(), ReasonerError> {
        if self.query_graph_digest() != other.query_graph_digest() {
            return Err(ReasonerError::IdentityMismatch {
                what: "query graphs differ; messages answer different questions".to_string(),
            });
        }

        let mut incoming = other.clone();
        if normalize {
            incoming.normalize_in_place()?;
        }

        let mut staged = self.clone();
        staged.absorb(incoming)?;
        *self = staged;

        debug!(
            edges = self.knowledge_graph.as_ref().map_or(0, |graph| graph.edges.len()),
            results = self.results.as_ref().map_or(0, |results| results.len()),
            "Messages merged"
        );
        Ok(())
    }

    fn absorb(&mut self, other: Self) -> Result<(), ReasonerError> {
        merge_part(&mut self.knowledge_graph, other.knowledge_graph)?;
        merge_part(&mut self.results, other.results)?;
        merge_part(&mut self.auxiliary_graphs, other.auxiliary_graphs)?;
        Ok(())
    }

    /// Fold `messages` into one, in order.
    ///
    /// The first message is the base; it is normalized too when `normalize`
    /// is set. No messages yields an empty message.
    pub fn merge_all<I>(messages: I, normalize: bool) -> Result<Self, ReasonerError>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut messages = messages.into_iter();
        let Some(mut merged) = messages.next() else {
            return Ok(Self::new());
        };
        if normalize {
            merged.normalize_in_place()?;
        }
        for message in messages {
            merged.update(&message, normalize)?;
        }
        Ok(merged)
    }
}

fn merge_part<T: Update>(target: &mut Option<T>, incoming: Option<T>) -> Result<(), ReasonerError> {
    let Some(incoming) = incoming else {
        return Ok(());
    };
    match target {
        Some(existing) => existing.update(incoming),
        None => {
            *target = Some(incoming);
            Ok(())
        }
    }
}

impl StableHash for Message {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_tag("Message");
        self.query_graph.stable_hash(hasher);
        self.knowledge_graph.stable_hash(hasher);
        self.results.stable_hash(hasher);
        self.auxiliary_graphs.stable_hash(hasher);
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

// =============================================================================
// ENVELOPES
// =============================================================================

/// Request envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_cache: Option<bool>,
    /// Carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Query {
    /// Parse and validate a query. The message is not normalized.
    pub fn parse(json: &str) -> Result<Self, ReasonerError> {
        let mut query: Self = from_json(json, "query")?;
        query.message = query.message.prepared(ParseOptions { normalize: false }, "message")?;
        Ok(query)
    }
}

/// Response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biolink_version: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Response {
    /// Parse, validate and normalize a response.
    pub fn parse(json: &str) -> Result<Self, ReasonerError> {
        Self::parse_with(json, ParseOptions::default())
    }

    pub fn parse_with(json: &str, options: ParseOptions) -> Result<Self, ReasonerError> {
        let mut response: Self = from_json(json, "response")?;
        response.message = response.message.prepared(options, "message")?;
        Ok(response)
    }

    pub fn to_json(&self) -> Result<String, ReasonerError> {
        serde_json::to_string(self).map_err(|err| ReasonerError::SerializationError(err.to_string()))
    }
}

/// Structural parse. Malformed JSON is a deserialization error; well-formed
/// JSON of the wrong shape is a validation error at the offending field,
/// below `root`.
fn from_json<T: DeserializeOwned>(json: &str, root: &str) -> Result<T, ReasonerError> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let value = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|err| structural_error(root, err))?;
    deserializer
        .end()
        .map_err(|err| ReasonerError::DeserializationError(err.to_string()))?;
    Ok(value)
}

fn structural_error(
    root: &str,
    err: serde_path_to_error::Error<serde_json::Error>,
) -> ReasonerError {
    let mut path = field_path(root, &err.path().to_string());
    let err = err.into_inner();
    if !err.is_data() {
        return ReasonerError::DeserializationError(err.to_string());
    }

    // serde reports a missing field at its parent object.
    let text = err.to_string();
    let position = format!(" at line {} column {}", err.line(), err.column());
    let message = text.strip_suffix(position.as_str()).unwrap_or(&text);
    if let Some(field) = missing_field(message) {
        path.push('.');
        path.push_str(field);
    }
    let message = if err.line() > 0 {
        format!("{message} (line {}, column {})", err.line(), err.column())
    } else {
        message.to_string()
    };
    ReasonerError::Validation {
        violations: vec![Violation::new(path, message)],
    }
}

/// Join a serde field path onto `root`. An empty path renders as `.`.
fn field_path(root: &str, rendered: &str) -> String {
    if rendered == "." {
        root.to_string()
    } else if rendered.starts_with('[') {
        format!("{root}{rendered}")
    } else {
        format!("{root}.{rendered}")
    }
}

fn missing_field(message: &str) -> Option<&str> {
    message.strip_prefix("missing field `")?.strip_suffix('`')
}

// =============================================================================
// TESTS
// =============================================================================
