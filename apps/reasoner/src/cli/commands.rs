//! # CLI Command Implementations
//!
//! File handling lives here; everything else is delegated to
//! `reasoner-core`.

use reasoner_core::{Message, ParseOptions, ReasonerError, StableHash};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum input file size (100 MB).
///
/// This prevents memory exhaustion from accidental large files.
pub const MAX_INPUT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ReasonerError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ReasonerError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ReasonerError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path, which must name an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, ReasonerError> {
    let canonical = path.canonicalize().map_err(|e| {
        ReasonerError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ReasonerError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path. Its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, ReasonerError> {
    // A bare file name has an empty parent.
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        ReasonerError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(ReasonerError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| ReasonerError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// INPUT / OUTPUT
// =============================================================================

/// Read a message from `path`.
///
/// The file may hold a bare message or an envelope whose `message` member
/// is the message.
pub fn load_message(path: &Path, options: ParseOptions) -> Result<Message, ReasonerError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_INPUT_FILE_SIZE)?;

    let content = std::fs::read_to_string(&path).map_err(|e| {
        ReasonerError::IoError(format!("Cannot read '{}': {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        ReasonerError::DeserializationError(format!("{}: {}", path.display(), e))
    })?;

    Message::from_value(unwrap_envelope(value), options)
}

/// Take the `message` member out of a query or response envelope.
fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut object) if object.contains_key("message") => {
            object.remove("message").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn render(message: &Message, pretty: bool) -> Result<String, ReasonerError> {
    if pretty {
        message.to_json_pretty()
    } else {
        message.to_json()
    }
}

/// Write `text` to `output`, or to stdout when there is none.
fn emit(text: &str, output: Option<&Path>) -> Result<(), ReasonerError> {
    match output {
        Some(path) => {
            let path = validate_output_path(path)?;
            std::fs::write(&path, text).map_err(|e| {
                ReasonerError::IoError(format!("Cannot write '{}': {}", path.display(), e))
            })?;
            info!("Wrote {}", path.display());
            Ok(())
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Parse and validate a message.
///
/// With `json_mode`, violations are also printed as a JSON report.
pub fn cmd_validate(file: &Path, normalize: bool, json_mode: bool) -> Result<(), ReasonerError> {
    let message = match load_message(file, ParseOptions { normalize }) {
        Ok(message) => message,
        Err(err) => {
            if json_mode {
                let violations = match &err {
                    ReasonerError::Validation { violations } => serde_json::to_value(violations)
                        .map_err(|e| ReasonerError::SerializationError(e.to_string()))?,
                    other => serde_json::json!([{ "path": "", "message": other.to_string() }]),
                };
                let output = serde_json::json!({
                    "file": file.to_string_lossy(),
                    "valid": false,
                    "violations": violations
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).unwrap_or_default()
                );
            }
            return Err(err);
        }
    };

    let nodes = message
        .knowledge_graph
        .as_ref()
        .map_or(0, |graph| graph.nodes.len());
    let edges = message
        .knowledge_graph
        .as_ref()
        .map_or(0, |graph| graph.edges.len());
    let results = message.results.as_ref().map_or(0, |results| results.len());

    if json_mode {
        let output = serde_json::json!({
            "file": file.to_string_lossy(),
            "valid": true,
            "nodes": nodes,
            "edges": edges,
            "results": results
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("{}: valid", file.display());
        println!("  Nodes:   {}", nodes);
        println!("  Edges:   {}", edges);
        println!("  Results: {}", results);
    }
    Ok(())
}

// =============================================================================
// NORMALIZE COMMAND
// =============================================================================

/// Re-key a message's edges by content and write it out.
pub fn cmd_normalize(file: &Path, output: Option<&Path>, pretty: bool) -> Result<(), ReasonerError> {
    let message = load_message(file, ParseOptions { normalize: true })?;
    emit(&render(&message, pretty)?, output)
}

// =============================================================================
// MERGE COMMAND
// =============================================================================

/// Merge the messages in `files`, in order, and write the result.
pub fn cmd_merge(
    files: &[PathBuf],
    output: Option<&Path>,
    normalize: bool,
    pretty: bool,
) -> Result<(), ReasonerError> {
    let messages = files
        .iter()
        .map(|file| load_message(file, ParseOptions { normalize }))
        .collect::<Result<Vec<_>, _>>()?;

    let merged = Message::merge_all(messages, normalize)?;
    info!(
        inputs = files.len(),
        edges = merged
            .knowledge_graph
            .as_ref()
            .map_or(0, |graph| graph.edges.len()),
        results = merged.results.as_ref().map_or(0, |results| results.len()),
        "Merged messages"
    );
    emit(&render(&merged, pretty)?, output)
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the message, query-graph and knowledge-graph digests.
pub fn cmd_hash(file: &Path, normalize: bool, json_mode: bool) -> Result<(), ReasonerError> {
    let message = load_message(file, ParseOptions { normalize })?;

    let message_digest = message.stable_digest().to_hex();
    let query_graph_digest = message.query_graph_digest().to_hex();
    let knowledge_graph_digest = message
        .knowledge_graph
        .as_ref()
        .map(|graph| graph.stable_digest().to_hex());

    if json_mode {
        let output = serde_json::json!({
            "algorithm": "blake3",
            "message": message_digest,
            "query_graph": query_graph_digest,
            "knowledge_graph": knowledge_graph_digest
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Message:         {}", message_digest);
        println!("Query graph:     {}", query_graph_digest);
        println!(
            "Knowledge graph: {}",
            knowledge_graph_digest.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_message_is_unwrapped() {
        let value = serde_json::json!({ "message": { "results": [] }, "status": "Success" });
        assert_eq!(unwrap_envelope(value), serde_json::json!({ "results": [] }));
    }

    #[test]
    fn bare_message_is_kept() {
        let value = serde_json::json!({ "results": [] });
        assert_eq!(unwrap_envelope(value.clone()), value);
    }

    #[test]
    fn bare_output_name_resolves_to_current_directory() {
        let resolved = validate_output_path(Path::new("out.json")).expect("resolve");
        assert_eq!(resolved.file_name().and_then(|name| name.to_str()), Some("out.json"));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.json");
        std::fs::write(&path, "{}").expect("write");
        let err = validate_file_size(&path, 1).expect_err("too large");
        assert!(matches!(err, ReasonerError::IoError(_)));
    }

    #[test]
    fn directory_is_not_an_input_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(validate_file_path(dir.path()).is_err());
    }
}
