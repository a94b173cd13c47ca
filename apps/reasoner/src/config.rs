//! # Configuration
//!
//! Optional TOML file read at startup. Every field has a default, so an
//! empty file and no file at all behave the same.
//!
//! ```toml
//! normalize = true
//! pretty = false
//! log_filter = "reasoner=debug,reasoner_core=debug"
//! ```

use reasoner_core::ReasonerError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "reasoner.toml";

/// Settings shared by every command. Command-line flags win over these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Re-key knowledge-graph edges by content when reading messages.
    pub normalize: bool,
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            normalize: true,
            pretty: false,
            log_filter: None,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`]
    /// in the working directory is used if present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ReasonerError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ReasonerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReasonerError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ReasonerError> {
        toml::from_str(content)
            .map_err(|e| ReasonerError::DeserializationError(format!("Invalid config: {e}")))
    }
}
