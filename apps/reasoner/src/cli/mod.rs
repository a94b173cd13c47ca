//! # Reasoner CLI Module
//!
//! ## Available Commands
//!
//! - `validate` - Parse and validate a message, report every violation
//! - `normalize` - Re-key knowledge-graph edges by content and emit JSON
//! - `merge` - Merge several messages into one
//! - `hash` - Print the message, query-graph and knowledge-graph digests

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use reasoner_core::ReasonerError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Reasoner - message toolkit
///
/// Validates, normalizes, fingerprints and merges reasoner messages.
/// Input files hold a bare message or a query/response envelope.
#[derive(Parser, Debug)]
#[command(name = "reasoner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML configuration file (default: ./reasoner.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output (overrides the config file)
    #[arg(long, global = true, overrides_with = "no_pretty")]
    pub pretty: bool,

    /// Compact JSON output (overrides the config file)
    #[arg(long, global = true, overrides_with = "pretty")]
    pub no_pretty: bool,

    /// Re-key edges by content when reading (overrides the config file)
    #[arg(long, global = true, overrides_with = "no_normalize")]
    pub normalize: bool,

    /// Keep the edge keys producers gave (overrides the config file)
    #[arg(long, global = true, overrides_with = "normalize")]
    pub no_normalize: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and validate a message
    Validate {
        /// Input file
        file: PathBuf,
    },

    /// Re-key knowledge-graph edges by content
    Normalize {
        /// Input file
        file: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge messages in the order given
    Merge {
        /// Input files
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print message digests
    Hash {
        /// Input file
        file: PathBuf,
    },
}

impl Cli {
    /// Whether to normalize: a flag wins over the config file.
    pub fn normalize(&self, config: &Config) -> bool {
        resolve_flag(self.normalize, self.no_normalize, config.normalize)
    }

    /// Whether to pretty-print: a flag wins over the config file.
    pub fn pretty(&self, config: &Config) -> bool {
        resolve_flag(self.pretty, self.no_pretty, config.pretty)
    }
}

fn resolve_flag(on: bool, off: bool, configured: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        configured
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, config: &Config) -> Result<(), ReasonerError> {
    let json_mode = cli.json_mode;
    let normalize = cli.normalize(config);
    let pretty = cli.pretty(config);

    match cli.command {
        Commands::Validate { file } => cmd_validate(&file, normalize, json_mode),
        Commands::Normalize { file, output } => cmd_normalize(&file, output.as_deref(), pretty),
        Commands::Merge { files, output } => cmd_merge(&files, output.as_deref(), normalize, pretty),
        Commands::Hash { file } => cmd_hash(&file, normalize, json_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_requires_a_file() {
        let parsed = Cli::try_parse_from(["reasoner", "merge"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn merge_collects_files_and_flags() {
        let cli = Cli::try_parse_from([
            "reasoner",
            "--pretty",
            "merge",
            "a.json",
            "b.json",
            "-o",
            "out.json",
            "--no-normalize",
        ])
        .expect("parse");
        assert!(cli.pretty);
        assert!(cli.no_normalize);
        assert!(matches!(
            cli.command,
            Commands::Merge { ref files, .. } if files.len() == 2
        ));
    }

    #[test]
    fn flags_override_config_both_ways() {
        let config = Config {
            normalize: false,
            pretty: true,
            log_filter: None,
        };
        let cli = Cli::try_parse_from(["reasoner", "--no-pretty", "--normalize", "hash", "m.json"])
            .expect("parse");
        assert!(!cli.pretty(&config));
        assert!(cli.normalize(&config));

        let defaults = Config::default();
        let cli = Cli::try_parse_from(["reasoner", "validate", "m.json", "--no-normalize"])
            .expect("parse");
        assert!(!cli.normalize(&defaults));
        assert!(!cli.pretty(&defaults));
    }

    #[test]
    fn config_applies_without_flags() {
        let config = Config {
            normalize: false,
            pretty: true,
            log_filter: None,
        };
        let cli = Cli::try_parse_from(["reasoner", "hash", "m.json"]).expect("parse");
        assert!(cli.pretty(&config));
        assert!(!cli.normalize(&config));
    }

    #[test]
    fn last_of_a_flag_pair_wins() {
        let cli = Cli::try_parse_from(["reasoner", "--pretty", "--no-pretty", "hash", "m.json"])
            .expect("parse");
        assert!(!cli.pretty(&Config::default()));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["reasoner", "hash", "m.json", "--json-mode"])
            .expect("parse");
        assert!(cli.json_mode);
    }
}
