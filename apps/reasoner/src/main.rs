//! # reasoner
//!
//! Command-line tool for reasoner messages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          apps/reasoner (THE BINARY)         │
//! │                                             │
//! │  ┌─────────────┐        ┌───────────────┐   │
//! │  │    CLI      │        │    Config     │   │
//! │  │   (clap)    │        │    (toml)     │   │
//! │  └──────┬──────┘        └───────┬───────┘   │
//! │         └───────────┬───────────┘           │
//! │                     ▼                       │
//! │             ┌───────────────┐               │
//! │             │ reasoner-core │               │
//! │             │  (THE LOGIC)  │               │
//! │             └───────────────┘               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! reasoner validate response.json
//! reasoner normalize response.json -o normalized.json
//! reasoner merge ara1.json ara2.json -o merged.json
//! reasoner hash merged.json
//! ```

use clap::Parser;
use reasoner::cli;
use reasoner::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    init_tracing(&config, cli.verbose);

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing. `REASONER_LOG_FORMAT=json` enables machine-parseable
/// output; `RUST_LOG` overrides the configured filter.
fn init_tracing(config: &Config, verbose: bool) {
    let log_format = std::env::var("REASONER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let fallback = if verbose {
        "reasoner=debug,reasoner_core=debug".to_string()
    } else {
        config
            .log_filter
            .clone()
            .unwrap_or_else(|| "reasoner=info,reasoner_core=info".to_string())
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
