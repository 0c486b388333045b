//! # Kinship - Family Relationship Graph
//!
//! The command-line binary over `kinship-core`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            apps/kinship (THE BINARY)         │
//! │                                              │
//! │   ┌─────────────┐      ┌─────────────────┐   │
//! │   │    CLI      │      │  Config (TOML)  │   │
//! │   │   (clap)    │      │                 │   │
//! │   └──────┬──────┘      └────────┬────────┘   │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │              ┌───────────────┐               │
//! │              │ kinship-core  │               │
//! │              │  (THE LOGIC)  │               │
//! │              └───────────────┘               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! kinship profile add ann --gender female --born 1950-04-02
//! kinship profile add bob --gender male
//! kinship link bob son ann
//! kinship link ann mother cid --scenario siblings
//! kinship tree ann
//! kinship transplant ann ann-dup --mode replace
//! ```

use clap::Parser;
use kinship::cli;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    if !cli.quiet && !cli.json && cli.command.is_none() {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the subscriber. `KINSHIP_LOG` wins over `RUST_LOG`;
/// `KINSHIP_LOG_FORMAT=json` enables machine-parseable output.
fn init_tracing(verbose: bool) {
    let log_format = std::env::var("KINSHIP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if verbose {
        "kinship=debug,kinship_core=debug"
    } else {
        "kinship=info,kinship_core=info"
    };
    let filter = EnvFilter::try_from_env("KINSHIP_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| default_filter.into());

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

/// Print the Kinship startup banner.
fn print_banner() {
    println!(
        r#"
  ┬┌─┬┌┐┌┌─┐┬ ┬┬┌─┐
  ├┴┐││││└─┐├─┤│├─┘
  ┴ ┴┴┘└┘└─┘┴ ┴┴┴

  Family Relationship Graph v{}

  Reciprocal • Validated • Atomic
"#,
        env!("CARGO_PKG_VERSION")
    );
}
