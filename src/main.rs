// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]

//! shiftmanager CLI
//!
//! Command-line interface for managing Redshift

use clap::Parser;
use shiftmanager::cli::{log_filter, Cli, Runner};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Runner::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        config.logging.level.into()
    };

    // Initialize logging; stdout carries SQL and reports
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            std::env::var("RUST_LOG").ok().as_deref(),
            level,
        ))
        .with_writer(std::io::stderr)
        .init();

    let runner = Runner::new(cli, config);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
