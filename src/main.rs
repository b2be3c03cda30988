//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `link_verdict` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use link_verdict::initialization::init_logger_with;
use link_verdict::{run_scan, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists). Provider API
    // keys and the audit key are env-only, so this is where they come from
    // in development setups.
    let _ = dotenvy::dotenv();

    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    // Run the scan using the library
    match run_scan(config).await {
        Ok(report) => {
            println!(
                "Scanned {} URL{} in {:.1}s: {} safe, {} dangerous, {} indeterminate, {} not analyzed",
                report.total_urls,
                if report.total_urls == 1 { "" } else { "s" },
                report.elapsed_seconds,
                report.safe,
                report.dangerous,
                report.indeterminate,
                report.rejected
            );
            println!("Audit history saved in {}", report.db_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("link_verdict error: {:#}", e);
            process::exit(1);
        }
    }
}
