//! docstore connectivity probe
//!
//! Usage:
//!   docstore-probe --db /var/lib/docstore/store.db --config docstore.json
//!
//! Exits non-zero when the health sentinel cannot be read.

use anyhow::Result;
use clap::Parser;
use docstore_probe::{ProbeOptions, run};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "docstore-probe")]
#[command(about = "Checks that a docstore backing store is reachable and healthy")]
struct Args {
    /// SQLite database file (in-memory store if omitted)
    #[arg(long)]
    db: Option<PathBuf>,

    /// JSON config file (DOCSTORE_* environment variables if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let report = run(ProbeOptions {
        db: args.db,
        config: args.config,
    })
    .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("backend: {}", report.backend);
        for table in &report.tables {
            println!("table:   {table}");
        }
        println!("healthy: {}", report.healthy);
    }

    if report.healthy {
        info!("store is healthy");
        Ok(ExitCode::SUCCESS)
    } else {
        error!("store is unhealthy");
        Ok(ExitCode::FAILURE)
    }
}
