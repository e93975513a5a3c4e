//! Operator CLI for the general ledger.
//!
//! Connects with the same configuration as the services
//! (`BUKUBESAR__DATABASE__URL` or `DATABASE_URL`) and runs one command.

use anyhow::Context;
use bukubesar_db::LedgerEngine;
use bukubesar_shared::AppConfig;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    init_tracing(cli.json_logs);

    let config = AppConfig::load().context("Failed to load configuration")?;
    let engine = LedgerEngine::connect(&config)
        .await
        .context("Failed to connect to database")?;

    commands::run(&engine, cli.command, cli.format).await
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "bukubesar=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output stays parseable
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
