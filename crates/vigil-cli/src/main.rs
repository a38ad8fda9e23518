use std::time::Duration;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use vigil_cli::VigilConfig;
use vigil_journal::{Journal, JournalLayer};

mod cli;
mod commands;

/// Upper bound on waiting for queued journal lines at exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = VigilConfig::load(cli.config.as_deref())?;

    let journal = Journal::start(config.journal.clone())?;
    init_tracing(cli.verbose, &journal);

    let result = commands::run_command(cli.command, &config, &journal).await;

    match tokio::time::timeout(DRAIN_TIMEOUT, journal.drain()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "journal drain failed"),
        Err(_) => warn!(pending = journal.pending(), "journal drain timed out"),
    }
    journal.shutdown().await;
    result
}

fn init_tracing(verbose: bool, journal: &Journal) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(JournalLayer::new(journal.clone()))
        .init();
}
