//! Mr. Clean - scheduled retention sweeps over configured directories.

use clap::Parser;
use mrclean_cli::{check, logging, Cli, Config};
use mrclean_engine::{SweepStatus, SweepWorker, Sweeper};
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> mrclean_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load or create config; invalid rules abort before anything is touched
    let config = Config::load_or_create(&cli.config)?;
    let rules = config.retention_rules()?;

    if cli.check {
        println!("{}", check::render_rules(&rules));
        return Ok(());
    }

    let base = cli
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let _log_guard = logging::init(&config.log, &config.log_directory(base))?;

    let mut engine = config.engine_config();
    if cli.dry_run {
        engine.dry_run = true;
    }
    if let Some(secs) = cli.budget {
        engine = engine.with_time_budget(Duration::from_secs(secs));
    }

    let mut sweeper = Sweeper::new(engine);
    if let Some(retention) = config.log_retention(base) {
        sweeper = sweeper.with_log_retention(retention);
    }
    let worker = SweepWorker::new(sweeper);

    match cli.every {
        Some(minutes) => {
            worker
                .run_every(&rules, Duration::from_secs(minutes * 60), cli.cycles)
                .await?;
        }
        None => {
            let report = worker.run_once(&rules).await?;
            match report.status {
                SweepStatus::Completed => tracing::info!("Cleanup finished"),
                SweepStatus::Cancelled => tracing::warn!("Cleanup stopped before finishing"),
            }
            tracing::info!("{}", report.metrics.summary());
        }
    }

    Ok(())
}
