//! Aurora nowcast service.
//!
//! Runs the pipeline once and exits:
//! - Fetches the trailing window of magnetometer data per station
//! - Computes dB/dt and classifies every configured region
//! - Writes the status document atomically
//! - Prints a per-region summary
//!
//! Scheduling (every 15 minutes) is left to cron or a CI workflow.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

use nowcast::write_snapshot;
use nowcaster::{config, run_once, telemetry, Args};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    telemetry::init_tracing(&args.log_level, args.log_format)?;
    let metrics = telemetry::install_metrics()?;

    info!("Starting aurora nowcast run");
    let started = Instant::now();

    let config = config::resolve(&args).map_err(|e| {
        error!(error = %format!("{:#}", e), "Configuration rejected");
        e
    })?;
    info!(
        stations = config.registry.contributing_stations().len(),
        regions = config.registry.regions.len(),
        window_minutes = config.pipeline.window_minutes,
        "Configuration loaded"
    );

    let snapshot = run_once(&config, Utc::now()).await?;

    write_snapshot(&snapshot, &args.output)
        .with_context(|| format!("Failed to write status document: {}", args.output.display()))?;

    if let Some(path) = &args.metrics_file {
        telemetry::write_metrics_file(&metrics, path)?;
        info!(path = %path.display(), "Metrics written");
    }

    info!(
        run_id = %snapshot.run_id,
        successful = snapshot.successful_stations,
        total = snapshot.total_stations,
        elapsed_ms = started.elapsed().as_millis() as u64,
        output = %args.output.display(),
        "Nowcast run finished"
    );

    if !args.quiet {
        for line in snapshot.summary_lines() {
            println!("{}", line);
        }
    }

    Ok(())
}
