//! Pipewright - Main Entry Point
//! Loads a pipeline document, runs it to completion, reports

mod logging;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use pipewright_core::application::Orchestrator;
use pipewright_core::domain::PipelineSpec;
use pipewright_core::AppError;
use pipewright_workers::builtin_registry;
use settings::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status for a document that could not be built
const EXIT_CONFIG: u8 = 2;
/// Exit status for any other failure
const EXIT_FAILURE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Environment: `.env` first so clap's env fallbacks see it
    let _ = dotenvy::dotenv();
    let settings = Settings::parse();

    // 2. Logging
    let log_dir = settings.log_dir();
    let _log_guard = match logging::init_logging(settings.log_format, log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("pipewright: {e:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    info!("Pipewright v{} starting...", VERSION);

    // 3. Run
    match run(&settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Pipeline failed");
            eprintln!("pipewright: {e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(settings: &Settings) -> Result<()> {
    let path = settings.pipeline_path();
    info!(pipeline = %path.display(), "Loading pipeline");

    let spec = PipelineSpec::load(&path)
        .map_err(AppError::from)
        .with_context(|| format!("Pipeline {} rejected", path.display()))?;

    // Worker implementations are resolved by name from this registry
    let registry = Arc::new(builtin_registry());
    let mut orchestrator =
        Orchestrator::new(spec, registry).with_monitor_config(settings.monitor_config());

    if settings.check {
        let plan = orchestrator
            .plan()
            .with_context(|| format!("Pipeline {} rejected", path.display()))?;
        info!(
            pools = ?plan.pool_names(),
            instances = plan.instance_total(),
            "Pipeline is valid"
        );
        return Ok(());
    }

    let started = Instant::now();
    let report = orchestrator
        .run()
        .await
        .with_context(|| format!("Pipeline {} failed", path.display()))?;

    info!(
        run_id = %report.run_id,
        elapsed_secs = %format!("{:.1}", started.elapsed().as_secs_f64()),
        "Total time taken for running the pipeline"
    );
    for pool in &report.pools {
        let processed: u64 = pool.outcomes.iter().map(|o| o.processed()).sum();
        info!(
            pool = %pool.name,
            instances = pool.instances(),
            processed,
            failures = pool.failures(),
            "Pool summary"
        );
    }
    if report.failures() > 0 {
        warn!(failures = report.failures(), "Some worker instances ended abnormally");
    }

    if settings.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AppError>() {
        Some(app) if app.is_config() => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}
