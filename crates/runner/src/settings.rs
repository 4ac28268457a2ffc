//! Runtime settings: command line first, environment (and `.env`) as fallback

use clap::{Parser, ValueEnum};
use pipewright_core::application::constants::{
    DEFAULT_MAX_POLL_INTERVAL, DEFAULT_MIN_POLL_INTERVAL,
};
use pipewright_core::application::MonitorConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, multi-line
    Pretty,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "pipewright")]
#[command(about = "Run a declarative queue/worker pipeline", long_about = None)]
#[command(version)]
pub struct Settings {
    /// Pipeline document (YAML)
    #[arg(short, long, env = "PIPELINE_LOCATION")]
    pub pipeline: String,

    /// Console log format
    #[arg(long, env = "PIPEWRIGHT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Directory for daily-rolling log files (console only when unset)
    #[arg(long, env = "PIPEWRIGHT_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Shortest pause between monitor scans, in milliseconds
    #[arg(long, env = "PIPEWRIGHT_MONITOR_MIN_POLL_MS",
          default_value_t = DEFAULT_MIN_POLL_INTERVAL.as_millis() as u64)]
    pub min_poll_ms: u64,

    /// Longest pause between monitor scans, in milliseconds
    #[arg(long, env = "PIPEWRIGHT_MONITOR_MAX_POLL_MS",
          default_value_t = DEFAULT_MAX_POLL_INTERVAL.as_millis() as u64)]
    pub max_poll_ms: u64,

    /// Validate the document and build every worker, then exit without running
    #[arg(long)]
    pub check: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub report_json: bool,
}

impl Settings {
    /// Pipeline path with `~` and `$VARS` expanded
    pub fn pipeline_path(&self) -> PathBuf {
        expand(&self.pipeline)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir.as_deref().map(expand)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig::new(
            Duration::from_millis(self.min_poll_ms),
            Duration::from_millis(self.max_poll_ms),
        )
    }
}

fn expand(raw: &str) -> PathBuf {
    let expanded = shellexpand::full(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(raw).into_owned());
    PathBuf::from(expanded)
}
