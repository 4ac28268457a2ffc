// Orchestrator Root - build, launch, monitor, report

use super::monitor::{LifecycleMonitor, MonitorConfig, MonitorSummary};
use super::pool::{PoolBuilder, PoolPlan};
use super::queues::QueueRegistry;
use super::registry::WorkerRegistry;
use super::report::PipelineReport;
use crate::domain::PipelineSpec;
use crate::error::{AppError, Result};
use crate::port::providers::{SystemTimeProvider, UuidProvider};
use crate::port::{IdProvider, TimeProvider};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::info;

enum State {
    Idle,
    Running {
        run_id: String,
        started_at: i64,
        queues: QueueRegistry,
        monitor: JoinHandle<MonitorSummary>,
    },
    Finished {
        run_id: String,
        queues: QueueRegistry,
    },
}

/// Runs one pipeline: `start` builds and launches everything, `join` waits
/// for the monitor to retire the last pool. The topology is fixed once
/// started.
pub struct Orchestrator {
    spec: PipelineSpec,
    registry: Arc<WorkerRegistry>,
    monitor_config: MonitorConfig,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    state: State,
}

impl Orchestrator {
    pub fn new(spec: PipelineSpec, registry: Arc<WorkerRegistry>) -> Self {
        Self {
            spec,
            registry,
            monitor_config: MonitorConfig::default(),
            time_provider: Arc::new(SystemTimeProvider),
            id_provider: Arc::new(UuidProvider),
            state: State::Idle,
        }
    }

    pub fn with_monitor_config(mut self, config: MonitorConfig) -> Self {
        self.monitor_config = config;
        self
    }

    /// Swap clock and run-id source (deterministic tests)
    pub fn with_providers(
        mut self,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        self.time_provider = time_provider;
        self.id_provider = id_provider;
        self
    }

    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    /// Resolve and construct everything without running it
    pub fn plan(&self) -> Result<PoolPlan> {
        Ok(PoolBuilder::new(&self.registry).plan(&self.spec)?)
    }

    /// Build queues and pools, start every instance and the monitor.
    ///
    /// Must be called from inside a Tokio runtime. On a `ConfigError`
    /// nothing has been started.
    pub fn start(&mut self) -> Result<()> {
        if !matches!(self.state, State::Idle) {
            return Err(AppError::InvalidState(
                "pipeline already started".to_string(),
            ));
        }
        let runtime = Handle::try_current()
            .map_err(|e| AppError::InvalidState(format!("no Tokio runtime: {e}")))?;

        let plan = self.plan()?;
        let queues = QueueRegistry::build(&self.spec, plan.consumer_counts());
        let run_id = self.id_provider.generate_id();
        let started_at = self.time_provider.now_millis();

        info!(
            run_id = %run_id,
            queues = queues.len(),
            pools = plan.pool_names().len(),
            instances = plan.instance_total(),
            "Starting pipeline"
        );

        let pools = plan.launch(&queues, &runtime, &run_id)?;
        let monitor = LifecycleMonitor::new(
            run_id.clone(),
            pools,
            queues.clone(),
            self.monitor_config,
            Arc::clone(&self.time_provider),
        );
        let monitor = runtime.spawn(monitor.run());

        self.state = State::Running {
            run_id,
            started_at,
            queues,
            monitor,
        };
        Ok(())
    }

    /// Wait until every pool is retired
    pub async fn join(&mut self) -> Result<PipelineReport> {
        let (run_id, started_at, queues, monitor) =
            match std::mem::replace(&mut self.state, State::Idle) {
                State::Running {
                    run_id,
                    started_at,
                    queues,
                    monitor,
                } => (run_id, started_at, queues, monitor),
                other => {
                    self.state = other;
                    return Err(AppError::InvalidState(
                        "pipeline is not running".to_string(),
                    ));
                }
            };

        let summary = match monitor.await {
            Ok(summary) => summary,
            Err(e) => {
                self.state = State::Finished { run_id, queues };
                return Err(AppError::Internal(format!("lifecycle monitor failed: {e}")));
            }
        };

        let report = PipelineReport {
            run_id: run_id.clone(),
            started_at,
            finished_at: self.time_provider.now_millis(),
            pools: summary.pools,
            sentinels: summary.sentinels,
        };
        info!(
            run_id = %run_id,
            elapsed_ms = report.elapsed_ms(),
            failures = report.failures(),
            "Pipeline finished"
        );

        self.state = State::Finished { run_id, queues };
        Ok(report)
    }

    /// `start` then `join`
    pub async fn run(&mut self) -> Result<PipelineReport> {
        self.start()?;
        self.join().await
    }

    /// Queues of the current or last run
    pub fn queues(&self) -> Option<&QueueRegistry> {
        match &self.state {
            State::Running { queues, .. } | State::Finished { queues, .. } => Some(queues),
            State::Idle => None,
        }
    }

    pub fn run_id(&self) -> Option<&str> {
        match &self.state {
            State::Running { run_id, .. } | State::Finished { run_id, .. } => Some(run_id),
            State::Idle => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }
}
