// Application Layer - Topology building and lifecycle management

pub mod constants;
pub mod monitor;
pub mod orchestrator;
pub mod pool;
pub mod queues;
pub mod registry;
pub mod report;

// Re-exports
pub use monitor::{LifecycleMonitor, MonitorConfig, MonitorSummary};
pub use orchestrator::Orchestrator;
pub use pool::{PoolBuilder, PoolPlan, RunningPool};
pub use queues::QueueRegistry;
pub use registry::{ImplementationKey, WorkerFactory, WorkerRegistry};
pub use report::{InstanceOutcome, PipelineReport, PoolReport};
