// Worker Pool Builder
//
// Two steps:
// - `PoolBuilder::plan` resolves implementations, accumulates consumer counts
//   and constructs every instance. Nothing runs yet, so a bad document fails
//   here with no side effects.
// - `PoolPlan::launch` binds instances to queues and spawns them all.
//   The orchestrator calls both back to back; callers never see a built but
//   idle pool.

mod instance;

pub use instance::{run_instance, InstanceBinding};
pub(crate) use instance::collect_outcome;

use super::queues::QueueRegistry;
use super::registry::WorkerRegistry;
use super::report::InstanceOutcome;
use crate::domain::{ConfigError, PipelineSpec, WorkerSpec};
use crate::port::{Emitter, WorkerArgs, WorkerInstance, WorkerKind};
use std::collections::HashMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

pub struct PoolBuilder<'a> {
    registry: &'a WorkerRegistry,
}

/// Constructed but not yet running pools
#[derive(Debug)]
pub struct PoolPlan {
    pools: Vec<PlannedPool>,
    consumer_counts: HashMap<String, usize>,
}

#[derive(Debug)]
struct PlannedPool {
    spec: WorkerSpec,
    instances: Vec<WorkerInstance>,
}

impl<'a> PoolBuilder<'a> {
    pub fn new(registry: &'a WorkerRegistry) -> Self {
        Self { registry }
    }

    pub fn plan(&self, spec: &PipelineSpec) -> Result<PoolPlan, ConfigError> {
        spec.validate()?;

        let mut consumer_counts: HashMap<String, usize> = spec
            .queue_names()
            .map(|name| (name.to_string(), 0))
            .collect();
        let mut pools = Vec::with_capacity(spec.workers.len());

        for worker in &spec.workers {
            let factory = self
                .registry
                .resolve(&worker.location, &worker.class)
                .ok_or_else(|| ConfigError::UnknownImplementation {
                    worker: worker.name.clone(),
                    location: worker.location.clone(),
                    class: worker.class.clone(),
                })?;

            if let Some(input) = &worker.input_queue {
                *consumer_counts.entry(input.clone()).or_insert(0) += worker.instances;
            }

            let input_values = worker.input_values.as_deref().unwrap_or(&[]);
            let mut instances = Vec::with_capacity(worker.instances);
            for index in 0..worker.instances {
                let args = WorkerArgs {
                    pool: &worker.name,
                    instance: index,
                    input_values,
                    params: &worker.params,
                };
                let instance = factory(args).map_err(|e| ConfigError::InvalidParams {
                    worker: worker.name.clone(),
                    reason: e.to_string(),
                })?;
                check_variant(worker, instance.kind())?;
                instances.push(instance);
            }

            pools.push(PlannedPool {
                spec: worker.clone(),
                instances,
            });
        }

        Ok(PoolPlan {
            pools,
            consumer_counts,
        })
    }
}

fn check_variant(worker: &WorkerSpec, kind: WorkerKind) -> Result<(), ConfigError> {
    let reason = match (kind, &worker.input_queue) {
        (WorkerKind::Source, Some(input)) => format!(
            "{}.{} is a source and cannot read input_queue {}",
            worker.location, worker.class, input
        ),
        (WorkerKind::Processor, None) => format!(
            "{}.{} is a transform/sink and needs an input_queue",
            worker.location, worker.class
        ),
        _ => return Ok(()),
    };
    Err(ConfigError::VariantMismatch {
        worker: worker.name.clone(),
        reason,
    })
}

impl PoolPlan {
    /// Instances per queue reader, every declared queue present
    pub fn consumer_counts(&self) -> &HashMap<String, usize> {
        &self.consumer_counts
    }

    pub fn consumer_count(&self, queue: &str) -> usize {
        self.consumer_counts.get(queue).copied().unwrap_or(0)
    }

    pub fn pool_names(&self) -> Vec<&str> {
        self.pools.iter().map(|p| p.spec.name.as_str()).collect()
    }

    pub fn instance_total(&self) -> usize {
        self.pools.iter().map(|p| p.instances.len()).sum()
    }

    /// Bind every instance to its queues and start it on `runtime`
    pub fn launch(
        self,
        queues: &QueueRegistry,
        runtime: &Handle,
        run_id: &str,
    ) -> Result<Vec<RunningPool>, ConfigError> {
        // Resolve every handle first so a missing queue aborts before any spawn
        let mut bound = Vec::with_capacity(self.pools.len());
        for pool in self.pools {
            let name = &pool.spec.name;
            let input = pool
                .spec
                .input_queue
                .as_deref()
                .map(|q| queues.resolve(name, q))
                .transpose()?;
            let outputs = pool.spec.distinct_outputs();
            let output_handles = outputs
                .iter()
                .map(|q| queues.resolve(name, q))
                .collect::<Result<Vec<_>, _>>()?;
            bound.push((pool, input, outputs, Emitter::new(output_handles)));
        }

        let mut running = Vec::with_capacity(bound.len());
        for (pool, input, outputs, emitter) in bound {
            let name = pool.spec.name.clone();
            let handles = pool
                .instances
                .into_iter()
                .enumerate()
                .map(|(index, worker)| {
                    let binding = InstanceBinding {
                        input: input.clone(),
                        emitter: emitter.clone(),
                        timeout: pool.spec.input_timeout(),
                        on_timeout: pool.spec.on_timeout,
                    };
                    let span = tracing::info_span!(
                        "worker",
                        run_id = %run_id,
                        pool = %name,
                        instance = index
                    );
                    runtime.spawn(run_instance(worker, binding).instrument(span))
                })
                .collect();

            info!(
                run_id = %run_id,
                pool = %name,
                instances = pool.spec.instances,
                input = ?pool.spec.input_queue,
                outputs = ?outputs,
                "Worker pool launched"
            );
            running.push(RunningPool::new(name, outputs, handles));
        }
        Ok(running)
    }
}

/// A launched pool as tracked by the monitor
#[derive(Debug)]
pub struct RunningPool {
    name: String,
    output_queues: Vec<String>,
    handles: Vec<JoinHandle<InstanceOutcome>>,
}

impl RunningPool {
    pub fn new(
        name: impl Into<String>,
        output_queues: Vec<String>,
        handles: Vec<JoinHandle<InstanceOutcome>>,
    ) -> Self {
        let mut distinct = Vec::with_capacity(output_queues.len());
        for queue in output_queues {
            if !distinct.contains(&queue) {
                distinct.push(queue);
            }
        }
        Self {
            name: name.into(),
            output_queues: distinct,
            handles,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_queues(&self) -> &[String] {
        &self.output_queues
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Instances not yet finished
    pub fn alive(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub(crate) fn into_handles(self) -> Vec<JoinHandle<InstanceOutcome>> {
        self.handles
    }
}
