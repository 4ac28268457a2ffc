// Worker instance loop
//
// Sources run once. Transforms and sinks read one message at a time until
// they consume a sentinel, hit an unrecoverable error, or time out under the
// `exit` policy. Sentinels are never passed on from here: downstream
// termination belongs to the lifecycle monitor.

use crate::application::constants::UNKNOWN_PANIC_MESSAGE;
use crate::application::report::InstanceOutcome;
use crate::domain::{Message, Queue, QueueError, TimeoutPolicy};
use crate::port::{Emitter, Processor, Source, WorkerError, WorkerInstance};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Queue wiring and input policy of one instance
#[derive(Debug, Clone)]
pub struct InstanceBinding {
    pub input: Option<Arc<Queue>>,
    pub emitter: Emitter,
    pub timeout: Option<Duration>,
    pub on_timeout: TimeoutPolicy,
}

/// Drive one instance to completion
pub async fn run_instance(worker: WorkerInstance, binding: InstanceBinding) -> InstanceOutcome {
    info!("Worker instance started");
    let outcome = match (worker, binding.input.clone()) {
        (WorkerInstance::Source(source), _) => run_source(source, &binding).await,
        (WorkerInstance::Processor(processor), Some(input)) => {
            run_processor(processor, &input, &binding).await
        }
        (WorkerInstance::Processor(_), None) => InstanceOutcome::Failed {
            reason: "transform/sink started without an input queue".to_string(),
        },
    };
    info!(outcome = ?outcome, "Worker instance stopped");
    outcome
}

async fn run_source(mut source: Box<dyn Source>, binding: &InstanceBinding) -> InstanceOutcome {
    match source.run(&binding.emitter).await {
        Ok(()) => InstanceOutcome::Exhausted,
        Err(e) => {
            error!(error = %e, "Source failed");
            InstanceOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

async fn run_processor(
    mut processor: Box<dyn Processor>,
    input: &Queue,
    binding: &InstanceBinding,
) -> InstanceOutcome {
    let mut processed = 0u64;
    let mut skipped = 0u64;

    loop {
        let message = match input.get(binding.timeout).await {
            Ok(message) => message,
            Err(QueueError::Timeout { timeout, .. }) => match binding.on_timeout {
                TimeoutPolicy::Retry => {
                    debug!(queue = %input.name(), ?timeout, "Input idle, waiting again");
                    continue;
                }
                TimeoutPolicy::Exit => {
                    warn!(queue = %input.name(), ?timeout, "Input idle, instance exiting");
                    return InstanceOutcome::TimedOut { processed, skipped };
                }
            },
            Err(e) => {
                error!(error = %e, "Input queue unusable");
                return InstanceOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let payload = match message {
            Message::Terminate => {
                debug!(queue = %input.name(), "Sentinel received");
                if let Err(e) = processor.finish(&binding.emitter).await {
                    // Sentinel already consumed: the instance still counts as terminated
                    error!(error = %e, "Finish hook failed");
                }
                return InstanceOutcome::Terminated { processed, skipped };
            }
            Message::Data(payload) => payload,
        };

        match processor.process(payload, &binding.emitter).await {
            Ok(()) => processed += 1,
            Err(WorkerError::Processing(reason)) => {
                skipped += 1;
                warn!(reason = %reason, "Message skipped");
            }
            Err(WorkerError::Fatal(reason)) => {
                error!(reason = %reason, "Fatal worker error, instance terminating");
                return InstanceOutcome::Failed { reason };
            }
        }
    }
}

/// Await a finished (or finishing) instance and turn the join result into
/// an outcome. A panic inside the instance is isolated by the task boundary.
pub(crate) async fn collect_outcome(handle: JoinHandle<InstanceOutcome>) -> InstanceOutcome {
    match handle.await {
        Ok(outcome) => outcome,
        Err(join_err) if join_err.is_panic() => {
            let reason = panic_message(join_err.into_panic());
            error!(panic_msg = %reason, "Worker instance panicked");
            InstanceOutcome::Panicked { reason }
        }
        Err(join_err) => InstanceOutcome::Failed {
            reason: format!("instance cancelled: {join_err}"),
        },
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        UNKNOWN_PANIC_MESSAGE.to_string()
    }
}
