//! Test-local workers shared by the integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use pipewright_core::application::{MonitorConfig, WorkerRegistry};
use pipewright_core::domain::Payload;
use pipewright_core::port::{Emitter, Processor, Source, WorkerArgs, WorkerError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_LOCATION: &str = "test";

/// Everything sinks received, across all instances
#[derive(Clone, Default)]
pub struct Collected(Arc<Mutex<Vec<Payload>>>);

impl Collected {
    pub fn values(&self) -> Vec<Payload> {
        self.0.lock().unwrap().clone()
    }

    pub fn sorted_i64(&self) -> Vec<i64> {
        let mut values: Vec<i64> = self
            .values()
            .iter()
            .map(|v| v.as_i64().expect("integer payload"))
            .collect();
        values.sort_unstable();
        values
    }
}

pub struct CollectingSink(Collected);

#[async_trait]
impl Processor for CollectingSink {
    async fn process(&mut self, payload: Payload, _out: &Emitter) -> Result<(), WorkerError> {
        self.0 .0.lock().unwrap().push(payload);
        Ok(())
    }
}

/// Emits `params.count` integers tagged with the instance index
pub struct Counter {
    instance: usize,
    count: u64,
}

#[async_trait]
impl Source for Counter {
    async fn run(&mut self, out: &Emitter) -> Result<(), WorkerError> {
        for i in 0..self.count {
            out.emit(self.instance as u64 * 1_000 + i)?;
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

/// Fails fatally on the first message it sees
pub struct Brittle;

#[async_trait]
impl Processor for Brittle {
    async fn process(&mut self, _payload: Payload, _out: &Emitter) -> Result<(), WorkerError> {
        Err(WorkerError::fatal("downstream store unreachable"))
    }
}

/// Panics on its first message
pub struct Explosive;

#[async_trait]
impl Processor for Explosive {
    async fn process(&mut self, _payload: Payload, _out: &Emitter) -> Result<(), WorkerError> {
        panic!("parser blew up");
    }
}

/// Built-ins plus the test workers; `Collector` feeds `collected`
pub fn registry(collected: &Collected) -> Arc<WorkerRegistry> {
    let mut registry = pipewright_workers::builtin_registry();
    let sink = collected.clone();
    registry
        .register_processor(TEST_LOCATION, "Collector", move |_| {
            Ok(CollectingSink(sink.clone()))
        })
        .register_source(TEST_LOCATION, "Counter", |args: WorkerArgs<'_>| {
            let count = args.param("count").and_then(|c| c.as_u64()).unwrap_or(10);
            Ok(Counter {
                instance: args.instance,
                count,
            })
        })
        .register_processor(TEST_LOCATION, "Brittle", |_| Ok(Brittle))
        .register_processor(TEST_LOCATION, "Explosive", |_| Ok(Explosive));
    Arc::new(registry)
}

pub fn fast_monitor() -> MonitorConfig {
    MonitorConfig::new(Duration::from_millis(1), Duration::from_millis(20))
}
