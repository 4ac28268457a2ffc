// LogSink - logs each payload, emits nothing

use crate::params;
use async_trait::async_trait;
use pipewright_core::domain::Payload;
use pipewright_core::port::{Emitter, Processor, WorkerArgs, WorkerError};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LogSinkParams {
    label: Option<String>,
}

pub struct LogSink {
    label: String,
    received: u64,
}

impl LogSink {
    pub fn from_args(args: WorkerArgs<'_>) -> Result<Self, WorkerError> {
        let params: LogSinkParams = params::decode(&args)?;
        Ok(Self {
            label: params.label.unwrap_or_else(|| args.pool.to_string()),
            received: 0,
        })
    }
}

#[async_trait]
impl Processor for LogSink {
    async fn process(&mut self, payload: Payload, _out: &Emitter) -> Result<(), WorkerError> {
        self.received += 1;
        info!(label = %self.label, payload = %payload, "Payload received");
        Ok(())
    }

    async fn finish(&mut self, _out: &Emitter) -> Result<(), WorkerError> {
        info!(label = %self.label, received = self.received, "Sink drained");
        Ok(())
    }
}
