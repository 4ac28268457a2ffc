// ValueSource - emits the static `input_values` seed list

use crate::params;
use async_trait::async_trait;
use pipewright_core::domain::Payload;
use pipewright_core::port::{Emitter, Source, WorkerArgs, WorkerError};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ValueSourceParams {
    /// Times the whole sequence is emitted
    repeat: usize,
}

impl Default for ValueSourceParams {
    fn default() -> Self {
        Self { repeat: 1 }
    }
}

pub struct ValueSource {
    values: Vec<Payload>,
    repeat: usize,
}

impl ValueSource {
    pub fn new(values: Vec<Payload>) -> Self {
        Self { values, repeat: 1 }
    }

    pub fn from_args(args: WorkerArgs<'_>) -> Result<Self, WorkerError> {
        let params: ValueSourceParams = params::decode(&args)?;
        Ok(Self {
            values: args.input_values.to_vec(),
            repeat: params.repeat,
        })
    }
}

#[async_trait]
impl Source for ValueSource {
    async fn run(&mut self, out: &Emitter) -> Result<(), WorkerError> {
        for _ in 0..self.repeat {
            for value in &self.values {
                out.emit(value.clone())?;
            }
        }
        info!(
            emitted = self.values.len() * self.repeat,
            outputs = ?out.queue_names(),
            "Seed values emitted"
        );
        Ok(())
    }
}
