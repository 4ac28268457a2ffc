// JsonLinesSink - appends each payload as one JSON line
//
// The file is opened on the first payload: failing to open it is fatal for
// the instance, a failed write only loses that payload.

use crate::params;
use async_trait::async_trait;
use pipewright_core::domain::Payload;
use pipewright_core::port::{Emitter, Processor, WorkerArgs, WorkerError};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonLinesParams {
    path: PathBuf,
}

pub struct JsonLinesSink {
    path: PathBuf,
    file: Option<File>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn from_args(args: WorkerArgs<'_>) -> Result<Self, WorkerError> {
        let params: JsonLinesParams = params::decode(&args)?;
        if params.path.as_os_str().is_empty() {
            return Err(WorkerError::fatal("params.path is required"));
        }
        Ok(Self::new(params.path))
    }

    async fn file(&mut self) -> Result<&mut File, WorkerError> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| {
                    WorkerError::fatal(format!("cannot open {}: {e}", self.path.display()))
                })?;
            debug!(path = %self.path.display(), "Output file opened");
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| WorkerError::fatal("output file unavailable"))
    }
}

#[async_trait]
impl Processor for JsonLinesSink {
    async fn process(&mut self, payload: Payload, _out: &Emitter) -> Result<(), WorkerError> {
        let mut line = serde_json::to_vec(&payload)
            .map_err(|e| WorkerError::processing(format!("cannot encode payload: {e}")))?;
        line.push(b'\n');

        let file = self.file().await?;
        file.write_all(&line)
            .await
            .map_err(|e| WorkerError::processing(format!("write failed: {e}")))
    }

    async fn finish(&mut self, _out: &Emitter) -> Result<(), WorkerError> {
        if let Some(file) = self.file.as_mut() {
            file.flush()
                .await
                .map_err(|e| WorkerError::fatal(format!("flush failed: {e}")))?;
        }
        Ok(())
    }
}
