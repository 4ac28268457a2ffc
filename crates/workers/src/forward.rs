// Forward - re-emits every payload unchanged

use async_trait::async_trait;
use pipewright_core::domain::Payload;
use pipewright_core::port::{Emitter, Processor, WorkerError};

pub struct Forward;

#[async_trait]
impl Processor for Forward {
    async fn process(&mut self, payload: Payload, out: &Emitter) -> Result<(), WorkerError> {
        out.emit(payload)?;
        Ok(())
    }
}
