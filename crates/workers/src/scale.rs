// Scale - multiplies numeric payloads by a fixed factor

use crate::params;
use async_trait::async_trait;
use pipewright_core::domain::Payload;
use pipewright_core::port::{Emitter, Processor, WorkerArgs, WorkerError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ScaleParams {
    factor: f64,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self { factor: 2.0 }
    }
}

pub struct Scale {
    factor: f64,
}

impl Scale {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    pub fn from_args(args: WorkerArgs<'_>) -> Result<Self, WorkerError> {
        let params: ScaleParams = params::decode(&args)?;
        if !params.factor.is_finite() {
            return Err(WorkerError::fatal("factor must be a finite number"));
        }
        Ok(Self::new(params.factor))
    }

    fn apply(&self, payload: &Payload) -> Result<Payload, WorkerError> {
        let number = payload
            .as_f64()
            .ok_or_else(|| WorkerError::processing(format!("not a number: {payload}")))?;

        // Integers stay integers when the factor is integral and fits in i64
        if let Some(n) = payload.as_i64() {
            if self.factor.fract() == 0.0 && fits_i64(self.factor) {
                if let Some(scaled) = n.checked_mul(self.factor as i64) {
                    return Ok(Payload::from(scaled));
                }
            }
        }

        serde_json::Number::from_f64(number * self.factor)
            .map(Payload::Number)
            .ok_or_else(|| WorkerError::processing(format!("{payload} * {} overflows", self.factor)))
    }
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive
fn fits_i64(value: f64) -> bool {
    value >= i64::MIN as f64 && value < i64::MAX as f64
}

#[async_trait]
impl Processor for Scale {
    async fn process(&mut self, payload: Payload, out: &Emitter) -> Result<(), WorkerError> {
        let scaled = self.apply(&payload)?;
        out.emit(scaled)?;
        Ok(())
    }
}
