// Parameter decoding shared by the built-ins

use pipewright_core::port::{WorkerArgs, WorkerError};
use serde::de::DeserializeOwned;

/// Decode `params` into `T`; an absent mapping yields `T::default()`
pub fn decode<T>(args: &WorkerArgs<'_>) -> Result<T, WorkerError>
where
    T: DeserializeOwned + Default,
{
    if args.params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args.params.clone())
        .map_err(|e| WorkerError::fatal(format!("invalid params: {e}")))
}
