// Worker Registry - name-keyed factories, populated at startup
//
// A pipeline document names implementations as `location` + `class`.
// Resolution is a plain map lookup; adding a worker type means registering
// one more factory, the orchestrator never changes.

use crate::port::{Processor, Source, WorkerArgs, WorkerError, WorkerInstance};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds one worker instance from its static inputs
pub type WorkerFactory =
    Arc<dyn Fn(WorkerArgs<'_>) -> Result<WorkerInstance, WorkerError> + Send + Sync>;

/// `location.class` pair identifying an implementation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImplementationKey {
    pub location: String,
    pub class: String,
}

impl ImplementationKey {
    pub fn new(location: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            class: class.into(),
        }
    }
}

impl fmt::Display for ImplementationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.location, self.class)
    }
}

#[derive(Clone, Default)]
pub struct WorkerRegistry {
    factories: HashMap<ImplementationKey, WorkerFactory>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a later registration under the same key wins
    pub fn register<F>(&mut self, location: &str, class: &str, factory: F) -> &mut Self
    where
        F: Fn(WorkerArgs<'_>) -> Result<WorkerInstance, WorkerError> + Send + Sync + 'static,
    {
        let key = ImplementationKey::new(location, class);
        if self.factories.insert(key.clone(), Arc::new(factory)).is_some() {
            tracing::debug!(implementation = %key, "Worker factory replaced");
        }
        self
    }

    pub fn register_source<S, F>(&mut self, location: &str, class: &str, make: F) -> &mut Self
    where
        S: Source + 'static,
        F: Fn(WorkerArgs<'_>) -> Result<S, WorkerError> + Send + Sync + 'static,
    {
        self.register(location, class, move |args| {
            make(args).map(WorkerInstance::source)
        })
    }

    pub fn register_processor<P, F>(&mut self, location: &str, class: &str, make: F) -> &mut Self
    where
        P: Processor + 'static,
        F: Fn(WorkerArgs<'_>) -> Result<P, WorkerError> + Send + Sync + 'static,
    {
        self.register(location, class, move |args| {
            make(args).map(WorkerInstance::processor)
        })
    }

    pub fn resolve(&self, location: &str, class: &str) -> Option<WorkerFactory> {
        self.factories
            .get(&ImplementationKey::new(location, class))
            .cloned()
    }

    pub fn contains(&self, location: &str, class: &str) -> bool {
        self.factories
            .contains_key(&ImplementationKey::new(location, class))
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<ImplementationKey> {
        let mut keys: Vec<_> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("implementations", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Payload;
    use crate::port::{Emitter, WorkerKind};
    use async_trait::async_trait;

    struct Nothing;

    #[async_trait]
    impl Source for Nothing {
        async fn run(&mut self, _out: &Emitter) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    struct Discard;

    #[async_trait]
    impl Processor for Discard {
        async fn process(&mut self, _payload: Payload, _out: &Emitter) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    fn args(params: &Payload) -> WorkerArgs<'_> {
        WorkerArgs {
            pool: "pool",
            instance: 0,
            input_values: &[],
            params,
        }
    }

    #[test]
    fn test_resolve_by_location_and_class() {
        let mut registry = WorkerRegistry::new();
        registry
            .register_source("test", "Nothing", |_| Ok(Nothing))
            .register_processor("test", "Discard", |_| Ok(Discard));

        let params = Payload::Null;
        let source = registry.resolve("test", "Nothing").unwrap();
        assert_eq!(source(args(&params)).unwrap().kind(), WorkerKind::Source);

        let processor = registry.resolve("test", "Discard").unwrap();
        assert_eq!(processor(args(&params)).unwrap().kind(), WorkerKind::Processor);

        assert!(registry.contains("test", "Nothing"));
        assert!(!registry.contains("test", "Missing"));
        assert!(registry.resolve("other", "Discard").is_none());
        assert!(registry.resolve("test", "discard").is_none(), "lookup is case sensitive");
    }

    #[test]
    fn test_keys_sorted_and_displayed() {
        let mut registry = WorkerRegistry::new();
        registry
            .register_processor("b", "Z", |_| Ok(Discard))
            .register_source("a", "Y", |_| Ok(Nothing));

        let keys: Vec<String> = registry.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a.Y", "b.Z"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_factory_error_surfaces() {
        let mut registry = WorkerRegistry::new();
        registry.register_processor("test", "Picky", |args: WorkerArgs<'_>| {
            if args.param("factor").is_none() {
                return Err(WorkerError::fatal("factor is required"));
            }
            Ok(Discard)
        });

        let params = Payload::Null;
        let factory = registry.resolve("test", "Picky").unwrap();
        let err = factory(args(&params)).unwrap_err();
        assert!(err.to_string().contains("factor is required"));
    }
}
