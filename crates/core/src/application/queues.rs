// Queue Registry - one queue per declared name

use crate::domain::{ConfigError, PipelineSpec, Queue};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Shared handle set over every queue of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct QueueRegistry {
    queues: BTreeMap<String, Arc<Queue>>,
}

impl QueueRegistry {
    /// Create every declared queue, stamping each with its consumer count
    pub fn build(spec: &PipelineSpec, consumer_counts: &HashMap<String, usize>) -> Self {
        let queues = spec
            .queue_names()
            .map(|name| {
                let consumers = consumer_counts.get(name).copied().unwrap_or(0);
                (name.to_string(), Arc::new(Queue::new(name, consumers)))
            })
            .collect();
        Self { queues }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Queue>> {
        self.queues.get(name).cloned()
    }

    /// Look up a queue on behalf of `worker`
    pub fn resolve(&self, worker: &str, name: &str) -> Result<Arc<Queue>, ConfigError> {
        self.get(name).ok_or_else(|| ConfigError::UnknownQueue {
            worker: worker.to_string(),
            queue: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Queue>> {
        self.queues.values()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Messages still waiting across all queues
    pub fn pending_total(&self) -> usize {
        self.queues.values().map(|q| q.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, WorkerSpec};

    #[test]
    fn test_one_queue_per_declared_name() {
        let spec = PipelineSpec::new(
            &["Symbols", "Prices"],
            vec![WorkerSpec::new("W", "builtin", "LogSink").input("Symbols")],
        );
        let counts = HashMap::from([("Symbols".to_string(), 3)]);

        let registry = QueueRegistry::build(&spec, &counts);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Symbols").unwrap().consumer_count(), 3);
        assert_eq!(registry.get("Prices").unwrap().consumer_count(), 0);
        assert!(registry.get("Missing").is_none());
    }

    #[test]
    fn test_handles_share_one_queue() {
        let spec = PipelineSpec::new(&["A"], vec![]);
        let registry = QueueRegistry::build(&spec, &HashMap::new());

        let first = registry.get("A").unwrap();
        let second = registry.clone().get("A").unwrap();
        first.put(Message::data(7)).unwrap();

        assert_eq!(second.try_get().unwrap(), Some(Message::data(7)));
        assert_eq!(registry.pending_total(), 0);
    }

    #[test]
    fn test_resolve_unknown_names_worker() {
        let registry = QueueRegistry::default();
        let err = registry.resolve("Pricer", "Nowhere").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Worker Pricer references undeclared queue: Nowhere"
        );
    }
}
