// Pipeline Descriptor - parsed form of the YAML pipeline document

use super::error::ConfigError;
use super::message::Payload;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Immutable description of a pipeline: its queues and worker pools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSpec {
    pub queues: Vec<QueueSpec>,
    pub workers: Vec<WorkerSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSpec {
    pub name: String,
}

/// What an instance does when its input stays empty past `input_timeout_ms`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    #[default]
    Retry,
    Exit,
}

/// One named worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerSpec {
    /// Unique pool id
    pub name: String,
    /// Implementation namespace, e.g. `builtin`
    pub location: String,
    /// Implementation type within the namespace
    pub class: String,
    #[serde(default = "default_instances")]
    pub instances: usize,
    #[serde(default)]
    pub input_queue: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub output_queues: Vec<String>,
    /// Static seed data, mostly for sources
    #[serde(default)]
    pub input_values: Option<Vec<Payload>>,
    /// Implementation-specific parameters
    #[serde(default)]
    pub params: Payload,
    #[serde(default)]
    pub input_timeout_ms: Option<u64>,
    #[serde(default)]
    pub on_timeout: TimeoutPolicy,
}

fn default_instances() -> usize {
    1
}

/// `output_queues: ~` reads as no outputs
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl WorkerSpec {
    /// Minimal spec, mostly useful for building topologies in code
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            class: class.into(),
            instances: 1,
            input_queue: None,
            output_queues: Vec::new(),
            input_values: None,
            params: Payload::Null,
            input_timeout_ms: None,
            on_timeout: TimeoutPolicy::Retry,
        }
    }

    pub fn instances(mut self, instances: usize) -> Self {
        self.instances = instances;
        self
    }

    pub fn input(mut self, queue: impl Into<String>) -> Self {
        self.input_queue = Some(queue.into());
        self
    }

    pub fn output(mut self, queue: impl Into<String>) -> Self {
        self.output_queues.push(queue.into());
        self
    }

    pub fn values(mut self, values: Vec<Payload>) -> Self {
        self.input_values = Some(values);
        self
    }

    pub fn params(mut self, params: Payload) -> Self {
        self.params = params;
        self
    }

    pub fn input_timeout(&self) -> Option<Duration> {
        self.input_timeout_ms.map(Duration::from_millis)
    }

    /// Output queues with repeats removed, declaration order kept
    pub fn distinct_outputs(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.output_queues
            .iter()
            .filter(|q| seen.insert(q.as_str()))
            .cloned()
            .collect()
    }
}

impl PipelineSpec {
    pub fn new(queues: &[&str], workers: Vec<WorkerSpec>) -> Self {
        Self {
            queues: queues
                .iter()
                .map(|name| QueueSpec {
                    name: name.to_string(),
                })
                .collect(),
            workers,
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(document: &str) -> Result<Self, ConfigError> {
        let spec: PipelineSpec = serde_yaml::from_str(document)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read, parse and validate the document at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&document)
    }

    pub fn queue_names(&self) -> impl Iterator<Item = &str> {
        self.queues.iter().map(|q| q.name.as_str())
    }

    pub fn worker(&self, name: &str) -> Option<&WorkerSpec> {
        self.workers.iter().find(|w| w.name == name)
    }

    /// Structural checks that need no worker registry
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut queues = HashSet::new();
        for queue in &self.queues {
            if queue.name.trim().is_empty() {
                return Err(ConfigError::EmptyName("queues"));
            }
            if !queues.insert(queue.name.as_str()) {
                return Err(ConfigError::DuplicateQueue(queue.name.clone()));
            }
        }

        let mut workers = HashSet::new();
        for worker in &self.workers {
            if worker.name.trim().is_empty() {
                return Err(ConfigError::EmptyName("workers"));
            }
            if !workers.insert(worker.name.as_str()) {
                return Err(ConfigError::DuplicateWorker(worker.name.clone()));
            }
            if worker.instances == 0 {
                return Err(ConfigError::NoInstances {
                    worker: worker.name.clone(),
                });
            }

            let referenced = worker.input_queue.iter().chain(worker.output_queues.iter());
            for queue in referenced {
                if !queues.contains(queue.as_str()) {
                    return Err(ConfigError::UnknownQueue {
                        worker: worker.name.clone(),
                        queue: queue.clone(),
                    });
                }
            }
        }

        self.check_acyclic()
    }

    /// Refuse pool cycles: a sentinel can never enter one
    fn check_acyclic(&self) -> Result<(), ConfigError> {
        let mut readers: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, worker) in self.workers.iter().enumerate() {
            if let Some(input) = &worker.input_queue {
                readers.entry(input.as_str()).or_default().push(idx);
            }
        }

        let downstream: Vec<Vec<usize>> = self
            .workers
            .iter()
            .map(|worker| {
                worker
                    .output_queues
                    .iter()
                    .flat_map(|q| readers.get(q.as_str()).into_iter().flatten().copied())
                    .collect()
            })
            .collect();

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(
            node: usize,
            downstream: &[Vec<usize>],
            marks: &mut [Mark],
            path: &mut Vec<usize>,
        ) -> Option<Vec<usize>> {
            marks[node] = Mark::InProgress;
            path.push(node);
            for &next in &downstream[node] {
                match marks[next] {
                    Mark::InProgress => {
                        let start = path.iter().position(|&n| n == next).unwrap_or(0);
                        let mut cycle = path[start..].to_vec();
                        cycle.push(next);
                        return Some(cycle);
                    }
                    Mark::Unvisited => {
                        if let Some(cycle) = visit(next, downstream, marks, path) {
                            return Some(cycle);
                        }
                    }
                    Mark::Done => {}
                }
            }
            path.pop();
            marks[node] = Mark::Done;
            None
        }

        let mut marks = vec![Mark::Unvisited; self.workers.len()];
        for start in 0..self.workers.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            let mut path = Vec::new();
            if let Some(cycle) = visit(start, &downstream, &mut marks, &mut path) {
                let names: Vec<&str> = cycle
                    .iter()
                    .map(|&idx| self.workers[idx].name.as_str())
                    .collect();
                return Err(ConfigError::Cycle(names.join(" -> ")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "spec_test.rs"]
mod spec_test;
