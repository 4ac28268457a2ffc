//! Lifecycle Monitor - retires drained pools and propagates termination
//!
//! Each pool moves RUNNING -> DRAINED exactly once, when none of its
//! instances is alive any more. On that transition the monitor releases the
//! pool's claim on each of its output queues. Every queue carries a countdown
//! of producer pools still running; only the release that brings it to zero
//! injects sentinels, one per consumer instance of that queue. A queue fed by
//! several pools therefore receives one batch, not one per producer.
//!
//! All bookkeeping here is owned by the monitor task. Workers only ever see
//! queues.
//!
//! Liveness is polled: scan, sleep a jittered interval, repeat until nothing
//! is tracked. A stuck instance keeps its pool RUNNING forever; there is no
//! forced-kill primitive.

use super::constants::{DEFAULT_MAX_POLL_INTERVAL, DEFAULT_MIN_POLL_INTERVAL};
use super::pool::{collect_outcome, RunningPool};
use super::queues::QueueRegistry;
use super::report::PoolReport;
use crate::domain::Message;
use crate::port::TimeProvider;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Poll pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub min_poll_interval: Duration,
    pub max_poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            min_poll_interval: DEFAULT_MIN_POLL_INTERVAL,
            max_poll_interval: DEFAULT_MAX_POLL_INTERVAL,
        }
    }
}

impl MonitorConfig {
    /// Bounds are reordered if given backwards
    pub fn new(min_poll_interval: Duration, max_poll_interval: Duration) -> Self {
        Self {
            min_poll_interval: min_poll_interval.min(max_poll_interval),
            max_poll_interval: max_poll_interval.max(min_poll_interval),
        }
    }

    /// Uniform draw in `[min, max]`
    pub fn next_delay(&self) -> Duration {
        if self.min_poll_interval == self.max_poll_interval {
            return self.min_poll_interval;
        }
        rand::thread_rng().gen_range(self.min_poll_interval..=self.max_poll_interval)
    }
}

/// What the monitor hands back once every pool is retired
#[derive(Debug, Clone, Default)]
pub struct MonitorSummary {
    pub pools: Vec<PoolReport>,
    pub sentinels: BTreeMap<String, usize>,
}

pub struct LifecycleMonitor {
    run_id: String,
    queues: QueueRegistry,
    tracked: BTreeMap<String, RunningPool>,
    /// Producer pools still running, per queue
    pending_producers: HashMap<String, usize>,
    sentinels: BTreeMap<String, usize>,
    retired: Vec<PoolReport>,
    orphans_released: bool,
    config: MonitorConfig,
    time_provider: Arc<dyn TimeProvider>,
}

impl LifecycleMonitor {
    pub fn new(
        run_id: impl Into<String>,
        pools: Vec<RunningPool>,
        queues: QueueRegistry,
        config: MonitorConfig,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let mut pending_producers: HashMap<String, usize> =
            queues.names().map(|name| (name.to_string(), 0)).collect();
        for pool in &pools {
            for queue in pool.output_queues() {
                *pending_producers.entry(queue.clone()).or_insert(0) += 1;
            }
        }

        let tracked = pools
            .into_iter()
            .map(|pool| (pool.name().to_string(), pool))
            .collect();

        Self {
            run_id: run_id.into(),
            queues,
            tracked,
            pending_producers,
            sentinels: BTreeMap::new(),
            retired: Vec::new(),
            orphans_released: false,
            config,
            time_provider,
        }
    }

    /// Pools still RUNNING
    pub fn tracked(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_tracking(&self, pool: &str) -> bool {
        self.tracked.contains_key(pool)
    }

    /// Producer pools still to drain before `queue` gets its sentinels
    pub fn pending_producers(&self, queue: &str) -> usize {
        self.pending_producers.get(queue).copied().unwrap_or(0)
    }

    /// Sentinels injected into `queue` so far
    pub fn sentinels_delivered(&self, queue: &str) -> usize {
        self.sentinels.get(queue).copied().unwrap_or(0)
    }

    /// Terminate readers of queues no pool writes to. Runs once.
    pub fn release_orphan_queues(&mut self) {
        if self.orphans_released {
            return;
        }
        self.orphans_released = true;

        let orphans: Vec<String> = self
            .queues
            .iter()
            .filter(|q| q.consumer_count() > 0 && self.pending_producers(q.name()) == 0)
            .map(|q| q.name().to_string())
            .collect();
        for queue in orphans {
            warn!(
                run_id = %self.run_id,
                queue = %queue,
                "Queue has consumers but no producer pool, terminating its readers now"
            );
            self.deliver_sentinels(&queue);
        }
    }

    /// One pass over every tracked pool; returns the pools retired by it
    pub async fn scan(&mut self) -> Vec<String> {
        let drained: Vec<String> = self
            .tracked
            .values()
            .filter(|pool| pool.alive() == 0)
            .map(|pool| pool.name().to_string())
            .collect();

        if tracing::enabled!(tracing::Level::DEBUG) {
            let liveness: BTreeMap<&str, (usize, usize)> = self
                .tracked
                .values()
                .map(|pool| (pool.name(), (pool.alive(), pool.size())))
                .collect();
            debug!(run_id = %self.run_id, ?liveness, "Worker pool liveness (alive, size)");
        }

        for name in &drained {
            self.retire(name).await;
        }
        drained
    }

    /// RUNNING -> DRAINED for `pool`. Returns false, doing nothing, when the
    /// pool is not tracked (already retired or never known).
    ///
    /// Awaits any instance still running, so callers other than `scan`
    /// should only pass pools whose instances have all finished.
    pub async fn retire(&mut self, pool: &str) -> bool {
        let Some(running) = self.tracked.remove(pool) else {
            debug!(run_id = %self.run_id, pool = %pool, "Pool not tracked, nothing to retire");
            return false;
        };

        let outputs = running.output_queues().to_vec();
        let mut outcomes = Vec::with_capacity(running.size());
        for handle in running.into_handles() {
            outcomes.push(collect_outcome(handle).await);
        }

        let report = PoolReport {
            name: pool.to_string(),
            outcomes,
            retired_at: self.time_provider.now_millis(),
        };
        info!(
            run_id = %self.run_id,
            pool = %pool,
            instances = report.instances(),
            failures = report.failures(),
            "Worker pool drained"
        );
        self.retired.push(report);

        for queue in outputs {
            self.release_producer(&queue);
        }
        true
    }

    fn release_producer(&mut self, queue: &str) {
        let remaining = match self.pending_producers.get_mut(queue) {
            Some(count) if *count > 0 => {
                *count -= 1;
                *count
            }
            _ => {
                error!(run_id = %self.run_id, queue = %queue, "Producer released twice");
                return;
            }
        };

        if remaining > 0 {
            debug!(
                run_id = %self.run_id,
                queue = %queue,
                remaining_producers = remaining,
                "Queue still has running producers"
            );
            return;
        }
        self.deliver_sentinels(queue);
    }

    fn deliver_sentinels(&mut self, queue_name: &str) {
        let Some(queue) = self.queues.get(queue_name) else {
            error!(run_id = %self.run_id, queue = %queue_name, "Unknown queue, no sentinels sent");
            return;
        };

        let consumers = queue.consumer_count();
        let mut delivered = 0;
        for _ in 0..consumers {
            match queue.put(Message::Terminate) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    error!(run_id = %self.run_id, queue = %queue_name, error = %e, "Sentinel delivery failed");
                    break;
                }
            }
        }
        *self.sentinels.entry(queue_name.to_string()).or_insert(0) += delivered;

        info!(
            run_id = %self.run_id,
            queue = %queue_name,
            sentinels = delivered,
            "Termination propagated"
        );
    }

    /// Poll until every pool is retired
    pub async fn run(mut self) -> MonitorSummary {
        info!(
            run_id = %self.run_id,
            pools = self.tracked.len(),
            "Lifecycle monitor started"
        );
        self.release_orphan_queues();

        loop {
            self.scan().await;
            if self.tracked.is_empty() {
                break;
            }
            tokio::time::sleep(self.config.next_delay()).await;
        }

        info!(run_id = %self.run_id, "All worker pools retired");
        self.into_summary()
    }

    pub fn into_summary(self) -> MonitorSummary {
        MonitorSummary {
            pools: self.retired,
            sentinels: self.sentinels,
        }
    }
}

#[cfg(test)]
#[path = "monitor_test.rs"]
mod monitor_test;
