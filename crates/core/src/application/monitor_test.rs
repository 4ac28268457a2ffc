//! Unit tests for pool retirement and sentinel propagation

use super::*;
use crate::application::report::InstanceOutcome;
use crate::domain::PipelineSpec;
use crate::port::providers::mocks::FixedTimeProvider;
use tokio::sync::watch;
use tokio::task::JoinHandle;

fn queues(counts: &[(&str, usize)]) -> QueueRegistry {
    let names: Vec<&str> = counts.iter().map(|(name, _)| *name).collect();
    let spec = PipelineSpec::new(&names, vec![]);
    let counts = counts
        .iter()
        .map(|(name, n)| (name.to_string(), *n))
        .collect();
    QueueRegistry::build(&spec, &counts)
}

fn monitor(pools: Vec<RunningPool>, queues: QueueRegistry) -> LifecycleMonitor {
    LifecycleMonitor::new(
        "run-test",
        pools,
        queues,
        MonitorConfig::new(Duration::from_millis(1), Duration::from_millis(5)),
        Arc::new(FixedTimeProvider::new(1_000)),
    )
}

/// Instances that have already returned
async fn finished(n: usize) -> Vec<JoinHandle<InstanceOutcome>> {
    let handles: Vec<_> = (0..n)
        .map(|_| tokio::spawn(async { InstanceOutcome::Exhausted }))
        .collect();
    while handles.iter().any(|h| !h.is_finished()) {
        tokio::task::yield_now().await;
    }
    handles
}

/// Instances that run until the gate opens
fn gated(n: usize) -> (watch::Sender<bool>, Vec<JoinHandle<InstanceOutcome>>) {
    let (tx, rx) = watch::channel(false);
    let handles = (0..n)
        .map(|_| {
            let mut rx = rx.clone();
            tokio::spawn(async move {
                while !*rx.borrow() {
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
                InstanceOutcome::Exhausted
            })
        })
        .collect();
    (tx, handles)
}

#[tokio::test]
async fn test_single_producer_fan_out() {
    // 3 source instances feed A, read by 2 instances
    let queues = queues(&[("A", 2)]);
    let producer = RunningPool::new("Seed", vec!["A".into()], finished(3).await);
    let mut monitor = monitor(vec![producer], queues.clone());

    let retired = monitor.scan().await;

    assert_eq!(retired, vec!["Seed".to_string()]);
    assert_eq!(queues.get("A").unwrap().pending_terminations(), 2);
    assert_eq!(monitor.sentinels_delivered("A"), 2);
    assert_eq!(monitor.tracked(), 0);
}

#[tokio::test]
async fn test_fan_in_delivers_one_batch() {
    // Two producer pools (2 and 3 instances) feed B, read by 4 instances
    let queues = queues(&[("B", 4)]);
    let small = RunningPool::new("Small", vec!["B".into()], finished(2).await);
    let (gate, handles) = gated(3);
    let large = RunningPool::new("Large", vec!["B".into()], handles);
    let mut monitor = monitor(vec![small, large], queues.clone());
    assert_eq!(monitor.pending_producers("B"), 2);

    let retired = monitor.scan().await;
    assert_eq!(retired, vec!["Small".to_string()]);
    assert_eq!(
        queues.get("B").unwrap().pending_terminations(),
        0,
        "first producer to drain must not terminate B"
    );
    assert_eq!(monitor.pending_producers("B"), 1);

    gate.send(true).unwrap();
    while monitor.scan().await.is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert_eq!(queues.get("B").unwrap().pending_terminations(), 4);
    assert_eq!(monitor.sentinels_delivered("B"), 4);
    assert_eq!(monitor.pending_producers("B"), 0);
}

#[tokio::test]
async fn test_retire_twice_is_noop() {
    let queues = queues(&[("A", 3)]);
    let pool = RunningPool::new("Seed", vec!["A".into()], finished(1).await);
    let mut monitor = monitor(vec![pool], queues.clone());

    assert!(monitor.retire("Seed").await);
    assert!(!monitor.retire("Seed").await);
    assert!(!monitor.retire("Ghost").await);

    assert_eq!(queues.get("A").unwrap().pending_terminations(), 3);
    assert_eq!(monitor.into_summary().pools.len(), 1);
}

#[tokio::test]
async fn test_running_pool_is_not_retired() {
    let queues = queues(&[("A", 1)]);
    let (gate, handles) = gated(2);
    let pool = RunningPool::new("Slow", vec!["A".into()], handles);
    let mut monitor = monitor(vec![pool], queues.clone());

    assert!(monitor.scan().await.is_empty());
    assert!(monitor.is_tracking("Slow"));
    assert!(queues.get("A").unwrap().is_empty());

    drop(gate);
    let summary = monitor.run().await;
    assert_eq!(summary.pools[0].outcomes, vec![InstanceOutcome::Exhausted; 2]);
    assert_eq!(queues.get("A").unwrap().pending_terminations(), 1);
}

#[tokio::test]
async fn test_every_output_queue_gets_its_own_count() {
    let queues = queues(&[("Prices", 3), ("Audit", 1), ("Unread", 0)]);
    let pool = RunningPool::new(
        "Pricer",
        vec!["Prices".into(), "Audit".into(), "Prices".into(), "Unread".into()],
        finished(2).await,
    );
    let mut monitor = monitor(vec![pool], queues.clone());

    monitor.scan().await;

    assert_eq!(queues.get("Prices").unwrap().pending_terminations(), 3);
    assert_eq!(queues.get("Audit").unwrap().pending_terminations(), 1);
    assert!(queues.get("Unread").unwrap().is_empty());
}

#[tokio::test]
async fn test_orphan_queue_released_once() {
    let queues = queues(&[("Manual", 2)]);
    let mut monitor = monitor(vec![], queues.clone());

    monitor.release_orphan_queues();
    monitor.release_orphan_queues();

    assert_eq!(queues.get("Manual").unwrap().pending_terminations(), 2);
}

#[tokio::test]
async fn test_chain_propagates_stage_by_stage() {
    // Seed -> A -> Middle -> B; Middle still running holds B open
    let queues = queues(&[("A", 1), ("B", 2)]);
    let seed = RunningPool::new("Seed", vec!["A".into()], finished(1).await);
    let (gate, handles) = gated(1);
    let middle = RunningPool::new("Middle", vec!["B".into()], handles);
    let mut monitor = monitor(vec![seed, middle], queues.clone());

    monitor.scan().await;
    assert_eq!(queues.get("A").unwrap().pending_terminations(), 1);
    assert_eq!(queues.get("B").unwrap().pending_terminations(), 0);

    gate.send(true).unwrap();
    let summary = monitor.run().await;

    assert_eq!(queues.get("B").unwrap().pending_terminations(), 2);
    let order: Vec<&str> = summary.pools.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(order, vec!["Seed", "Middle"]);
    assert_eq!(summary.sentinels.get("A"), Some(&1));
    assert_eq!(summary.sentinels.get("B"), Some(&2));
}

#[tokio::test]
async fn test_panicked_instance_still_drains_pool() {
    let queues = queues(&[("A", 1)]);
    let handle = tokio::spawn(async {
        if true {
            panic!("boom");
        }
        InstanceOutcome::Exhausted
    });
    let pool = RunningPool::new("Fragile", vec!["A".into()], vec![handle]);
    let monitor = monitor(vec![pool], queues.clone());

    let summary = monitor.run().await;

    assert!(summary.pools[0].outcomes[0].is_failure());
    assert_eq!(queues.get("A").unwrap().pending_terminations(), 1);
}

#[test]
fn test_delay_stays_within_bounds() {
    let config = MonitorConfig::new(Duration::from_millis(30), Duration::from_millis(10));
    assert_eq!(config.min_poll_interval, Duration::from_millis(10));
    assert_eq!(config.max_poll_interval, Duration::from_millis(30));

    for _ in 0..100 {
        let delay = config.next_delay();
        assert!(delay >= config.min_poll_interval && delay <= config.max_poll_interval);
    }

    let fixed = MonitorConfig::new(Duration::from_millis(5), Duration::from_millis(5));
    assert_eq!(fixed.next_delay(), Duration::from_millis(5));
}
