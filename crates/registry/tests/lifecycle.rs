use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use rf_domain::config::{RegistryConfig, VpcConfig};
use rf_domain::node::{BulkOperation, NodeStatus};
use rf_domain::Error;
use rf_registry::{
    Clock, ManualClock, NodeRegistry, ScanCandidate, ScanOutcome, Snapshot, StaticCandidates,
};

fn addr(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 6, 0, last)
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Wall time that follows tokio's (pausable) clock.
struct TokioClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    fn new() -> Self {
        Self {
            base: Utc::now(),
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.base + elapsed
    }
}

fn manual_registry(candidates: Vec<ScanCandidate>) -> (Arc<ManualClock>, NodeRegistry) {
    let clock = Arc::new(ManualClock::default());
    let registry = NodeRegistry::builder()
        .source(Arc::new(StaticCandidates::new(candidates)))
        .clock(clock.clone())
        .seed(42)
        .build()
        .unwrap();
    (clock, registry)
}

#[tokio::test]
async fn discovered_node_goes_offline_then_is_evicted() {
    let (clock, registry) = manual_registry(vec![ScanCandidate::new(addr(11), "", true)]);
    assert!(registry.list().is_empty());

    assert!(matches!(registry.refresh().await, ScanOutcome::Completed(_)));
    let nodes = registry.list();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].address, addr(11));
    assert_eq!(nodes[0].status, NodeStatus::Online);

    clock.advance(Duration::from_secs(11));
    let report = registry.heartbeat_tick();
    assert_eq!(report.went_offline, vec!["node-11"]);
    assert_eq!(registry.list()[0].status, NodeStatus::Offline);

    clock.advance(Duration::from_secs(290));
    let report = registry.heartbeat_tick();
    assert_eq!(report.evicted, vec!["node-11"]);
    assert!(registry.list().is_empty());
}

#[tokio::test]
async fn bulk_freeze_skips_already_frozen() {
    let (_clock, registry) = manual_registry(vec![
        ScanCandidate::new(addr(11), "a", true),
        ScanCandidate::new(addr(12), "b", true),
        ScanCandidate::new(addr(13), "c", true),
    ]);
    registry.refresh().await;
    registry.freeze("b").unwrap();

    let outcome = registry.bulk_operation(&ids(&["a", "b", "c"]), BulkOperation::Freeze);
    assert_eq!(outcome.success, vec!["a", "c"]);
    assert_eq!(outcome.failed, vec!["b"]);
}

#[tokio::test]
async fn freeze_twice_is_not_permitted() {
    let (_clock, registry) = manual_registry(vec![ScanCandidate::new(addr(11), "a", true)]);
    registry.refresh().await;

    registry.freeze("a").unwrap();
    let after_first = registry.get_details("a").unwrap();
    assert!(matches!(registry.freeze("a"), Err(Error::NotPermitted { .. })));
    assert_eq!(registry.get_details("a").unwrap(), after_first);
}

#[tokio::test]
async fn subscribers_share_one_snapshot_per_publish() {
    let (_clock, registry) = manual_registry(vec![ScanCandidate::new(addr(11), "a", true)]);
    let seen: Arc<Mutex<Vec<Snapshot>>> = Arc::default();
    let s1 = seen.clone();
    let _a = registry.subscribe(move |snap| s1.lock().push(snap.clone()));
    let s2 = seen.clone();
    let _b = registry.subscribe(move |snap| s2.lock().push(snap.clone()));

    registry.refresh().await;

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(Arc::ptr_eq(&seen[0], &seen[1]));
    assert_eq!(seen[0].len(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_publishes_twice_and_comes_back() {
    let (_clock, registry) = manual_registry(vec![ScanCandidate::new(addr(11), "a", true)]);
    registry.refresh().await;

    let publishes = Arc::new(AtomicUsize::new(0));
    let p = publishes.clone();
    let sub = registry.subscribe(move |_| {
        p.fetch_add(1, Ordering::SeqCst);
    });

    registry.restart("a").unwrap();
    assert_eq!(registry.get("a").unwrap().status, NodeStatus::Offline);

    tokio::time::sleep(Duration::from_millis(5_100)).await;
    let node = registry.get("a").unwrap();
    assert_eq!(node.status, NodeStatus::Online);
    assert!(node.operations.can_freeze);
    assert_eq!(publishes.load(Ordering::SeqCst), 2);
    sub.unsubscribe();
}

#[tokio::test(start_paused = true)]
async fn restart_of_evicted_node_is_dropped() {
    let (clock, registry) = manual_registry(vec![ScanCandidate::new(addr(11), "a", true)]);
    registry.refresh().await;
    registry.restart("a").unwrap();

    clock.advance(Duration::from_secs(301));
    registry.heartbeat_tick();
    assert_eq!(registry.pending_restarts(), 0);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(registry.get("a").is_none());
}

#[tokio::test(start_paused = true)]
async fn timers_drive_discovery_and_heartbeat() {
    let source = Arc::new(StaticCandidates::new(vec![ScanCandidate::new(
        addr(11),
        "render-node-01",
        true,
    )]));
    let registry = NodeRegistry::builder()
        .source(source.clone())
        .clock(Arc::new(TokioClock::new()))
        .seed(1)
        .build()
        .unwrap();

    registry.start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.list().len(), 1);

    // Node disappears from the network; scans stop refreshing it.
    source.set(vec![ScanCandidate::new(addr(11), "render-node-01", false)]);
    tokio::time::sleep(Duration::from_secs(13)).await;
    assert_eq!(registry.get("render-node-01").unwrap().status, NodeStatus::Offline);

    assert!(registry.stop());
    tokio::time::sleep(Duration::from_secs(400)).await;
    // Timers are stopped, so nothing was evicted.
    assert_eq!(registry.list().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconfigure_restarts_timers_with_new_periods() {
    let registry = NodeRegistry::builder()
        .clock(Arc::new(TokioClock::new()))
        .build()
        .unwrap();
    registry.start().unwrap();

    let faster = RegistryConfig {
        scan_interval_ms: 1_000,
        heartbeat_interval_ms: 500,
        ..Default::default()
    };
    let vpc = VpcConfig {
        cidr: "192.168.10.0/24".into(),
        admin_address: Ipv4Addr::new(192, 168, 10, 2),
        ..Default::default()
    };
    registry.reconfigure(vpc.clone(), faster.clone()).unwrap();
    assert!(registry.is_running());
    assert_eq!(registry.registry_config(), faster);
    assert_eq!(registry.vpc_status().cidr, "192.168.10.0/24");

    let broken = RegistryConfig {
        eviction_ms: 1_000,
        ..Default::default()
    };
    assert!(matches!(
        registry.reconfigure(vpc, broken),
        Err(Error::Config(_))
    ));
    assert_eq!(registry.registry_config(), faster);
}
