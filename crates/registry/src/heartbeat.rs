//! Heartbeat monitor: online→offline transition, telemetry refresh and
//! eviction of long-silent nodes.

use std::sync::Arc;

use serde::Serialize;

use rf_domain::node::NodeStatus;
use rf_domain::trace::TraceEvent;

use crate::shared::Shared;
use crate::telemetry;

/// What one heartbeat tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub went_offline: Vec<String>,
    pub evicted: Vec<String>,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        !self.went_offline.is_empty() || !self.evicted.is_empty()
    }
}

pub struct HeartbeatMonitor {
    shared: Arc<Shared>,
}

impl HeartbeatMonitor {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Run one check over every record. Publishes when any status changed
    /// or any record was evicted.
    pub fn tick(&self) -> TickReport {
        let now = self.shared.now();
        let settings = self.shared.settings();
        let retention = settings.registry.retention();
        let eviction = settings.registry.eviction();
        let mut report = TickReport::default();

        {
            let mut store = self.shared.store.lock();
            let mut rng = self.shared.rng.lock();

            for id in store.ids() {
                let Some(silence) = store.silence(&id, now) else {
                    continue;
                };
                let Some(record) = store.get_mut(&id) else {
                    continue;
                };

                if silence > retention && record.status == NodeStatus::Online {
                    record.status = NodeStatus::Offline;
                    tracing::warn!(
                        node_id = %id,
                        server_name = %record.server_name,
                        silent_ms = silence.num_milliseconds(),
                        "node went offline"
                    );
                    TraceEvent::NodeOffline {
                        node_id: id.clone(),
                        silent_ms: silence.num_milliseconds(),
                    }
                    .emit();
                    report.went_offline.push(id.clone());
                }

                if record.status == NodeStatus::Online {
                    telemetry::refresh(record, &mut **rng, now);
                }
            }

            for id in store.ids() {
                let Some(silence) = store.silence(&id, now) else {
                    continue;
                };
                if silence > eviction {
                    store.remove(&id);
                    tracing::info!(
                        node_id = %id,
                        silent_ms = silence.num_milliseconds(),
                        "evicted silent node"
                    );
                    TraceEvent::NodeEvicted {
                        node_id: id.clone(),
                        silent_ms: silence.num_milliseconds(),
                    }
                    .emit();
                    report.evicted.push(id);
                }
            }

            if !report.evicted.is_empty() {
                tracing::info!(
                    evicted = report.evicted.len(),
                    remaining = store.len(),
                    "pruned stale nodes"
                );
            }
        }

        if report.changed() {
            self.shared.publish();
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::store::tests::make_record;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn setup() -> (Arc<ManualClock>, Arc<Shared>, HeartbeatMonitor) {
        let clock = Arc::new(ManualClock::default());
        let shared = Shared::for_tests(clock.clone(), 1);
        shared
            .store
            .lock()
            .upsert(make_record("n1", Ipv4Addr::new(10, 6, 0, 11), clock.now()));
        let monitor = HeartbeatMonitor::new(shared.clone());
        (clock, shared, monitor)
    }

    fn status(shared: &Shared, id: &str) -> Option<NodeStatus> {
        shared.store.lock().get(id).map(|r| r.status)
    }

    #[test]
    fn quiet_within_retention_stays_online() {
        let (clock, shared, monitor) = setup();
        clock.advance(Duration::from_secs(10));
        let report = monitor.tick();
        assert!(!report.changed());
        assert_eq!(status(&shared, "n1"), Some(NodeStatus::Online));
    }

    #[test]
    fn silence_past_retention_marks_offline_once() {
        let (clock, shared, monitor) = setup();
        let published = Arc::new(AtomicUsize::new(0));
        let p = published.clone();
        let _sub = shared.bus.subscribe(move |_| {
            p.fetch_add(1, Ordering::SeqCst);
        });

        clock.advance(Duration::from_secs(11));
        let report = monitor.tick();
        assert_eq!(report.went_offline, vec!["n1"]);
        assert_eq!(status(&shared, "n1"), Some(NodeStatus::Offline));

        let again = monitor.tick();
        assert!(!again.changed());
        assert_eq!(published.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn heartbeat_resets_silence() {
        let (clock, shared, monitor) = setup();
        clock.advance(Duration::from_secs(8));
        let now = clock.now();
        shared.store.lock().heartbeats_mut().record("n1", now);
        clock.advance(Duration::from_secs(8));
        assert!(!monitor.tick().changed());
        assert_eq!(status(&shared, "n1"), Some(NodeStatus::Online));
    }

    #[test]
    fn offline_nodes_are_not_refreshed() {
        let (clock, shared, monitor) = setup();
        clock.advance(Duration::from_secs(11));
        monitor.tick();
        let before = shared.store.lock().get("n1").cloned().unwrap();
        clock.advance(Duration::from_secs(2));
        monitor.tick();
        let after = shared.store.lock().get("n1").cloned().unwrap();
        assert_eq!(before.metrics, after.metrics);
        assert_eq!(before.last_seen, after.last_seen);
    }

    #[test]
    fn online_nodes_get_telemetry_refresh() {
        let (clock, shared, monitor) = setup();
        clock.advance(Duration::from_secs(2));
        monitor.tick();
        let record = shared.store.lock().get("n1").cloned().unwrap();
        assert_eq!(record.last_seen, clock.now());
        assert_eq!(record.gpu.utilization, format!("{}%", record.metrics.gpu_usage));
    }

    #[test]
    fn silence_past_eviction_removes_record() {
        let (clock, shared, monitor) = setup();
        clock.advance(Duration::from_secs(301));
        let report = monitor.tick();
        assert_eq!(report.went_offline, vec!["n1"]);
        assert_eq!(report.evicted, vec!["n1"]);
        assert!(shared.store.lock().is_empty());
        assert!(shared.store.lock().heartbeats().last_contact("n1").is_none());
    }

    #[test]
    fn eviction_applies_regardless_of_status() {
        let (clock, shared, monitor) = setup();
        shared.store.lock().get_mut("n1").unwrap().status = NodeStatus::Offline;
        clock.advance(Duration::from_secs(301));
        let report = monitor.tick();
        assert!(report.went_offline.is_empty());
        assert_eq!(report.evicted, vec!["n1"]);
    }
}
