//! Discovery feed: turns probe results into node records.
//!
//! Probing itself happens behind [`CandidateSource`]; the feed only sees an
//! address, a hostname, the advertised services and a reachability flag
//! per candidate. Scans are single-flight: a scan requested while another
//! is still running is skipped, not queued.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use rf_domain::address::{last_octet, region_for};
use rf_domain::node::{ConnectionInfo, NodeRecord, NodeStatus, Operations};
use rf_domain::trace::TraceEvent;

use crate::catalog;
use crate::shared::{Settings, Shared};
use crate::store::NodeStore;
use crate::telemetry;

/// One probed address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCandidate {
    pub address: Ipv4Addr,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub services: Vec<String>,
    pub reachable: bool,
}

impl ScanCandidate {
    pub fn new(address: Ipv4Addr, hostname: impl Into<String>, reachable: bool) -> Self {
        Self {
            address,
            hostname: hostname.into(),
            services: Vec::new(),
            reachable,
        }
    }
}

/// Supplies candidates for one discovery scan.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn scan(&self) -> rf_domain::Result<Vec<ScanCandidate>>;
}

/// A fixed, replaceable candidate list.
#[derive(Debug, Default)]
pub struct StaticCandidates {
    candidates: Mutex<Vec<ScanCandidate>>,
}

impl StaticCandidates {
    pub fn new(candidates: Vec<ScanCandidate>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
        }
    }

    pub fn set(&self, candidates: Vec<ScanCandidate>) {
        *self.candidates.lock() = candidates;
    }
}

#[async_trait]
impl CandidateSource for StaticCandidates {
    async fn scan(&self) -> rf_domain::Result<Vec<ScanCandidate>> {
        Ok(self.candidates.lock().clone())
    }
}

/// What one scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub candidates: usize,
    /// Ids of records created by this scan.
    pub discovered: Vec<String>,
    /// Ids of already-known records whose heartbeat was refreshed.
    pub refreshed: Vec<String>,
    pub unreachable: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(ScanReport),
    /// Another scan was already in flight.
    Skipped,
    /// The candidate source failed; the store is untouched.
    Failed(String),
}

/// Resets the in-flight flag when the scan ends, including on cancellation.
struct ScanGuard<'a>(&'a AtomicBool);

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DiscoveryFeed {
    shared: Arc<Shared>,
    source: Arc<dyn CandidateSource>,
    scanning: AtomicBool,
}

impl DiscoveryFeed {
    pub(crate) fn new(shared: Arc<Shared>, source: Arc<dyn CandidateSource>) -> Self {
        Self {
            shared,
            source,
            scanning: AtomicBool::new(false),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// Run one scan unless one is already in flight.
    pub async fn scan(&self) -> ScanOutcome {
        let Some(_guard) = ScanGuard::acquire(&self.scanning) else {
            tracing::debug!("scan already in flight, skipping");
            return ScanOutcome::Skipped;
        };

        let started = Instant::now();
        tracing::debug!("scanning VPC for render nodes");

        let candidates = match self.source.scan().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "network scan failed");
                return ScanOutcome::Failed(e.to_string());
            }
        };

        let report = self.ingest(candidates);
        TraceEvent::ScanCompleted {
            candidates: report.candidates,
            discovered: report.discovered.len(),
            refreshed: report.refreshed.len(),
            unreachable: report.unreachable,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();
        ScanOutcome::Completed(report)
    }

    /// Apply probe results to the store and publish if anything changed.
    pub(crate) fn ingest(&self, candidates: Vec<ScanCandidate>) -> ScanReport {
        let now = self.shared.now();
        let settings = self.shared.settings();
        let mut report = ScanReport {
            candidates: candidates.len(),
            ..Default::default()
        };
        let mut changed = false;

        {
            let mut store = self.shared.store.lock();
            let mut rng = self.shared.rng.lock();

            for candidate in candidates {
                if !candidate.reachable {
                    report.unreachable += 1;
                    continue;
                }

                let known = store
                    .find_by_address(candidate.address)
                    .map(|r| r.id.clone());
                if let Some(id) = known {
                    if let Some(record) = store.get_mut(&id) {
                        if record.status != NodeStatus::Online {
                            tracing::info!(node_id = %id, "node back online");
                            changed = true;
                        }
                        record.status = NodeStatus::Online;
                        record.last_seen = now;
                    }
                    store.heartbeats_mut().record(&id, now);
                    report.refreshed.push(id);
                    continue;
                }

                let id = node_id_for(&store, &candidate);
                let record = synthesize(id.clone(), &candidate, &settings, now, &mut **rng);
                tracing::info!(
                    node_id = %record.id,
                    address = %record.address,
                    services = ?candidate.services,
                    "new render node registered"
                );
                TraceEvent::NodeDiscovered {
                    node_id: record.id.clone(),
                    address: record.address.to_string(),
                    region: record.region.clone(),
                }
                .emit();
                store.upsert(record);
                report.discovered.push(id);
                changed = true;
            }
        }

        if changed {
            self.shared.publish();
        }
        report
    }
}

/// Hostname when present, `node-<last octet>` otherwise; suffixed with a
/// counter if that id already belongs to another address.
fn node_id_for(store: &NodeStore, candidate: &ScanCandidate) -> String {
    let base = match candidate.hostname.trim() {
        "" => format!("node-{}", last_octet(candidate.address)),
        h => h.to_string(),
    };
    (0u32..)
        .map(|n| match n {
            0 => base.clone(),
            n => format!("{base}-{n}"),
        })
        .find(|id| !store.contains(id))
        .unwrap_or(base)
}

fn synthesize<R: Rng + ?Sized>(
    id: String,
    candidate: &ScanCandidate,
    settings: &Settings,
    now: DateTime<Utc>,
    rng: &mut R,
) -> NodeRecord {
    let server_name = match candidate.hostname.trim() {
        "" => format!("Node-{}", last_octet(candidate.address)),
        h => h.to_string(),
    };
    NodeRecord {
        id,
        server_name,
        address: candidate.address,
        region: region_for(candidate.address).to_string(),
        capacity: settings.registry.default_capacity,
        status: NodeStatus::Online,
        last_seen: now,
        metrics: telemetry::initial_metrics(rng),
        gpu: catalog::gpu_for(candidate.address),
        system: catalog::system_for(candidate.address),
        connection: ConnectionInfo {
            admin_address: settings.vpc.admin_address,
            connected_at: now,
            heartbeat_interval_ms: settings.registry.heartbeat_interval_ms,
            vpc_id: settings.vpc.vpc_id.clone(),
            subnet: settings.vpc.cidr.clone(),
        },
        operations: Operations::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use std::sync::atomic::AtomicUsize;

    fn shared(clock: Arc<ManualClock>) -> Arc<Shared> {
        Shared::for_tests(clock, 1)
    }

    fn addr(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 6, 0, last)
    }

    #[test]
    fn reachable_candidate_becomes_online_record() {
        let clock = Arc::new(ManualClock::default());
        let shared = shared(clock.clone());
        let feed = DiscoveryFeed::new(shared.clone(), Arc::new(StaticCandidates::default()));

        let report = feed.ingest(vec![ScanCandidate::new(addr(11), "render-node-01", true)]);
        assert_eq!(report.discovered, vec!["render-node-01"]);

        let store = shared.store.lock();
        let record = store.get("render-node-01").unwrap();
        assert_eq!(record.address, addr(11));
        assert_eq!(record.status, NodeStatus::Online);
        assert_eq!(record.region, "ap-southeast-1");
        assert_eq!(record.capacity, 4);
        assert_eq!(record.connection.connected_at, clock.now());
        assert_eq!(record.operations, Operations::default());
    }

    #[test]
    fn unreachable_candidate_is_ignored() {
        let shared = shared(Arc::new(ManualClock::default()));
        let feed = DiscoveryFeed::new(shared.clone(), Arc::new(StaticCandidates::default()));
        let report = feed.ingest(vec![ScanCandidate::new(addr(12), "render-node-02", false)]);
        assert_eq!(report.unreachable, 1);
        assert!(shared.store.lock().is_empty());
    }

    #[test]
    fn missing_hostname_uses_octet() {
        let shared = shared(Arc::new(ManualClock::default()));
        let feed = DiscoveryFeed::new(shared.clone(), Arc::new(StaticCandidates::default()));
        feed.ingest(vec![ScanCandidate::new(addr(14), "", true)]);
        let store = shared.store.lock();
        let record = store.get("node-14").unwrap();
        assert_eq!(record.server_name, "Node-14");
    }

    #[test]
    fn known_address_refreshes_heartbeat_and_status() {
        let clock = Arc::new(ManualClock::default());
        let shared = shared(clock.clone());
        let feed = DiscoveryFeed::new(shared.clone(), Arc::new(StaticCandidates::default()));
        feed.ingest(vec![ScanCandidate::new(addr(11), "render-node-01", true)]);

        shared.store.lock().get_mut("render-node-01").unwrap().status = NodeStatus::Offline;
        clock.advance(std::time::Duration::from_secs(12));

        let published = Arc::new(AtomicUsize::new(0));
        let p = published.clone();
        let _sub = shared.bus.subscribe(move |_| {
            p.fetch_add(1, Ordering::SeqCst);
        });

        let report = feed.ingest(vec![ScanCandidate::new(addr(11), "render-node-01", true)]);
        assert_eq!(report.refreshed, vec!["render-node-01"]);
        assert!(report.discovered.is_empty());

        let store = shared.store.lock();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("render-node-01").unwrap().status, NodeStatus::Online);
        assert_eq!(
            store.heartbeats().last_contact("render-node-01"),
            Some(clock.now())
        );
        assert_eq!(published.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hostname_collision_gets_suffix() {
        let shared = shared(Arc::new(ManualClock::default()));
        let feed = DiscoveryFeed::new(shared.clone(), Arc::new(StaticCandidates::default()));
        let report = feed.ingest(vec![
            ScanCandidate::new(addr(11), "render", true),
            ScanCandidate::new(addr(12), "render", true),
        ]);
        assert_eq!(report.discovered, vec!["render", "render-1"]);
        assert_eq!(shared.store.lock().len(), 2);
    }

    #[tokio::test]
    async fn overlapping_scan_is_skipped() {
        let shared = shared(Arc::new(ManualClock::default()));
        let feed = DiscoveryFeed::new(shared, Arc::new(StaticCandidates::default()));

        let held = ScanGuard::acquire(&feed.scanning).unwrap();
        assert!(feed.is_scanning());
        assert_eq!(feed.scan().await, ScanOutcome::Skipped);
        drop(held);

        assert!(matches!(feed.scan().await, ScanOutcome::Completed(_)));
        assert!(!feed.is_scanning());
    }

    struct FailingSource;

    #[async_trait]
    impl CandidateSource for FailingSource {
        async fn scan(&self) -> rf_domain::Result<Vec<ScanCandidate>> {
            Err(rf_domain::Error::Unreachable {
                address: "10.6.0.0/24".into(),
                reason: "probe socket closed".into(),
            })
        }
    }

    #[tokio::test]
    async fn source_failure_is_reported_not_raised() {
        let shared = shared(Arc::new(ManualClock::default()));
        let feed = DiscoveryFeed::new(shared.clone(), Arc::new(FailingSource));
        assert!(matches!(feed.scan().await, ScanOutcome::Failed(_)));
        assert!(!feed.is_scanning());
        assert!(shared.store.lock().is_empty());
    }
}
