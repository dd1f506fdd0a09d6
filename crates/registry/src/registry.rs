//! The registry handle: owns the store, both periodic tasks, the command
//! dispatcher and the subscription bus.

use std::net::Ipv4Addr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use rf_domain::config::{ConfigError, ConfigSeverity, RegistryConfig, VpcConfig};
use rf_domain::node::{BulkOperation, NodeRecord, NodeStatus, RemoteConnection};
use rf_domain::{Error, Result};

use crate::bus::{Snapshot, Subscription, SubscriptionBus};
use crate::clock::{Clock, SystemClock};
use crate::discovery::{CandidateSource, DiscoveryFeed, ScanOutcome, StaticCandidates};
use crate::dispatch::{BulkOutcome, CommandDispatcher};
use crate::heartbeat::{HeartbeatMonitor, TickReport};
use crate::shared::{Settings, Shared};
use crate::store::NodeStore;

/// Counts and parameters reported by `GET /api/vpc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpcStatus {
    pub admin_address: Ipv4Addr,
    pub cidr: String,
    pub vpc_id: String,
    pub render_port: u16,
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub is_scanning: bool,
    pub is_running: bool,
}

pub struct NodeRegistryBuilder {
    registry: RegistryConfig,
    vpc: VpcConfig,
    source: Option<Arc<dyn CandidateSource>>,
    clock: Option<Arc<dyn Clock>>,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl NodeRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: RegistryConfig::default(),
            vpc: VpcConfig::default(),
            source: None,
            clock: None,
            rng: None,
        }
    }

    pub fn registry_config(mut self, cfg: RegistryConfig) -> Self {
        self.registry = cfg;
        self
    }

    pub fn vpc_config(mut self, cfg: VpcConfig) -> Self {
        self.vpc = cfg;
        self
    }

    /// Where discovery scans get their candidates. Defaults to an empty
    /// [`StaticCandidates`].
    pub fn source(mut self, source: Arc<dyn CandidateSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Seed the telemetry random source.
    pub fn seed(self, seed: u64) -> Self {
        self.rng(StdRng::seed_from_u64(seed))
    }

    /// Validate the settings and build a stopped registry.
    pub fn build(self) -> Result<NodeRegistry> {
        check(&self.registry, &self.vpc)?;

        let shared = Arc::new(Shared {
            store: Mutex::new(NodeStore::new()),
            bus: SubscriptionBus::new(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            rng: Mutex::new(
                self.rng
                    .unwrap_or_else(|| Box::new(StdRng::from_entropy())),
            ),
            settings: RwLock::new(Settings {
                registry: self.registry,
                vpc: self.vpc,
            }),
        });
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(StaticCandidates::default()));

        Ok(NodeRegistry {
            inner: Arc::new(Inner {
                discovery: Arc::new(DiscoveryFeed::new(shared.clone(), source)),
                heartbeat: HeartbeatMonitor::new(shared.clone()),
                dispatcher: CommandDispatcher::new(shared.clone()),
                shared,
                timers: Mutex::new(None),
            }),
        })
    }
}

impl Default for NodeRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Inner {
    shared: Arc<Shared>,
    discovery: Arc<DiscoveryFeed>,
    heartbeat: HeartbeatMonitor,
    dispatcher: CommandDispatcher,
    /// Present while the periodic tasks run.
    timers: Mutex<Option<CancellationToken>>,
}

impl Inner {
    fn heartbeat_tick(&self) -> TickReport {
        let report = self.heartbeat.tick();
        for id in &report.evicted {
            self.dispatcher.cancel_restart(id);
        }
        report
    }
}

/// Cheap-to-clone handle to one registry instance.
#[derive(Clone)]
pub struct NodeRegistry {
    inner: Arc<Inner>,
}

impl NodeRegistry {
    pub fn builder() -> NodeRegistryBuilder {
        NodeRegistryBuilder::new()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Start the discovery and heartbeat tasks. The first scan runs
    /// immediately; the first heartbeat check one period later.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::Config("registry start requires a running tokio runtime".into()))?;
        let mut timers = self.inner.timers.lock();
        if timers.is_some() {
            return Ok(());
        }

        let settings = self.inner.shared.settings();
        let token = CancellationToken::new();
        spawn_discovery_loop(
            &runtime,
            Arc::downgrade(&self.inner),
            settings.registry.scan_interval(),
            token.child_token(),
        );
        spawn_heartbeat_loop(
            &runtime,
            Arc::downgrade(&self.inner),
            settings.registry.heartbeat_interval(),
            token.child_token(),
        );
        *timers = Some(token);

        tracing::info!(
            cidr = %settings.vpc.cidr,
            scan_interval_ms = settings.registry.scan_interval_ms,
            heartbeat_interval_ms = settings.registry.heartbeat_interval_ms,
            "node detection started"
        );
        Ok(())
    }

    /// Stop both periodic tasks. The store and any pending restart
    /// completions are left as they are. Returns whether it was running.
    pub fn stop(&self) -> bool {
        match self.inner.timers.lock().take() {
            Some(token) => {
                token.cancel();
                tracing::info!("node detection stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.timers.lock().is_some()
    }

    /// Swap VPC and timing parameters. Running timers are restarted with
    /// the new periods; invalid settings leave everything unchanged.
    pub fn reconfigure(&self, vpc: VpcConfig, registry: RegistryConfig) -> Result<()> {
        check(&registry, &vpc)?;
        {
            let mut settings = self.inner.shared.settings.write();
            settings.vpc = vpc;
            settings.registry = registry;
        }
        tracing::info!("registry reconfigured");
        if self.stop() {
            self.start()?;
        }
        Ok(())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        self.inner.shared.settings().registry
    }

    pub fn vpc_config(&self) -> VpcConfig {
        self.inner.shared.settings().vpc
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Copy of every known record, ordered by id.
    pub fn list(&self) -> Vec<NodeRecord> {
        self.inner.shared.store.lock().list()
    }

    pub fn get(&self, id: &str) -> Option<NodeRecord> {
        self.inner.shared.store.lock().get(id).cloned()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.inner.shared.bus.subscribe(callback)
    }

    pub fn vpc_status(&self) -> VpcStatus {
        let settings = self.inner.shared.settings();
        let (total, online) = {
            let store = self.inner.shared.store.lock();
            let online = store.iter().filter(|r| r.status.is_online()).count();
            (store.len(), online)
        };
        VpcStatus {
            admin_address: settings.vpc.admin_address,
            cidr: settings.vpc.cidr,
            vpc_id: settings.vpc.vpc_id,
            render_port: settings.vpc.render_port,
            total,
            online,
            offline: total - online,
            is_scanning: self.inner.discovery.is_scanning(),
            is_running: self.is_running(),
        }
    }

    // ── Contact ─────────────────────────────────────────────────────

    /// Record contact from node `id`. An offline node comes back online.
    pub fn record_heartbeat(&self, id: &str) -> Result<()> {
        let now = self.inner.shared.now();
        let revived = {
            let mut store = self.inner.shared.store.lock();
            let record = store
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            let revived = record.status == NodeStatus::Offline;
            record.status = NodeStatus::Online;
            record.last_seen = now;
            store.heartbeats_mut().record(id, now);
            revived
        };
        tracing::trace!(node_id = %id, "heartbeat recorded");
        if revived {
            tracing::info!(node_id = %id, "node back online");
            self.inner.shared.publish();
        }
        Ok(())
    }

    /// Record contact from whichever node owns `address`. Returns its id.
    pub fn record_heartbeat_by_address(&self, address: Ipv4Addr) -> Option<String> {
        let id = self
            .inner
            .shared
            .store
            .lock()
            .find_by_address(address)
            .map(|r| r.id.clone())?;
        self.record_heartbeat(&id).ok()?;
        Some(id)
    }

    // ── Periodic work, on demand ────────────────────────────────────

    /// Run one discovery scan now, unless one is already in flight.
    pub async fn refresh(&self) -> ScanOutcome {
        self.inner.discovery.scan().await
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.discovery.is_scanning()
    }

    /// Run one heartbeat check now.
    pub fn heartbeat_tick(&self) -> TickReport {
        self.inner.heartbeat_tick()
    }

    // ── Commands ────────────────────────────────────────────────────

    pub fn freeze(&self, id: &str) -> Result<()> {
        self.inner.dispatcher.freeze(id)
    }

    pub fn restart(&self, id: &str) -> Result<()> {
        self.inner.dispatcher.restart(id)
    }

    pub fn connect_remote(&self, id: &str) -> Result<RemoteConnection> {
        self.inner.dispatcher.connect_remote(id)
    }

    pub fn get_details(&self, id: &str) -> Result<NodeRecord> {
        self.inner.dispatcher.get_details(id)
    }

    pub fn bulk_operation(&self, ids: &[String], op: BulkOperation) -> BulkOutcome {
        self.inner.dispatcher.bulk_operation(ids, op)
    }

    pub fn pending_restarts(&self) -> usize {
        self.inner.dispatcher.pending_restarts()
    }
}

/// Reject settings with any error-severity issue.
fn check(registry: &RegistryConfig, vpc: &VpcConfig) -> Result<()> {
    let issues: Vec<ConfigError> = registry
        .validate()
        .into_iter()
        .chain(vpc.validate())
        .filter(|e| e.severity == ConfigSeverity::Error)
        .collect();
    if issues.is_empty() {
        return Ok(());
    }
    let message = issues
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::Config(message))
}

fn spawn_discovery_loop(
    runtime: &Handle,
    inner: Weak<Inner>,
    period: Duration,
    cancel: CancellationToken,
) {
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(inner) = inner.upgrade() else { break };
                    // Scans may outlive a tick; the feed skips overlapping ones.
                    let feed = inner.discovery.clone();
                    tokio::spawn(async move {
                        if let ScanOutcome::Completed(report) = feed.scan().await {
                            tracing::debug!(
                                discovered = report.discovered.len(),
                                refreshed = report.refreshed.len(),
                                "scan completed"
                            );
                        }
                    });
                }
            }
        }
        tracing::debug!("discovery loop exited");
    });
}

fn spawn_heartbeat_loop(
    runtime: &Handle,
    inner: Weak<Inner>,
    period: Duration,
    cancel: CancellationToken,
) {
    let Some(first) = Instant::now().checked_add(period) else {
        tracing::error!(?period, "heartbeat period out of range, heartbeat loop not started");
        return;
    };
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(inner) = inner.upgrade() else { break };
                    inner.heartbeat_tick();
                }
            }
        }
        tracing::debug!("heartbeat loop exited");
    });
}
