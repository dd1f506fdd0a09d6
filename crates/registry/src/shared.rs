use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use rf_domain::config::{RegistryConfig, VpcConfig};

use crate::bus::{Snapshot, SubscriptionBus};
use crate::clock::Clock;
use crate::store::NodeStore;

/// Runtime-settable parameters.
#[derive(Debug, Clone, Default)]
pub(crate) struct Settings {
    pub registry: RegistryConfig,
    pub vpc: VpcConfig,
}

/// State shared by the discovery feed, heartbeat monitor and dispatcher.
///
/// Lock order: `store` before `rng`. Never publish while holding `store`.
pub(crate) struct Shared {
    pub store: Mutex<NodeStore>,
    pub bus: SubscriptionBus,
    pub clock: Arc<dyn Clock>,
    pub rng: Mutex<Box<dyn RngCore + Send>>,
    pub settings: RwLock<Settings>,
}

impl Shared {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Snapshot the store and hand it to every subscriber.
    pub fn publish(&self) -> Snapshot {
        let records = self.store.lock().list();
        self.bus.publish(records)
    }

    #[cfg(test)]
    pub fn for_tests(clock: Arc<dyn Clock>, seed: u64) -> Arc<Self> {
        use rand::SeedableRng;
        Arc::new(Self {
            store: Mutex::new(NodeStore::new()),
            bus: SubscriptionBus::new(),
            clock,
            rng: Mutex::new(Box::new(rand::rngs::StdRng::seed_from_u64(seed))),
            settings: RwLock::new(Settings::default()),
        })
    }
}
