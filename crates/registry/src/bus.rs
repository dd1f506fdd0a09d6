//! Snapshot fan-out to observers (dashboard SSE, CLI, tests).
//!
//! Callbacks run synchronously on the publishing task and all receive the
//! same [`Snapshot`] for a given publish. There is no backlog: a late
//! subscriber only sees publishes that happen after it registered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rf_domain::node::NodeRecord;

/// Full list of records at the instant of a publish.
pub type Snapshot = Arc<Vec<NodeRecord>>;

type Callback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, Callback)>>,
}

#[derive(Default, Clone)]
pub struct SubscriptionBus {
    inner: Arc<BusInner>,
}

impl SubscriptionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every future publish.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .push((id, Arc::new(callback)));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every subscriber with `records` and return the shared snapshot.
    pub fn publish(&self, records: Vec<NodeRecord>) -> Snapshot {
        let snapshot: Snapshot = Arc::new(records);
        // Clone the callback list so a callback may (un)subscribe re-entrantly.
        let callbacks: Vec<Callback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(&snapshot);
        }
        tracing::trace!(records = snapshot.len(), "snapshot published");
        snapshot
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Handle returned by [`SubscriptionBus::subscribe`].
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
