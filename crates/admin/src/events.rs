//! Bridges registry snapshots onto a broadcast channel for SSE clients.

use parking_lot::Mutex;
use rf_registry::{NodeRegistry, Snapshot, Subscription};
use tokio::sync::broadcast;

pub struct SnapshotBridge {
    tx: broadcast::Sender<Snapshot>,
    subscription: Mutex<Option<Subscription>>,
}

impl SnapshotBridge {
    pub fn attach(registry: &NodeRegistry, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let sender = tx.clone();
        let subscription = registry.subscribe(move |snapshot| {
            // No receivers is the normal idle state.
            let _ = sender.send(snapshot.clone());
        });
        Self {
            tx,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Stop forwarding registry publishes.
    pub fn detach(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
    }
}
