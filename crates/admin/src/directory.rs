//! Addresses of render nodes that registered themselves over HTTP.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct RenderDirectory {
    addresses: RwLock<BTreeSet<Ipv4Addr>>,
}

impl RenderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the address was already present.
    pub fn add(&self, address: Ipv4Addr) -> bool {
        let added = self.addresses.write().insert(address);
        if added {
            tracing::info!(address = %address, "render node registered");
        }
        added
    }

    pub fn list(&self) -> Vec<Ipv4Addr> {
        self.addresses.read().iter().copied().collect()
    }
}
