//! In-memory node record store and heartbeat table.

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use rf_domain::node::NodeRecord;

/// Last network-level contact per node id.
///
/// Kept apart from [`NodeRecord::status`] so that contact and declared
/// status stay decoupled; this table is what eviction and the offline
/// transition are decided on.
#[derive(Debug, Default)]
pub struct HeartbeatTable {
    contacts: HashMap<String, DateTime<Utc>>,
}

impl HeartbeatTable {
    pub fn record(&mut self, node_id: &str, at: DateTime<Utc>) {
        self.contacts.insert(node_id.to_owned(), at);
    }

    pub fn last_contact(&self, node_id: &str) -> Option<DateTime<Utc>> {
        self.contacts.get(node_id).copied()
    }

    pub fn forget(&mut self, node_id: &str) {
        self.contacts.remove(node_id);
    }

    /// Time since the last contact, falling back to `fallback` (the
    /// node's connect time) when no heartbeat has been recorded.
    pub fn silence(
        &self,
        node_id: &str,
        fallback: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> chrono::Duration {
        now.signed_duration_since(self.last_contact(node_id).unwrap_or(fallback))
    }
}

/// Known nodes keyed by identifier.
#[derive(Debug, Default)]
pub struct NodeStore {
    records: BTreeMap<String, NodeRecord>,
    heartbeats: HeartbeatTable,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by identifier.
    pub fn upsert(&mut self, record: NodeRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeRecord> {
        self.records.get(node_id)
    }

    pub(crate) fn get_mut(&mut self, node_id: &str) -> Option<&mut NodeRecord> {
        self.records.get_mut(node_id)
    }

    pub fn find_by_address(&self, address: Ipv4Addr) -> Option<&NodeRecord> {
        self.records.values().find(|r| r.address == address)
    }

    /// Copy of every record, ordered by id.
    pub fn list(&self) -> Vec<NodeRecord> {
        self.records.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Remove a record together with its heartbeat entry.
    pub fn remove(&mut self, node_id: &str) -> Option<NodeRecord> {
        self.heartbeats.forget(node_id);
        self.records.remove(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.records.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn heartbeats(&self) -> &HeartbeatTable {
        &self.heartbeats
    }

    pub(crate) fn heartbeats_mut(&mut self) -> &mut HeartbeatTable {
        &mut self.heartbeats
    }

    /// Silence of `node_id` as of `now`, or `None` for unknown ids.
    pub fn silence(&self, node_id: &str, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let record = self.records.get(node_id)?;
        Some(
            self.heartbeats
                .silence(node_id, record.connection.connected_at, now),
        )
    }
}
