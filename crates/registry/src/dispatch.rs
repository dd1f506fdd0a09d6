//! Freeze, restart, remote-connect and bulk operations against node ids.
//!
//! Every operation checks existence and the matching capability flag
//! before touching the record, so a failed call leaves the store exactly
//! as it was. Restart completion runs as a deferred task that re-checks
//! the record when it fires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use rf_domain::node::{BulkOperation, NodeOperation, NodeRecord, NodeStatus, RemoteConnection};
use rf_domain::trace::TraceEvent;
use rf_domain::{Error, Result};

use crate::shared::Shared;
use crate::store::NodeStore;

/// Per-id result of a bulk operation, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub success: Vec<String>,
    pub failed: Vec<String>,
}

struct PendingRestart {
    ticket: u64,
    issued_at: DateTime<Utc>,
    cancel: CancellationToken,
}

/// Deferred restart completions keyed by node id. A newer restart for the
/// same id supersedes the older one.
#[derive(Default)]
struct RestartTable {
    next_ticket: AtomicU64,
    pending: Mutex<HashMap<String, PendingRestart>>,
}

impl RestartTable {
    /// Take the entry for `id` if it still belongs to `ticket`.
    fn claim(&self, id: &str, ticket: u64) -> Option<DateTime<Utc>> {
        let mut pending = self.pending.lock();
        if pending.get(id).map(|p| p.ticket) != Some(ticket) {
            return None;
        }
        pending.remove(id).map(|p| p.issued_at)
    }
}

pub struct CommandDispatcher {
    shared: Arc<Shared>,
    restarts: Arc<RestartTable>,
}

impl CommandDispatcher {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            restarts: Arc::new(RestartTable::default()),
        }
    }

    /// Clear `can_freeze` and stamp the operation.
    pub fn freeze(&self, id: &str) -> Result<()> {
        let now = self.shared.now();
        let result = {
            let mut store = self.shared.store.lock();
            permitted(&mut store, id, NodeOperation::Freeze).map(|record| {
                record.operations.can_freeze = false;
                record.operations.stamp(NodeOperation::Freeze, now);
            })
        };
        self.finish(id, NodeOperation::Freeze, result)
    }

    /// Take the node offline now and bring it back after the restart delay.
    ///
    /// Must be called from within a tokio runtime; the completion is a
    /// spawned task.
    pub fn restart(&self, id: &str) -> Result<()> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::Config("restart requires a running tokio runtime".into()))?;
        let now = self.shared.now();
        let result = {
            let mut store = self.shared.store.lock();
            permitted(&mut store, id, NodeOperation::Restart).map(|record| {
                record.status = NodeStatus::Offline;
                record.operations.stamp(NodeOperation::Restart, now);
            })
        };
        let result = self.finish(id, NodeOperation::Restart, result);
        if result.is_ok() {
            self.schedule_completion(&runtime, id, now);
        }
        result
    }

    /// Describe how to open a session on the node. Status is untouched.
    pub fn connect_remote(&self, id: &str) -> Result<RemoteConnection> {
        let now = self.shared.now();
        let result = {
            let mut store = self.shared.store.lock();
            permitted(&mut store, id, NodeOperation::Remote).map(|record| {
                record.operations.stamp(NodeOperation::Remote, now);
                RemoteConnection::ssh(record.address)
            })
        };
        self.finish(id, NodeOperation::Remote, result)
    }

    pub fn get_details(&self, id: &str) -> Result<NodeRecord> {
        self.shared
            .store
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Apply `op` to each id in turn. A failing id never stops the rest.
    pub fn bulk_operation(&self, ids: &[String], op: BulkOperation) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in ids {
            let result = match op {
                BulkOperation::Freeze => self.freeze(id),
                BulkOperation::Restart => self.restart(id),
            };
            match result {
                Ok(()) => outcome.success.push(id.clone()),
                Err(e) => {
                    tracing::debug!(node_id = %id, operation = %op, error = %e, "bulk item failed");
                    outcome.failed.push(id.clone());
                }
            }
        }

        tracing::info!(
            operation = %op,
            succeeded = outcome.success.len(),
            failed = outcome.failed.len(),
            "bulk operation finished"
        );
        TraceEvent::BulkOperationCompleted {
            operation: op.to_string(),
            succeeded: outcome.success.len(),
            failed: outcome.failed.len(),
        }
        .emit();
        outcome
    }

    /// Drop the pending restart completion for `id`, if any.
    pub fn cancel_restart(&self, id: &str) -> bool {
        match self.restarts.pending.lock().remove(id) {
            Some(pending) => {
                pending.cancel.cancel();
                tracing::debug!(node_id = %id, "pending restart cancelled");
                true
            }
            None => false,
        }
    }

    pub fn pending_restarts(&self) -> usize {
        self.restarts.pending.lock().len()
    }

    fn finish<T>(&self, id: &str, op: NodeOperation, result: Result<T>) -> Result<T> {
        TraceEvent::NodeOperation {
            node_id: id.to_string(),
            operation: op.to_string(),
            success: result.is_ok(),
        }
        .emit();
        match &result {
            Ok(_) => {
                tracing::info!(node_id = %id, operation = %op, "operation applied");
                self.shared.publish();
            }
            Err(e) => tracing::warn!(node_id = %id, operation = %op, error = %e, "operation rejected"),
        }
        result
    }

    fn schedule_completion(&self, runtime: &Handle, id: &str, issued_at: DateTime<Utc>) {
        let delay = self.shared.settings().registry.restart_delay();
        let ticket = self.restarts.next_ticket.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let previous = self.restarts.pending.lock().insert(
            id.to_string(),
            PendingRestart {
                ticket,
                issued_at,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let shared = self.shared.clone();
        let restarts = self.restarts.clone();
        let id = id.to_string();
        runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(issued_at) = restarts.claim(&id, ticket) {
                        complete_restart(&shared, &id, issued_at);
                    }
                }
            }
        });
    }
}

fn permitted<'a>(
    store: &'a mut NodeStore,
    id: &str,
    op: NodeOperation,
) -> Result<&'a mut NodeRecord> {
    let record = store
        .get_mut(id)
        .ok_or_else(|| Error::NotFound(id.to_string()))?;
    if !record.operations.permits(op) {
        return Err(Error::NotPermitted {
            id: id.to_string(),
            operation: op,
        });
    }
    Ok(record)
}

/// Bring a restarted node back, unless it was evicted or frozen since.
fn complete_restart(shared: &Shared, id: &str, issued_at: DateTime<Utc>) {
    let now = shared.now();
    let revived = {
        let mut store = shared.store.lock();
        match store.get_mut(id) {
            None => {
                tracing::debug!(node_id = %id, "node gone before restart completed");
                false
            }
            Some(record) if frozen_since(record, issued_at) => {
                tracing::debug!(node_id = %id, "node frozen during restart, leaving as is");
                false
            }
            Some(record) => {
                record.status = NodeStatus::Online;
                record.operations.can_freeze = true;
                record.last_seen = now;
                store.heartbeats_mut().record(id, now);
                true
            }
        }
    };
    if revived {
        tracing::info!(node_id = %id, "node restarted");
        shared.publish();
    }
}

fn frozen_since(record: &NodeRecord, issued_at: DateTime<Utc>) -> bool {
    record.operations.last_operation == Some(NodeOperation::Freeze)
        && record
            .operations
            .operation_time
            .is_some_and(|at| at >= issued_at)
}
