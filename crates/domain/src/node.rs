//! Render node records as known to the admin registry.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness status derived from the heartbeat table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Online,
    Offline,
}

impl NodeStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// An operation the admin node can issue against a render node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeOperation {
    Freeze,
    Restart,
    Remote,
}

impl NodeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Freeze => "freeze",
            Self::Restart => "restart",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for NodeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of operations that can be applied in bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOperation {
    Freeze,
    Restart,
}

impl From<BulkOperation> for NodeOperation {
    fn from(op: BulkOperation) -> Self {
        match op {
            BulkOperation::Freeze => NodeOperation::Freeze,
            BulkOperation::Restart => NodeOperation::Restart,
        }
    }
}

impl FromStr for BulkOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "freeze" => Ok(Self::Freeze),
            "restart" => Ok(Self::Restart),
            other => Err(format!("unsupported bulk operation: {other}")),
        }
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        NodeOperation::from(*self).fmt(f)
    }
}

/// GPU descriptor. All fields are display strings (`"24GB"`, `"65°C"`, `"45%"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub name: String,
    pub memory: String,
    pub temperature: String,
    pub utilization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub cpu: String,
    pub ram: String,
    pub uptime: String,
}

/// How the node is attached to the admin node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Address of the owning admin node.
    pub admin_address: Ipv4Addr,
    pub connected_at: DateTime<Utc>,
    pub heartbeat_interval_ms: u64,
    pub vpc_id: String,
    pub subnet: String,
}

/// Capability flags plus the last operation applied to the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operations {
    pub can_freeze: bool,
    pub can_restart: bool,
    pub can_remote: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<NodeOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_time: Option<DateTime<Utc>>,
}

impl Default for Operations {
    fn default() -> Self {
        Self {
            can_freeze: true,
            can_restart: true,
            can_remote: true,
            last_operation: None,
            operation_time: None,
        }
    }
}

impl Operations {
    /// Whether the capability flag for `op` is set.
    pub fn permits(&self, op: NodeOperation) -> bool {
        match op {
            NodeOperation::Freeze => self.can_freeze,
            NodeOperation::Restart => self.can_restart,
            NodeOperation::Remote => self.can_remote,
        }
    }

    /// Stamp `op` as the most recent operation.
    pub fn stamp(&mut self, op: NodeOperation, at: DateTime<Utc>) {
        self.last_operation = Some(op);
        self.operation_time = Some(at);
    }
}

/// Utilisation figures shown on the dashboard. Percentages are whole numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub cpu_usage: u8,
    pub gpu_usage: u8,
    pub memory_usage_gb: f64,
    pub memory_usage_percent: u8,
    pub disk_usage: u8,
}

/// One render machine as known to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub server_name: String,
    pub address: Ipv4Addr,
    pub region: String,
    /// Maximum concurrent render instances.
    pub capacity: u32,
    pub status: NodeStatus,
    pub last_seen: DateTime<Utc>,
    pub metrics: NodeMetrics,
    pub gpu: GpuInfo,
    pub system: SystemInfo,
    pub connection: ConnectionInfo,
    pub operations: Operations,
}

/// Where to reach a node for an interactive session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConnection {
    pub protocol: String,
    pub user: String,
    pub address: Ipv4Addr,
    pub port: u16,
}

impl RemoteConnection {
    pub fn ssh(address: Ipv4Addr) -> Self {
        Self {
            protocol: "ssh".into(),
            user: "admin".into(),
            address,
            port: 22,
        }
    }
}

impl fmt::Display for RemoteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}@{}:{}",
            self.protocol, self.user, self.address, self.port
        )
    }
}
