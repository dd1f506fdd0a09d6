use crate::node::NodeOperation;

/// Shared error type used across all renderfleet crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("{operation} not permitted on node {id}")]
    NotPermitted { id: String, operation: NodeOperation },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unreachable {address}: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("config: {0}")]
    Config(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, Error>;
