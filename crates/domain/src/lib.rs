//! Shared types for the renderfleet crates: node records, address helpers,
//! configuration, errors and structured trace events.

pub mod address;
pub mod config;
pub mod error;
pub mod node;
pub mod trace;

pub use error::{Error, Result};
