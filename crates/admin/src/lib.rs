//! Admin node: HTTP front for the render node registry.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod directory;
pub mod error;
pub mod events;
pub mod probe;
pub mod render_client;
pub mod state;
pub mod telemetry;
