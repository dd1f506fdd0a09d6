//! Render node liveness registry.
//!
//! A [`NodeRegistry`] owns the node record store, two periodic tasks
//! (discovery scan and heartbeat check), the command dispatcher and the
//! subscription bus. Clock and random source are injected so the whole
//! lifecycle can be driven deterministically in tests.

pub mod bus;
pub mod catalog;
pub mod clock;
pub mod discovery;
pub mod dispatch;
pub mod heartbeat;
pub mod registry;
pub mod store;
pub mod telemetry;

mod shared;

pub use bus::{Snapshot, Subscription, SubscriptionBus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use discovery::{CandidateSource, ScanCandidate, ScanOutcome, ScanReport, StaticCandidates};
pub use dispatch::BulkOutcome;
pub use heartbeat::TickReport;
pub use registry::{NodeRegistry, NodeRegistryBuilder, VpcStatus};
