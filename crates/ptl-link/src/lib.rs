//! Wireless scanner link for the put-to-light controller.
//!
//! # Architecture
//!
//! ```text
//! SessionManager ──scan──► PeerDeviceRegistry
//!      │
//!      └─subscribe─► chunk pump ──► NotificationReassembler ──► records
//! ```
//!
//! The [`SessionManager`] runs in its own task and is driven by periodic
//! ticks. Records are consumed elsewhere through a clone of the
//! [`NotificationReassembler`]; the registry is read by status reporting
//! through a clone of [`PeerDeviceRegistry`].

pub mod reassembler;
pub mod registry;
pub mod session;

pub use reassembler::{ChunkOutcome, NotificationReassembler, ScanRecord};
pub use registry::PeerDeviceRegistry;
pub use session::{SESSION_TICK, SessionConfig, SessionHandle, SessionManager};
