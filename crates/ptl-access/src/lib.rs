//! Access control data for the put-to-light controller.
//!
//! This crate holds everything the controller reads from or publishes to its
//! operators:
//!
//! - [`Config`] / [`ConfigStore`]: the controller configuration document.
//! - [`AccessTable`] / [`TableStore`]: which codes select which pin.
//! - [`AccessResolver`]: code → pin name → line index.
//! - [`AccessLog`]: ring of recently processed scans.
//! - [`Event`] / [`EventSink`]: status and scan events for management clients.

pub mod config;
pub mod events;
pub mod log;
pub mod resolver;
pub mod table;

pub use config::{Config, ConfigStore};
pub use events::{BroadcastSink, Event, EventSink, ScanPayload, StatusPayload};
pub use log::{AccessLog, LogEntry};
pub use resolver::{AccessResolver, Resolution};
pub use table::{AccessTable, TableEntry, TableStore};
