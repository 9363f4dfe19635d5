//! Shared vocabulary of the putlight controller.
//!
//! Every other crate speaks in these types: [`PinAddress`] for output lines,
//! [`LineLevel`] for what is driven onto them, [`ConnectionState`] and
//! [`PeerDevice`] for the scanner link, and the crate-wide [`Error`].

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Crate version, reported at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
