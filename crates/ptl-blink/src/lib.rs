//! Blink scheduling for the put-to-light controller.
//!
//! [`BlinkScheduler`] owns the [`PinExpanderBus`](ptl_hardware::PinExpanderBus)
//! and runs one blink job at a time. Other tasks start jobs through a
//! [`BlinkHandle`].

pub mod config;
pub mod scheduler;

pub use config::BlinkConfig;
pub use scheduler::{BlinkHandle, BlinkRequest, BlinkScheduler, BlinkState};
