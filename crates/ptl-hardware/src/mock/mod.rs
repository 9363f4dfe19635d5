//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware.

pub mod expander;
pub mod radio;

// Re-export commonly used types
pub use expander::{ExpanderWrite, MockExpander, MockExpanderHandle};
pub use radio::{MockRadio, MockRadioHandle};
