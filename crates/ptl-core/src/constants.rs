//! Core constants for the putlight controller.
//!
//! This module gathers the values that describe the reference hardware (two
//! CH423 expanders with 8 GPIO and 16 GPO lines each), the scanner record
//! framing, and the default timing of the session and blink loops.
//!
//! # Pin Layout
//!
//! Output lines are addressed by a flat index across both buses:
//!
//! | Range | Bus | Group | Offset |
//! |-------|-----|-------|--------|
//! | `[0, 8)` | 0 | GPIO | `idx` |
//! | `[8, 24)` | 0 | GPO | `idx - 8` |
//! | `[24, 32)` | 1 | GPIO | `idx - 24` |
//! | `[32, 48)` | 1 | GPO | `idx - 32` |
//! | `48` | all | all | broadcast |
//!
//! # Usage
//!
//! ```
//! use ptl_core::constants::*;
//!
//! assert_eq!(TOTAL_PINS, BUS_COUNT * LINES_PER_CHIP);
//! assert_eq!(ALL_PINS, 48);
//! ```

// ============================================================================
// Scanner Records
// ============================================================================

/// Terminator byte closing one access-code record (carriage return).
///
/// The scanner streams a code as arbitrary notification chunks and ends it
/// with this byte.
///
/// # Examples
///
/// ```
/// use ptl_core::constants::RECORD_SENTINEL;
///
/// let chunk = b"0412AB\r";
/// assert_eq!(chunk.last(), Some(&RECORD_SENTINEL));
/// ```
pub const RECORD_SENTINEL: u8 = 13;

/// Capacity of the notification reassembly buffer in bytes.
///
/// A record that grows past this size is truncated to `SCAN_BUFFER_CAPACITY - 1`
/// bytes of payload.
pub const SCAN_BUFFER_CAPACITY: usize = 100;

// ============================================================================
// Peer Devices
// ============================================================================

/// Maximum number of discovered peer devices kept for status reporting.
pub const MAX_PEER_DEVICES: usize = 20;

// ============================================================================
// Expander Geometry
// ============================================================================

/// Number of expander buses probed at startup.
pub const BUS_COUNT: usize = 2;

/// Bidirectional GPIO lines per expander chip.
pub const GPIO_LINES_PER_CHIP: usize = 8;

/// Output-only GPO lines per expander chip.
pub const GPO_LINES_PER_CHIP: usize = 16;

/// Lines per expander chip across both groups.
pub const LINES_PER_CHIP: usize = GPIO_LINES_PER_CHIP + GPO_LINES_PER_CHIP;

/// Addressable lines across every bus of the reference hardware.
pub const TOTAL_PINS: usize = BUS_COUNT * LINES_PER_CHIP;

/// Pin index that addresses every line on every present bus.
pub const ALL_PINS: u16 = TOTAL_PINS as u16;

// ============================================================================
// Session Timing
// ============================================================================

/// Interval between reconnect polls while the session is not connected.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Duration of one discovery scan.
pub const DEFAULT_SCAN_DURATION_MS: u64 = 5_000;

/// Time box for a single connection attempt with one address kind.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// Blink Timing
// ============================================================================

/// Total length of a blink job before lines are blanked again.
pub const DEFAULT_BLINK_DURATION_MS: u64 = 10_000;

/// Length of one on/off cycle.
pub const DEFAULT_BLINK_PERIOD_MS: u64 = 1_000;

/// Lit time within one cycle.
pub const DEFAULT_BLINK_FILL_MS: u64 = 500;

/// Cadence of the blink scheduler tick.
pub const DEFAULT_BLINK_TICK_MS: u64 = 10;

// ============================================================================
// Status Reporting
// ============================================================================

/// Interval between status payloads.
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 10_000;

/// Number of entries retained in the access log ring.
pub const ACCESS_LOG_CAPACITY: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_geometry() {
        assert_eq!(LINES_PER_CHIP, 24);
        assert_eq!(TOTAL_PINS, 48);
        assert_eq!(ALL_PINS as usize, TOTAL_PINS);
    }

    #[test]
    fn test_blink_defaults_are_consistent() {
        assert!(DEFAULT_BLINK_FILL_MS < DEFAULT_BLINK_PERIOD_MS);
        assert!(DEFAULT_BLINK_PERIOD_MS < DEFAULT_BLINK_DURATION_MS);
    }
}
