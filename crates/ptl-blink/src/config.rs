//! Blink pattern timing.

use ptl_core::constants::{
    DEFAULT_BLINK_DURATION_MS, DEFAULT_BLINK_FILL_MS, DEFAULT_BLINK_PERIOD_MS,
    DEFAULT_BLINK_TICK_MS,
};
use ptl_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Timing of one blink job, in milliseconds.
///
/// Within each `period` the pin is lit for `fill` and dark for the rest.
///
/// # Examples
///
/// ```
/// use ptl_blink::BlinkConfig;
///
/// let config = BlinkConfig::default();
/// assert_eq!(config.dark_ms(), 500);
///
/// assert!(BlinkConfig::new(1_000, 200, 300).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkConfig {
    /// Total length of a job.
    pub duration_ms: u64,

    /// Length of one lit-then-dark cycle.
    pub period_ms: u64,

    /// Lit part of each cycle.
    pub fill_ms: u64,

    /// Cadence at which the scheduler is ticked.
    pub tick_ms: u64,
}

impl BlinkConfig {
    /// Build a validated configuration with the default tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTiming`] if `fill_ms` exceeds `period_ms` or
    /// the period is zero.
    pub fn new(duration_ms: u64, period_ms: u64, fill_ms: u64) -> Result<Self> {
        let config = Self {
            duration_ms,
            period_ms,
            fill_ms,
            tick_ms: DEFAULT_BLINK_TICK_MS,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_tick(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms.max(1);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.period_ms == 0 {
            return Err(Error::InvalidTiming("period must be positive".into()));
        }
        if self.fill_ms > self.period_ms {
            return Err(Error::InvalidTiming(format!(
                "fill {}ms exceeds period {}ms",
                self.fill_ms, self.period_ms
            )));
        }
        Ok(())
    }

    /// Dark part of each cycle; zero when `fill_ms` exceeds the period.
    pub fn dark_ms(&self) -> u64 {
        self.period_ms.saturating_sub(self.fill_ms)
    }
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_BLINK_DURATION_MS,
            period_ms: DEFAULT_BLINK_PERIOD_MS,
            fill_ms: DEFAULT_BLINK_FILL_MS,
            tick_ms: DEFAULT_BLINK_TICK_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = BlinkConfig::default();
        assert_eq!(config.duration_ms, 10_000);
        assert_eq!(config.period_ms, 1_000);
        assert_eq!(config.fill_ms, 500);
        assert_eq!(config.tick_ms, 10);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(1000, 1000, true)]
    #[case(1000, 0, true)]
    #[case(1000, 1001, false)]
    #[case(0, 0, false)]
    fn test_validate(#[case] period: u64, #[case] fill: u64, #[case] valid: bool) {
        assert_eq!(BlinkConfig::new(10_000, period, fill).is_ok(), valid);
    }

    #[test]
    fn test_zero_tick_raised() {
        assert_eq!(BlinkConfig::default().with_tick(0).tick_ms, 1);
    }

    #[test]
    fn test_deserialize() {
        let config: BlinkConfig = serde_json::from_str(
            r#"{"duration_ms": 3000, "period_ms": 600, "fill_ms": 100, "tick_ms": 5}"#,
        )
        .unwrap();
        assert_eq!(config.dark_ms(), 500);
    }

    #[test]
    fn test_unvalidated_fill_past_period_has_no_dark_phase() {
        let config: BlinkConfig = serde_json::from_str(
            r#"{"duration_ms": 3000, "period_ms": 100, "fill_ms": 200, "tick_ms": 10}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
        assert_eq!(config.dark_ms(), 0);
    }
}
