//! Mock expander chip for testing and development.
//!
//! This module provides a simulated CH423-shaped expander that records every
//! write and keeps shadow registers, so tests can assert exactly which lines
//! were touched.

use crate::{
    HardwareError, Result,
    traits::ExpanderChip,
    types::{BusLayout, LineGroup},
};
use ptl_core::LineLevel;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// A single write observed by a mock expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpanderWrite {
    /// One line driven to a level.
    Line {
        group: LineGroup,
        offset: u8,
        level: LineLevel,
    },

    /// A whole group driven to a level.
    Group { group: LineGroup, level: LineLevel },
}

#[derive(Debug)]
struct MockExpanderState {
    present: bool,
    configured: bool,
    fail_writes: bool,
    gpio: u8,
    gpo: u16,
    writes: Vec<ExpanderWrite>,
}

impl MockExpanderState {
    fn new(present: bool) -> Self {
        Self {
            present,
            configured: false,
            fail_writes: false,
            gpio: 0xFF,
            gpo: 0xFFFF,
            writes: Vec::new(),
        }
    }
}

fn lock(state: &Mutex<MockExpanderState>) -> MutexGuard<'_, MockExpanderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock expander chip.
///
/// # Examples
///
/// ```
/// use ptl_hardware::mock::{ExpanderWrite, MockExpander};
/// use ptl_hardware::traits::ExpanderChip;
/// use ptl_hardware::types::LineGroup;
/// use ptl_core::LineLevel;
///
/// #[tokio::main]
/// async fn main() -> ptl_hardware::Result<()> {
///     let (mut chip, handle) = MockExpander::new();
///
///     chip.write_line(LineGroup::Gpo, 3, LineLevel::Low).await?;
///
///     assert_eq!(handle.line_level(LineGroup::Gpo, 3), LineLevel::Low);
///     assert_eq!(
///         handle.writes(),
///         vec![ExpanderWrite::Line { group: LineGroup::Gpo, offset: 3, level: LineLevel::Low }]
///     );
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockExpander {
    state: Arc<Mutex<MockExpanderState>>,
    name: String,
}

impl MockExpander {
    /// Create a mock chip that answers the presence probe.
    pub fn new() -> (Self, MockExpanderHandle) {
        Self::with_presence("Mock CH423", true)
    }

    /// Create a mock chip that does not answer the presence probe.
    pub fn absent() -> (Self, MockExpanderHandle) {
        Self::with_presence("Mock CH423", false)
    }

    /// Create a mock chip with a custom name and presence.
    pub fn with_presence(name: impl Into<String>, present: bool) -> (Self, MockExpanderHandle) {
        let state = Arc::new(Mutex::new(MockExpanderState::new(present)));

        let chip = Self {
            state: Arc::clone(&state),
            name: name.into(),
        };

        (chip, MockExpanderHandle { state })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for MockExpander {
    fn default() -> Self {
        Self::new().0
    }
}

impl ExpanderChip for MockExpander {
    async fn probe(&mut self) -> Result<bool> {
        Ok(lock(&self.state).present)
    }

    async fn configure(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.present {
            return Err(HardwareError::initialization_failed(format!(
                "{} does not answer",
                self.name
            )));
        }
        state.configured = true;
        Ok(())
    }

    async fn write_line(&mut self, group: LineGroup, offset: u8, level: LineLevel) -> Result<()> {
        let width = match group {
            LineGroup::Gpio => self.layout().gpio_lines,
            LineGroup::Gpo => self.layout().gpo_lines,
        };
        if u16::from(offset) >= width {
            return Err(HardwareError::bus(
                &self.name,
                format!("{group} offset {offset} out of range"),
            ));
        }

        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(HardwareError::bus(&self.name, "NoAcknowledge"));
        }

        match group {
            LineGroup::Gpio => {
                let mask = 1u8 << offset;
                state.gpio = if level.is_high() {
                    state.gpio | mask
                } else {
                    state.gpio & !mask
                };
            }
            LineGroup::Gpo => {
                let mask = 1u16 << offset;
                state.gpo = if level.is_high() {
                    state.gpo | mask
                } else {
                    state.gpo & !mask
                };
            }
        }
        state.writes.push(ExpanderWrite::Line {
            group,
            offset,
            level,
        });
        trace!(chip = %self.name, %group, offset, ?level, "line write");
        Ok(())
    }

    async fn write_group(&mut self, group: LineGroup, level: LineLevel) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(HardwareError::bus(&self.name, "NoAcknowledge"));
        }

        match group {
            LineGroup::Gpio => state.gpio = level.fill_byte(),
            LineGroup::Gpo => state.gpo = u16::from_le_bytes([level.fill_byte(); 2]),
        }
        state.writes.push(ExpanderWrite::Group { group, level });
        trace!(chip = %self.name, %group, ?level, "group write");
        Ok(())
    }

    fn layout(&self) -> BusLayout {
        BusLayout::ch423()
    }
}

/// Handle for observing and steering a mock expander.
#[derive(Debug, Clone)]
pub struct MockExpanderHandle {
    state: Arc<Mutex<MockExpanderState>>,
}

impl MockExpanderHandle {
    /// Every write in the order it was issued.
    pub fn writes(&self) -> Vec<ExpanderWrite> {
        lock(&self.state).writes.clone()
    }

    /// Number of writes issued so far.
    pub fn write_count(&self) -> usize {
        lock(&self.state).writes.len()
    }

    /// Forget recorded writes; register contents are kept.
    pub fn clear_writes(&self) {
        lock(&self.state).writes.clear();
    }

    /// Current level of one line according to the shadow registers.
    pub fn line_level(&self, group: LineGroup, offset: u8) -> LineLevel {
        let state = lock(&self.state);
        let high = match group {
            LineGroup::Gpio => state.gpio & (1 << offset) != 0,
            LineGroup::Gpo => state.gpo & (1 << offset) != 0,
        };
        if high { LineLevel::High } else { LineLevel::Low }
    }

    /// Whether `configure` has run.
    pub fn is_configured(&self) -> bool {
        lock(&self.state).configured
    }

    /// Make subsequent writes fail with a bus error.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_expander_probe() {
        let (mut present, _) = MockExpander::new();
        let (mut absent, _) = MockExpander::absent();

        assert!(present.probe().await.unwrap());
        assert!(!absent.probe().await.unwrap());
        assert!(absent.configure().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_expander_line_write_updates_register() {
        let (mut chip, handle) = MockExpander::new();
        chip.configure().await.unwrap();
        assert!(handle.is_configured());

        chip.write_line(LineGroup::Gpio, 2, LineLevel::Low).await.unwrap();
        chip.write_line(LineGroup::Gpo, 15, LineLevel::Low).await.unwrap();

        assert_eq!(handle.line_level(LineGroup::Gpio, 2), LineLevel::Low);
        assert_eq!(handle.line_level(LineGroup::Gpio, 3), LineLevel::High);
        assert_eq!(handle.line_level(LineGroup::Gpo, 15), LineLevel::Low);
        assert_eq!(handle.write_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_expander_group_write() {
        let (mut chip, handle) = MockExpander::new();

        chip.write_group(LineGroup::Gpo, LineLevel::Low).await.unwrap();
        assert_eq!(handle.line_level(LineGroup::Gpo, 0), LineLevel::Low);
        assert_eq!(handle.line_level(LineGroup::Gpo, 15), LineLevel::Low);

        chip.write_group(LineGroup::Gpo, LineLevel::High).await.unwrap();
        assert_eq!(handle.line_level(LineGroup::Gpo, 9), LineLevel::High);
    }

    #[tokio::test]
    async fn test_mock_expander_rejects_out_of_range_offset() {
        let (mut chip, handle) = MockExpander::new();

        assert!(chip.write_line(LineGroup::Gpio, 8, LineLevel::Low).await.is_err());
        assert!(chip.write_line(LineGroup::Gpo, 16, LineLevel::Low).await.is_err());
        assert_eq!(handle.write_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_expander_failing_writes() {
        let (mut chip, handle) = MockExpander::new();
        handle.fail_writes(true);

        let result = chip.write_group(LineGroup::Gpio, LineLevel::High).await;
        assert!(matches!(result, Err(HardwareError::Bus { .. })));
        assert_eq!(handle.write_count(), 0);
    }
}
