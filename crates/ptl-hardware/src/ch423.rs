//! CH423 I/O expander driver.
//!
//! The CH423 has no conventional register map: every command is encoded in
//! the I2C address byte and carries a single data byte.
//!
//! | Command | 7-bit address | Data |
//! |---------|---------------|------|
//! | System arguments | `0x24` | `IO_OE`, `OD_EN`, ... |
//! | GPO 0-7 output | `0x22` | one bit per line |
//! | GPO 8-15 output | `0x23` | one bit per line |
//! | GPIO output | `0x30` | one bit per line |
//!
//! The driver keeps shadow copies of the output registers so a single-line
//! write can be issued as one register write.

use crate::{
    HardwareError, Result,
    traits::ExpanderChip,
    types::{BusLayout, LineGroup},
};
use embedded_hal::i2c::{Error as _, I2c};
use ptl_core::LineLevel;
use tracing::debug;

/// System arguments command, also used as the presence probe address.
pub const CMD_SET_SYSTEM_ARGS: u8 = 0x48 >> 1;

/// Output command for GPO 0-7.
pub const CMD_SET_GPO_L: u8 = 0x44 >> 1;

/// Output command for GPO 8-15.
pub const CMD_SET_GPO_H: u8 = 0x46 >> 1;

/// Output command for GPIO 0-7.
pub const CMD_SET_GPIO: u8 = 0x60 >> 1;

/// System argument bit enabling GPIO outputs.
const SYS_IO_OE: u8 = 0x01;

/// System argument bit selecting open-drain GPO outputs; clear for push-pull.
const SYS_OD_EN: u8 = 0x10;

/// CH423 expander on an I2C bus.
///
/// # Examples
///
/// ```ignore
/// use ptl_hardware::ch423::Ch423;
/// use ptl_hardware::bus::BusSlot;
///
/// let slot = BusSlot::probe(Ch423::new(i2c0, "wire0")).await;
/// ```
#[derive(Debug)]
pub struct Ch423<I2C> {
    i2c: I2C,
    label: &'static str,
    gpio: u8,
    gpo: u16,
}

impl<I2C: I2c> Ch423<I2C> {
    /// Wrap an I2C bus. `label` names the bus in logs and errors.
    pub fn new(i2c: I2C, label: &'static str) -> Self {
        Self {
            i2c,
            label,
            gpio: 0xFF,
            gpo: 0xFFFF,
        }
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn command(&mut self, command: u8, data: u8) -> Result<()> {
        self.i2c
            .write(command, &[data])
            .map_err(|e| HardwareError::bus(self.label, format!("{:?}", e.kind())))
    }

    fn flush_gpio(&mut self) -> Result<()> {
        self.command(CMD_SET_GPIO, self.gpio)
    }

    fn flush_gpo_low(&mut self) -> Result<()> {
        self.command(CMD_SET_GPO_L, self.gpo.to_le_bytes()[0])
    }

    fn flush_gpo_high(&mut self) -> Result<()> {
        self.command(CMD_SET_GPO_H, self.gpo.to_le_bytes()[1])
    }
}

impl<I2C> ExpanderChip for Ch423<I2C>
where
    I2C: I2c + Send + Sync,
{
    async fn probe(&mut self) -> Result<bool> {
        let present = self.i2c.write(CMD_SET_SYSTEM_ARGS, &[]).is_ok();
        if !present {
            debug!(bus = self.label, "CH423 did not acknowledge probe");
        }
        Ok(present)
    }

    async fn configure(&mut self) -> Result<()> {
        self.command(CMD_SET_SYSTEM_ARGS, SYS_IO_OE & !SYS_OD_EN)?;
        self.flush_gpio()?;
        self.flush_gpo_low()?;
        self.flush_gpo_high()
    }

    async fn write_line(&mut self, group: LineGroup, offset: u8, level: LineLevel) -> Result<()> {
        match group {
            LineGroup::Gpio => {
                if offset >= 8 {
                    return Err(HardwareError::bus(
                        self.label,
                        format!("GPIO offset {offset} out of range"),
                    ));
                }
                let mask = 1u8 << offset;
                self.gpio = if level.is_high() {
                    self.gpio | mask
                } else {
                    self.gpio & !mask
                };
                self.flush_gpio()
            }
            LineGroup::Gpo => {
                if offset >= 16 {
                    return Err(HardwareError::bus(
                        self.label,
                        format!("GPO offset {offset} out of range"),
                    ));
                }
                let mask = 1u16 << offset;
                self.gpo = if level.is_high() {
                    self.gpo | mask
                } else {
                    self.gpo & !mask
                };
                if offset < 8 {
                    self.flush_gpo_low()
                } else {
                    self.flush_gpo_high()
                }
            }
        }
    }

    async fn write_group(&mut self, group: LineGroup, level: LineLevel) -> Result<()> {
        match group {
            LineGroup::Gpio => {
                self.gpio = level.fill_byte();
                self.flush_gpio()
            }
            LineGroup::Gpo => {
                self.gpo = u16::from_le_bytes([level.fill_byte(); 2]);
                self.flush_gpo_low()?;
                self.flush_gpo_high()
            }
        }
    }

    fn layout(&self) -> BusLayout {
        BusLayout::ch423()
    }
}
