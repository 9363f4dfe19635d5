//! Hardware abstraction layer for the put-to-light controller.
//!
//! This crate covers the two peripherals the controller talks to: the I/O
//! expanders that drive the indicator lights and the radio link to the
//! wireless barcode scanner. Both sit behind traits so the rest of the
//! workspace runs unchanged against mocks or real hardware.
//!
//! # Design Philosophy
//!
//! - **Async-first**: device operations are native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: the traits are not object-safe; [`devices`] provides
//!   concrete wrappers instead of `Box<dyn Trait>`.
//! - **Thread-safe**: every device is `Send + Sync` for use with Tokio.
//!
//! # Expanders
//!
//! An [`ExpanderChip`] exposes a GPIO and a GPO line group. The
//! [`PinExpanderBus`] combines two chips into one flat index and handles
//! broadcast writes and absent buses:
//!
//! ```no_run
//! use ptl_hardware::bus::{BusSlot, PinExpanderBus, WriteMode};
//! use ptl_hardware::traits::ExpanderChip;
//! use ptl_hardware::error::Result;
//! use ptl_core::{LineLevel, PinAddress};
//!
//! async fn light<C: ExpanderChip>(chip0: C, chip1: C, pin: u16) -> Result<()> {
//!     let mut bus = PinExpanderBus::new(BusSlot::probe(chip0).await, BusSlot::probe(chip1).await);
//!     bus.set_pin(PinAddress::new(pin), LineLevel::LIT, WriteMode::Normal).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Radio
//!
//! A [`RadioLink`] scans, connects and subscribes to a notifying
//! characteristic. The `ble` feature adds a backend on the host Bluetooth
//! stack via btleplug.
//!
//! # Mock Implementations
//!
//! [`mock`] provides scripted expanders and radios whose handles record
//! every write and let tests inject peers and notification chunks.
//!
//! [`ExpanderChip`]: traits::ExpanderChip
//! [`RadioLink`]: traits::RadioLink
//! [`PinExpanderBus`]: bus::PinExpanderBus

pub mod bus;
pub mod ch423;
pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

#[cfg(feature = "ble")]
pub mod btleplug;

// Re-export commonly used types for convenience
pub use bus::{BusSlot, PinExpanderBus, WriteMode};
pub use devices::{AnyExpander, AnyRadio};
pub use error::{HardwareError, Result};
pub use traits::{ExpanderChip, NotificationStream, RadioLink};
pub use types::{AddressKind, AdvertisedPeer, BusLayout, CharacteristicInfo, LineGroup};
