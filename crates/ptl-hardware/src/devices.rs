//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn ExpanderChip>`
//! is not available. These enums give the binary one concrete type per
//! device family while keeping mock and real backends interchangeable.
//!
//! # Examples
//!
//! ```
//! use ptl_hardware::devices::AnyRadio;
//! use ptl_hardware::mock::MockRadio;
//!
//! let (radio, _handle) = MockRadio::new();
//! let any_radio = AnyRadio::Mock(radio);
//! ```

use crate::Result;
use crate::ch423::Ch423;
use crate::mock::{MockExpander, MockRadio};
use crate::traits::{ExpanderChip, NotificationStream, RadioLink};
use crate::types::{AddressKind, AdvertisedPeer, BusLayout, CharacteristicInfo, LineGroup};
use embedded_hal::i2c::I2c;
use ptl_core::LineLevel;
use std::time::Duration;
use uuid::Uuid;

#[cfg(feature = "ble")]
use crate::btleplug::BtleplugRadio;

/// Enum wrapper for expander chip dispatch.
///
/// `I2C` is the bus type of the real driver. Builds that only ever use the
/// mock can name any [`I2c`] implementation here.
///
/// # Examples
///
/// ```
/// use ptl_hardware::devices::AnyExpander;
/// use ptl_hardware::traits::ExpanderChip;
/// use ptl_hardware::mock::MockExpander;
///
/// # struct NoBus;
/// # impl embedded_hal::i2c::ErrorType for NoBus { type Error = embedded_hal::i2c::ErrorKind; }
/// # impl embedded_hal::i2c::I2c for NoBus {
/// #     fn transaction(&mut self, _: u8, _: &mut [embedded_hal::i2c::Operation<'_>]) -> Result<(), Self::Error> { Ok(()) }
/// # }
/// #[tokio::main]
/// async fn main() -> ptl_hardware::Result<()> {
///     let (chip, _handle) = MockExpander::new();
///     let mut any_chip: AnyExpander<NoBus> = AnyExpander::Mock(chip);
///
///     assert!(any_chip.probe().await?);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyExpander<I2C> {
    /// Mock expander for development and testing.
    Mock(MockExpander),

    /// CH423 on a real I2C bus.
    Ch423(Ch423<I2C>),
}

impl<I2C> ExpanderChip for AnyExpander<I2C>
where
    I2C: I2c + Send + Sync,
{
    async fn probe(&mut self) -> Result<bool> {
        match self {
            Self::Mock(chip) => chip.probe().await,
            Self::Ch423(chip) => chip.probe().await,
        }
    }

    async fn configure(&mut self) -> Result<()> {
        match self {
            Self::Mock(chip) => chip.configure().await,
            Self::Ch423(chip) => chip.configure().await,
        }
    }

    async fn write_line(&mut self, group: LineGroup, offset: u8, level: LineLevel) -> Result<()> {
        match self {
            Self::Mock(chip) => chip.write_line(group, offset, level).await,
            Self::Ch423(chip) => chip.write_line(group, offset, level).await,
        }
    }

    async fn write_group(&mut self, group: LineGroup, level: LineLevel) -> Result<()> {
        match self {
            Self::Mock(chip) => chip.write_group(group, level).await,
            Self::Ch423(chip) => chip.write_group(group, level).await,
        }
    }

    fn layout(&self) -> BusLayout {
        match self {
            Self::Mock(chip) => chip.layout(),
            Self::Ch423(chip) => chip.layout(),
        }
    }
}

/// Enum wrapper for radio link dispatch.
///
/// # Examples
///
/// ```
/// use ptl_hardware::devices::AnyRadio;
/// use ptl_hardware::traits::RadioLink;
/// use ptl_hardware::mock::MockRadio;
///
/// #[tokio::main]
/// async fn main() -> ptl_hardware::Result<()> {
///     let (radio, _handle) = MockRadio::new();
///     let any_radio = AnyRadio::Mock(radio);
///
///     assert!(!any_radio.is_connected().await?);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyRadio {
    /// Mock radio for development and testing.
    Mock(MockRadio),

    /// Host Bluetooth stack via btleplug.
    #[cfg(feature = "ble")]
    Btleplug(BtleplugRadio),
}

impl RadioLink for AnyRadio {
    async fn scan(&mut self, duration: Duration) -> Result<Vec<AdvertisedPeer>> {
        match self {
            Self::Mock(radio) => radio.scan(duration).await,
            #[cfg(feature = "ble")]
            Self::Btleplug(radio) => radio.scan(duration).await,
        }
    }

    async fn connect(&mut self, address: &str, kind: AddressKind) -> Result<()> {
        match self {
            Self::Mock(radio) => radio.connect(address, kind).await,
            #[cfg(feature = "ble")]
            Self::Btleplug(radio) => radio.connect(address, kind).await,
        }
    }

    async fn is_connected(&self) -> Result<bool> {
        match self {
            Self::Mock(radio) => radio.is_connected().await,
            #[cfg(feature = "ble")]
            Self::Btleplug(radio) => radio.is_connected().await,
        }
    }

    async fn has_service(&mut self, service: Uuid) -> Result<bool> {
        match self {
            Self::Mock(radio) => radio.has_service(service).await,
            #[cfg(feature = "ble")]
            Self::Btleplug(radio) => radio.has_service(service).await,
        }
    }

    async fn characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Option<CharacteristicInfo>> {
        match self {
            Self::Mock(radio) => radio.characteristic(service, characteristic).await,
            #[cfg(feature = "ble")]
            Self::Btleplug(radio) => radio.characteristic(service, characteristic).await,
        }
    }

    async fn subscribe(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream> {
        match self {
            Self::Mock(radio) => radio.subscribe(service, characteristic).await,
            #[cfg(feature = "ble")]
            Self::Btleplug(radio) => radio.subscribe(service, characteristic).await,
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        match self {
            Self::Mock(radio) => radio.disconnect().await,
            #[cfg(feature = "ble")]
            Self::Btleplug(radio) => radio.disconnect().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ExpanderWrite;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    #[derive(Debug)]
    struct NoBus;

    impl ErrorType for NoBus {
        type Error = ErrorKind;
    }

    impl I2c for NoBus {
        fn transaction(
            &mut self,
            _address: u8,
            _operations: &mut [Operation<'_>],
        ) -> std::result::Result<(), Self::Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_any_expander_dispatches_to_mock() {
        let (chip, handle) = MockExpander::new();
        let mut any_chip: AnyExpander<NoBus> = AnyExpander::Mock(chip);

        any_chip.configure().await.unwrap();
        any_chip
            .write_line(LineGroup::Gpio, 1, LineLevel::Low)
            .await
            .unwrap();

        assert!(handle.is_configured());
        assert_eq!(
            handle.writes(),
            vec![ExpanderWrite::Line {
                group: LineGroup::Gpio,
                offset: 1,
                level: LineLevel::Low
            }]
        );
        assert_eq!(any_chip.layout(), BusLayout::ch423());
    }

    #[tokio::test]
    async fn test_any_expander_dispatches_to_ch423() {
        let mut any_chip = AnyExpander::Ch423(Ch423::new(NoBus, "wire0"));
        assert!(any_chip.probe().await.unwrap());
        any_chip.configure().await.unwrap();
    }

    #[tokio::test]
    async fn test_any_radio_dispatches_to_mock() {
        let (radio, handle) = MockRadio::new();
        handle.add_peer(AdvertisedPeer::new("AA:BB:CC:DD:EE:FF"));
        let mut any_radio = AnyRadio::Mock(radio);

        let peers = any_radio.scan(Duration::from_millis(10)).await.unwrap();
        assert_eq!(peers.len(), 1);
        assert!(any_radio.disconnect().await.is_ok());
        assert_eq!(handle.disconnect_count(), 1);
    }
}
