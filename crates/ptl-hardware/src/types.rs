//! Common types shared across expander and radio implementations.

use ptl_core::constants::{GPIO_LINES_PER_CHIP, GPO_LINES_PER_CHIP};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Line group on an expander chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineGroup {
    /// Bidirectional lines, configured as outputs.
    Gpio,

    /// Output-only lines.
    Gpo,
}

impl fmt::Display for LineGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpio => write!(f, "GPIO"),
            Self::Gpo => write!(f, "GPO"),
        }
    }
}

/// Line-group sizes of the chip hosted on one bus.
///
/// The flat pin index of a bus covers its GPIO lines first, then its GPO lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusLayout {
    /// Number of GPIO lines.
    pub gpio_lines: u16,

    /// Number of GPO lines.
    pub gpo_lines: u16,
}

impl BusLayout {
    pub const fn new(gpio_lines: u16, gpo_lines: u16) -> Self {
        Self {
            gpio_lines,
            gpo_lines,
        }
    }

    /// Layout of the CH423 used on the reference hardware (8 GPIO, 16 GPO).
    pub const fn ch423() -> Self {
        Self::new(GPIO_LINES_PER_CHIP as u16, GPO_LINES_PER_CHIP as u16)
    }

    /// Total lines on the bus.
    pub const fn lines(&self) -> u16 {
        self.gpio_lines + self.gpo_lines
    }

    /// Map a bus-local line number to its group and offset.
    pub fn locate(&self, local: u16) -> Option<(LineGroup, u8)> {
        if local < self.gpio_lines {
            Some((LineGroup::Gpio, local as u8))
        } else if local < self.lines() {
            Some((LineGroup::Gpo, (local - self.gpio_lines) as u8))
        } else {
            None
        }
    }
}

impl Default for BusLayout {
    fn default() -> Self {
        Self::ch423()
    }
}

/// Address kind used when opening a link to a peer.
///
/// The kind of the scanner's address is not known in advance, so connections
/// are attempted with [`AddressKind::Public`] first and [`AddressKind::Random`]
/// second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Public,
    Random,
}

impl AddressKind {
    /// Connection order used by the session.
    pub const FALLBACK_ORDER: [AddressKind; 2] = [AddressKind::Public, AddressKind::Random];
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Advertisement seen during a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedPeer {
    /// Peer address as printed by the radio stack.
    pub address: String,

    /// Advertised local name, if any.
    pub name: Option<String>,

    /// First advertised service, if any.
    pub service: Option<Uuid>,

    /// Received signal strength.
    pub rssi: Option<i16>,
}

impl AdvertisedPeer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            service: None,
            rssi: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_service(mut self, service: Uuid) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Service id in the registry's string form; empty when none was advertised.
    pub fn service_id(&self) -> String {
        self.service.map(|uuid| uuid.to_string()).unwrap_or_default()
    }
}

/// Capabilities of a remote characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub readable: bool,
    pub notifiable: bool,
}

impl CharacteristicInfo {
    pub fn new(uuid: Uuid, readable: bool, notifiable: bool) -> Self {
        Self {
            uuid,
            readable,
            notifiable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some((LineGroup::Gpio, 0)))]
    #[case(7, Some((LineGroup::Gpio, 7)))]
    #[case(8, Some((LineGroup::Gpo, 0)))]
    #[case(23, Some((LineGroup::Gpo, 15)))]
    #[case(24, None)]
    fn test_ch423_layout_locate(#[case] local: u16, #[case] expected: Option<(LineGroup, u8)>) {
        assert_eq!(BusLayout::ch423().locate(local), expected);
    }

    #[test]
    fn test_layout_lines() {
        assert_eq!(BusLayout::ch423().lines(), 24);
        assert_eq!(BusLayout::new(4, 0).lines(), 4);
        assert_eq!(BusLayout::new(4, 0).locate(4), None);
    }

    #[test]
    fn test_address_kind_order() {
        assert_eq!(
            AddressKind::FALLBACK_ORDER,
            [AddressKind::Public, AddressKind::Random]
        );
        assert_eq!(AddressKind::Random.to_string(), "random");
    }

    #[test]
    fn test_advertised_peer_service_id() {
        let peer = AdvertisedPeer::new("AA:BB").with_service(ptl_core::short_uuid(0xFFE0));
        assert_eq!(peer.service_id(), "0000ffe0-0000-1000-8000-00805f9b34fb");
        assert_eq!(AdvertisedPeer::new("CC:DD").service_id(), "");
    }

    #[test]
    fn test_line_group_serialization() {
        let json = serde_json::to_string(&LineGroup::Gpo).unwrap();
        assert_eq!(json, "\"gpo\"");
    }
}
