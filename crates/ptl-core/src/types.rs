use crate::constants::ALL_PINS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Flat index of an output line across every expander bus.
///
/// Values below the bus layout's total address a single line; the value equal
/// to the total is the broadcast sentinel; anything larger addresses nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinAddress(u16);

impl PinAddress {
    /// Broadcast index for the two-chip reference layout.
    pub const ALL: PinAddress = PinAddress(ALL_PINS);

    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    pub const fn index(&self) -> u16 {
        self.0
    }

    /// The following line index, saturating at `u16::MAX`.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<u16> for PinAddress {
    fn from(index: u16) -> Self {
        Self(index)
    }
}

impl fmt::Display for PinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Electrical level driven onto an output line.
///
/// Indicator lines are wired active-low: `Low` lights the indicator and
/// `High` blanks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineLevel {
    High,
    Low,
}

impl LineLevel {
    /// Level that lights an indicator.
    pub const LIT: LineLevel = LineLevel::Low;

    /// Level that blanks an indicator.
    pub const DARK: LineLevel = LineLevel::High;

    pub fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }

    /// Register value for a group-wide write: every bit set or every bit clear.
    pub fn fill_byte(&self) -> u8 {
        match self {
            Self::High => 0xFF,
            Self::Low => 0x00,
        }
    }
}

/// Connection lifecycle of the scanner session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Started, first poll not finished yet.
    Init,

    /// Not connected; a scan runs on the next poll.
    Idle,

    /// Discovery scan in progress.
    Scanning,

    /// Target found, connection attempts in progress.
    Connecting,

    /// Link established (subscribed, or parked after a capability failure).
    Connected,
}

impl ConnectionState {
    /// Numeric code published in status payloads.
    ///
    /// `0` until the first poll settles, then `1` for no device connected
    /// and `2` for connected. The transient scan/connect states report as
    /// not connected.
    pub fn status_code(&self) -> u8 {
        match self {
            Self::Init => 0,
            Self::Connected => 2,
            _ => 1,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            ConnectionState::Init => "Init",
            ConnectionState::Idle => "Idle",
            ConnectionState::Scanning => "Scanning",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        };
        write!(f, "{}", state_str)
    }
}

/// A wireless endpoint seen during a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDevice {
    /// Device address, the unique key in the registry.
    pub address: String,

    /// Advertised service id, 128-bit form.
    #[serde(rename = "service")]
    pub service_id: String,
}

impl PeerDevice {
    pub fn new(address: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            service_id: service_id.into(),
        }
    }
}

/// Bluetooth base UUID (`0000xxxx-0000-1000-8000-00805F9B34FB`).
const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805F9B34FB;

/// Expand a 16- or 32-bit assigned number into its 128-bit UUID.
pub fn short_uuid(value: u32) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((value as u128) << 96))
}

/// Parse a service or characteristic id as written in the configuration.
///
/// Accepts the 4-digit and 8-digit short forms (optionally `0x`-prefixed)
/// as well as any full 128-bit representation.
pub fn parse_ble_uuid(input: &str) -> Result<Uuid> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if matches!(digits.len(), 4 | 8) {
        return u32::from_str_radix(digits, 16)
            .map(short_uuid)
            .map_err(|_| Error::InvalidUuid(input.to_string()));
    }

    Uuid::from_str(trimmed).map_err(|_| Error::InvalidUuid(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ffe0", "0000ffe0-0000-1000-8000-00805f9b34fb")]
    #[case("0x180D", "0000180d-0000-1000-8000-00805f9b34fb")]
    #[case("0000FFE1", "0000ffe1-0000-1000-8000-00805f9b34fb")]
    #[case(
        "6e400001-b5a3-f393-e0a9-e50e24dcca9e",
        "6e400001-b5a3-f393-e0a9-e50e24dcca9e"
    )]
    fn test_parse_ble_uuid_valid(#[case] input: &str, #[case] expected: &str) {
        let uuid = parse_ble_uuid(input).unwrap();
        assert_eq!(uuid.to_string(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("xyz1")]
    #[case("12345")]
    #[case("not-a-uuid")]
    fn test_parse_ble_uuid_invalid(#[case] input: &str) {
        assert!(matches!(parse_ble_uuid(input), Err(Error::InvalidUuid(_))));
    }

    #[test]
    fn test_pin_address_next() {
        assert_eq!(PinAddress::new(3).next(), PinAddress::new(4));
        assert_eq!(PinAddress::new(u16::MAX).next(), PinAddress::new(u16::MAX));
        assert_eq!(PinAddress::ALL.index(), 48);
    }

    #[test]
    fn test_line_level_polarity() {
        assert_eq!(LineLevel::LIT, LineLevel::Low);
        assert_eq!(LineLevel::DARK.fill_byte(), 0xFF);
        assert_eq!(LineLevel::Low.fill_byte(), 0x00);
    }

    #[test]
    fn test_connection_state_status_code() {
        assert_eq!(ConnectionState::Init.status_code(), 0);
        assert_eq!(ConnectionState::Idle.status_code(), 1);
        assert_eq!(ConnectionState::Scanning.status_code(), 1);
        assert_eq!(ConnectionState::Connected.status_code(), 2);
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
    }

    #[test]
    fn test_peer_device_serializes_service_key() {
        let device = PeerDevice::new("AA:BB:CC:DD:EE:FF", "0000ffe0-0000-1000-8000-00805f9b34fb");
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["address"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(json["service"], "0000ffe0-0000-1000-8000-00805f9b34fb");
    }
}
