//! Code and pin-name resolution.
//!
//! Both lookups are linear scans: tables hold tens of entries and are
//! reloaded rarely, and scan order decides which duplicate wins.

use crate::table::AccessTable;
use ptl_core::PinAddress;
use std::sync::Arc;

/// Result of resolving one scanned code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Pin name the code maps to; empty when the code is unknown.
    pub pin_name: String,

    /// Line index for `pin_name`; the broadcast index when unmapped.
    pub index: PinAddress,
}

impl Resolution {
    pub fn is_miss(&self) -> bool {
        self.pin_name.is_empty()
    }
}

/// Resolves codes to pin names and pin names to line indices.
///
/// # Examples
///
/// ```
/// use ptl_access::{AccessResolver, AccessTable};
/// use ptl_core::PinAddress;
/// use std::sync::Arc;
///
/// let table = AccessTable::new().with_pin("B1", ["777"]);
/// let resolver = AccessResolver::new(Arc::new(table), vec!["A1".into(), "B1".into()]);
///
/// assert_eq!(resolver.find_pin_for_code("777"), Some("B1"));
/// assert_eq!(resolver.find_pin_index("B1"), PinAddress::new(1));
/// assert_eq!(resolver.find_pin_index("nope"), PinAddress::ALL);
/// ```
#[derive(Debug, Clone)]
pub struct AccessResolver {
    table: Arc<AccessTable>,
    pins: Vec<String>,
    all_pins: PinAddress,
}

impl AccessResolver {
    /// Build a resolver for the reference two-chip layout.
    pub fn new(table: Arc<AccessTable>, pins: Vec<String>) -> Self {
        Self {
            table,
            pins,
            all_pins: PinAddress::ALL,
        }
    }

    /// Use a different broadcast index for unmapped names.
    pub fn with_all_pins(mut self, all_pins: PinAddress) -> Self {
        self.all_pins = all_pins;
        self
    }

    /// First pin, in table order, whose code list contains `code`.
    pub fn find_pin_for_code(&self, code: &str) -> Option<&str> {
        self.table
            .entries()
            .iter()
            .find(|entry| entry.codes.iter().any(|c| c == code))
            .map(|entry| entry.pin.as_str())
    }

    /// Position of `pin_name` in the configured pin list.
    ///
    /// Names that are not configured resolve to the broadcast index.
    pub fn find_pin_index(&self, pin_name: &str) -> PinAddress {
        self.pins
            .iter()
            .position(|p| p == pin_name)
            .and_then(|i| u16::try_from(i).ok())
            .map_or(self.all_pins, PinAddress::new)
    }

    /// Resolve a scanned code all the way to a line index.
    ///
    /// An unknown code resolves to the empty pin name, which in turn is
    /// looked up in the pin list like any other name.
    pub fn resolve(&self, code: &str) -> Resolution {
        let pin_name = self.find_pin_for_code(code).unwrap_or_default().to_string();
        let index = self.find_pin_index(&pin_name);
        Resolution { pin_name, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolver() -> AccessResolver {
        let table = AccessTable::new()
            .with_pin("A1", ["100", "101"])
            .with_pin("A2", ["200"])
            .with_pin("A3", ["101", "300"]);
        AccessResolver::new(
            Arc::new(table),
            vec!["A1".into(), "A2".into(), "A3".into()],
        )
    }

    #[rstest]
    #[case("100", Some("A1"))]
    #[case("200", Some("A2"))]
    #[case("300", Some("A3"))]
    #[case("101", Some("A1"))]
    #[case("999", None)]
    #[case("", None)]
    fn test_find_pin_for_code(#[case] code: &str, #[case] expected: Option<&str>) {
        assert_eq!(resolver().find_pin_for_code(code), expected);
    }

    #[rstest]
    #[case("A1", 0)]
    #[case("A2", 1)]
    #[case("A3", 2)]
    #[case("Z1", 48)]
    #[case("", 48)]
    fn test_find_pin_index(#[case] name: &str, #[case] expected: u16) {
        assert_eq!(resolver().find_pin_index(name), PinAddress::new(expected));
    }

    #[test]
    fn test_resolve_hit_and_miss() {
        let resolver = resolver();

        let hit = resolver.resolve("200");
        assert_eq!(hit.pin_name, "A2");
        assert_eq!(hit.index, PinAddress::new(1));
        assert!(!hit.is_miss());

        let miss = resolver.resolve("nope");
        assert!(miss.is_miss());
        assert_eq!(miss.index, PinAddress::ALL);
    }

    #[test]
    fn test_custom_broadcast_index() {
        let resolver = resolver().with_all_pins(PinAddress::new(24));
        assert_eq!(resolver.find_pin_index("missing"), PinAddress::new(24));
    }
}
