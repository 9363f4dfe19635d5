//! Controller configuration document.
//!
//! The document is a flat JSON object. Field names follow the deployed
//! `config.json` files, which is why they are short:
//!
//! ```json
//! {
//!   "addr": "aa:bb:cc:dd:ee:ff",
//!   "service": "0000ffe0-0000-1000-8000-00805f9b34fb",
//!   "charact": "",
//!   "pins": ["A1", "A2", "B1"],
//!   "standalone": false,
//!   "ssid": "warehouse",
//!   "wifipass": "secret"
//! }
//! ```
//!
//! [`ConfigStore`] shares one document between the session (which reads the
//! target and writes back the resolved characteristic) and the management
//! side (which retargets the scanner).

use chrono::Utc;
use ptl_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanner address.
    pub addr: String,

    /// Service id the scanner must expose.
    pub service: String,

    /// Characteristic id to subscribe to; written back once resolved.
    pub charact: String,

    /// Pin names in line-index order.
    pub pins: Vec<String>,

    /// Run as an access point instead of joining a network.
    pub standalone: bool,

    pub ssid: String,

    pub wifipass: String,
}

impl Config {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid configuration object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether a scanner target is configured at all.
    pub fn has_target(&self) -> bool {
        !self.addr.is_empty()
    }
}

#[derive(Debug, Default)]
struct ConfigSlot {
    config: Config,
    last_write: i64,
}

/// Shared, mutable configuration.
///
/// Cloning the store clones the handle, not the document.
///
/// # Examples
///
/// ```
/// use ptl_access::{Config, ConfigStore};
///
/// let store = ConfigStore::new(Config::default());
/// store.set_target("aa:bb:cc:dd:ee:ff", "ffe0", "");
///
/// assert_eq!(store.snapshot().addr, "aa:bb:cc:dd:ee:ff");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    inner: Arc<RwLock<ConfigSlot>>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ConfigSlot {
                config,
                last_write: Utc::now().timestamp(),
            })),
        }
    }

    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = Config::from_json(&text)?;
        info!(path = %path.display(), pins = config.pins.len(), "Configuration loaded");
        Ok(Self::new(config))
    }

    /// Write the current document to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.snapshot().to_json()?)?;
        debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> Config {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .config
            .clone()
    }

    /// Replace the whole document.
    pub fn replace(&self, config: Config) {
        self.update(|current| *current = config);
    }

    /// Point the session at another scanner.
    pub fn set_target(
        &self,
        address: impl Into<String>,
        service: impl Into<String>,
        characteristic: impl Into<String>,
    ) {
        let (address, service, characteristic) =
            (address.into(), service.into(), characteristic.into());
        info!(%address, %service, %characteristic, "Scanner target changed");
        self.update(|config| {
            config.addr = address;
            config.service = service;
            config.charact = characteristic;
        });
    }

    /// Record the characteristic resolved during subscription.
    pub fn set_characteristic(&self, characteristic: impl Into<String>) {
        let characteristic = characteristic.into();
        self.update(|config| config.charact = characteristic);
    }

    /// Unix time of the last change, in seconds.
    pub fn last_write(&self) -> i64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_write
    }

    fn update(&self, apply: impl FnOnce(&mut Config)) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut slot.config);
        slot.last_write = Utc::now().timestamp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "addr": "aa:bb:cc:dd:ee:ff",
        "service": "ffe0",
        "charact": "",
        "pins": ["A1", "A2"],
        "standalone": true,
        "ssid": "ptl",
        "wifipass": "12345678"
    }"#;

    #[test]
    fn test_parse_document() {
        let config = Config::from_json(DOCUMENT).unwrap();
        assert_eq!(config.addr, "aa:bb:cc:dd:ee:ff");
        assert_eq!(config.pins, vec!["A1", "A2"]);
        assert!(config.standalone);
        assert!(config.has_target());
    }

    #[test]
    fn test_missing_fields_default() {
        let config = Config::from_json(r#"{"pins": ["X"]}"#).unwrap();
        assert!(!config.has_target());
        assert!(config.charact.is_empty());
        assert_eq!(config.pins, vec!["X"]);
    }

    #[test]
    fn test_rejects_malformed_document() {
        assert!(Config::from_json("{").is_err());
        assert!(Config::from_json(r#"{"pins": 3}"#).is_err());
    }

    #[test]
    fn test_set_target_and_characteristic() {
        let store = ConfigStore::new(Config::from_json(DOCUMENT).unwrap());
        let shared = store.clone();

        shared.set_target("11:22:33:44:55:66", "180d", "");
        store.set_characteristic("00002a37-0000-1000-8000-00805f9b34fb");

        let config = store.snapshot();
        assert_eq!(config.addr, "11:22:33:44:55:66");
        assert_eq!(config.service, "180d");
        assert_eq!(config.charact, "00002a37-0000-1000-8000-00805f9b34fb");
        assert_eq!(config.pins, vec!["A1", "A2"]);
        assert!(store.last_write() > 0);
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, DOCUMENT).unwrap();

        let store = ConfigStore::load(&path).unwrap();
        store.set_characteristic("ffe1");
        store.save(&path).unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigStore::load(dir.path().join("absent.json"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
