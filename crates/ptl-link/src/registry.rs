//! Registry of peers seen during discovery scans.

use ptl_core::PeerDevice;
use ptl_core::constants::MAX_PEER_DEVICES;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::debug;

/// Deduplicated, append-only, bounded set of discovered peers.
///
/// Entries keep insertion order and are never changed or removed. Clones
/// share the same set, so the session can append while status reporting
/// reads.
///
/// # Examples
///
/// ```
/// use ptl_link::PeerDeviceRegistry;
///
/// let registry = PeerDeviceRegistry::new();
/// assert!(registry.try_add("AA:BB:CC:DD:EE:FF", "ffe0"));
/// assert!(!registry.try_add("AA:BB:CC:DD:EE:FF", "180d"));
///
/// assert_eq!(registry.find("AA:BB:CC:DD:EE:FF"), Some(0));
/// assert_eq!(registry.snapshot()[0].service_id, "ffe0");
/// ```
#[derive(Debug, Clone)]
pub struct PeerDeviceRegistry {
    devices: Arc<RwLock<Vec<PeerDevice>>>,
    capacity: usize,
}

impl PeerDeviceRegistry {
    pub fn new() -> Self {
        Self::with_capacity(MAX_PEER_DEVICES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            devices: Arc::new(RwLock::new(Vec::with_capacity(capacity))),
            capacity,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<PeerDevice>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a peer.
    ///
    /// Returns `false` without changing anything if the address is already
    /// known or the registry is full.
    pub fn try_add(&self, address: impl Into<String>, service_id: impl Into<String>) -> bool {
        let address = address.into();
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);

        if devices.len() >= self.capacity || devices.iter().any(|d| d.address == address) {
            return false;
        }

        debug!(%address, "New peer registered");
        devices.push(PeerDevice::new(address, service_id));
        true
    }

    /// Insertion index of `address`.
    pub fn find(&self, address: &str) -> Option<usize> {
        self.read().iter().position(|d| d.address == address)
    }

    /// Copy of every entry in insertion order.
    pub fn snapshot(&self) -> Vec<PeerDevice> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for PeerDeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
