//! Mock radio link for testing and development.
//!
//! This module provides a scripted radio: tests declare which peers advertise,
//! which address kinds each peer accepts, and which services and
//! characteristics it exposes, then push notification chunks through the
//! handle as if the scanner had sent them.

use crate::{
    HardwareError, Result,
    traits::{NotificationStream, RadioLink},
    types::{AddressKind, AdvertisedPeer, CharacteristicInfo},
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Capacity of the mock notification channel.
const NOTIFICATION_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct MockRadioState {
    peers: Vec<AdvertisedPeer>,
    accepts: HashMap<String, Vec<AddressKind>>,
    services: HashMap<Uuid, Vec<CharacteristicInfo>>,
    connected: Option<String>,
    connect_delay: Option<Duration>,
    scan_delay: Option<Duration>,
    connect_attempts: Vec<(String, AddressKind)>,
    subscriptions: Vec<Uuid>,
    scans: usize,
    disconnects: usize,
    notify_tx: Option<mpsc::Sender<Bytes>>,
}

fn lock(state: &Mutex<MockRadioState>) -> MutexGuard<'_, MockRadioState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock radio link.
///
/// # Examples
///
/// ```
/// use ptl_hardware::mock::MockRadio;
/// use ptl_hardware::traits::RadioLink;
/// use ptl_hardware::types::{AddressKind, AdvertisedPeer};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> ptl_hardware::Result<()> {
///     let (mut radio, handle) = MockRadio::new();
///     handle.add_peer(AdvertisedPeer::new("AA:BB:CC:DD:EE:FF"));
///     handle.accept("AA:BB:CC:DD:EE:FF", AddressKind::Random);
///
///     let peers = radio.scan(Duration::from_secs(5)).await?;
///     assert_eq!(peers.len(), 1);
///
///     assert!(radio.connect("AA:BB:CC:DD:EE:FF", AddressKind::Public).await.is_err());
///     radio.connect("AA:BB:CC:DD:EE:FF", AddressKind::Random).await?;
///     assert!(radio.is_connected().await?);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockRadio {
    state: Arc<Mutex<MockRadioState>>,
}

impl MockRadio {
    /// Create a new mock radio and its control handle.
    pub fn new() -> (Self, MockRadioHandle) {
        let state = Arc::new(Mutex::new(MockRadioState::default()));

        (
            Self {
                state: Arc::clone(&state),
            },
            MockRadioHandle { state },
        )
    }

    fn require_connection(&self) -> Result<()> {
        if lock(&self.state).connected.is_none() {
            return Err(HardwareError::disconnected("mock radio link"));
        }
        Ok(())
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new().0
    }
}

impl RadioLink for MockRadio {
    async fn scan(&mut self, _duration: Duration) -> Result<Vec<AdvertisedPeer>> {
        let delay = {
            let mut state = lock(&self.state);
            state.scans += 1;
            state.scan_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(lock(&self.state).peers.clone())
    }

    async fn connect(&mut self, address: &str, kind: AddressKind) -> Result<()> {
        let delay = {
            let mut state = lock(&self.state);
            state.connect_attempts.push((address.to_string(), kind));
            state.connect_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);
        let accepted = state
            .accepts
            .get(address)
            .is_some_and(|kinds| kinds.contains(&kind));

        if !accepted {
            return Err(HardwareError::radio(format!(
                "{address} refused {kind} connection"
            )));
        }

        state.connected = Some(address.to_string());
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(lock(&self.state).connected.is_some())
    }

    async fn has_service(&mut self, service: Uuid) -> Result<bool> {
        self.require_connection()?;
        Ok(lock(&self.state).services.contains_key(&service))
    }

    async fn characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Option<CharacteristicInfo>> {
        self.require_connection()?;
        Ok(lock(&self.state)
            .services
            .get(&service)
            .and_then(|chars| chars.iter().find(|c| c.uuid == characteristic).copied()))
    }

    async fn subscribe(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream> {
        if self.characteristic(service, characteristic).await?.is_none() {
            return Err(HardwareError::not_found(format!(
                "characteristic {characteristic}"
            )));
        }

        let (tx, rx) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);
        let mut state = lock(&self.state);
        state.notify_tx = Some(tx);
        state.subscriptions.push(characteristic);
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.connected = None;
        state.notify_tx = None;
        state.disconnects += 1;
        Ok(())
    }
}

/// Handle for scripting a mock radio.
#[derive(Debug, Clone)]
pub struct MockRadioHandle {
    state: Arc<Mutex<MockRadioState>>,
}

impl MockRadioHandle {
    /// Make a peer show up in every subsequent scan.
    pub fn add_peer(&self, peer: AdvertisedPeer) {
        lock(&self.state).peers.push(peer);
    }

    /// Let `address` accept connections of the given kind.
    pub fn accept(&self, address: impl Into<String>, kind: AddressKind) {
        lock(&self.state)
            .accepts
            .entry(address.into())
            .or_default()
            .push(kind);
    }

    /// Expose a service with its characteristics on any connected peer.
    pub fn add_service(&self, service: Uuid, characteristics: Vec<CharacteristicInfo>) {
        lock(&self.state).services.insert(service, characteristics);
    }

    /// Delay every connection attempt, to exercise connect time boxes.
    pub fn set_connect_delay(&self, delay: Duration) {
        lock(&self.state).connect_delay = Some(delay);
    }

    /// Delay every scan, to exercise scan time boxes.
    pub fn set_scan_delay(&self, delay: Duration) {
        lock(&self.state).scan_delay = Some(delay);
    }

    /// Deliver one notification chunk to the active subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is subscribed or the subscriber went away.
    pub async fn send_chunk(&self, chunk: &[u8]) -> Result<()> {
        let tx = lock(&self.state)
            .notify_tx
            .clone()
            .ok_or_else(|| HardwareError::disconnected("no active subscription"))?;

        tx.send(Bytes::copy_from_slice(chunk))
            .await
            .map_err(|_| HardwareError::disconnected("notification channel closed"))
    }

    /// Simulate the peer going out of range.
    pub fn drop_link(&self) {
        let mut state = lock(&self.state);
        state.connected = None;
        state.notify_tx = None;
    }

    /// Every connection attempt in order.
    pub fn connect_attempts(&self) -> Vec<(String, AddressKind)> {
        lock(&self.state).connect_attempts.clone()
    }

    /// Characteristics subscribed so far.
    pub fn subscriptions(&self) -> Vec<Uuid> {
        lock(&self.state).subscriptions.clone()
    }

    pub fn scan_count(&self) -> usize {
        lock(&self.state).scans
    }

    pub fn disconnect_count(&self) -> usize {
        lock(&self.state).disconnects
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptl_core::short_uuid;

    const ADDR: &str = "AA:BB:CC:DD:EE:FF";

    #[tokio::test]
    async fn test_mock_radio_scan_reports_peers() {
        let (mut radio, handle) = MockRadio::new();
        handle.add_peer(AdvertisedPeer::new(ADDR).with_name("scanner"));
        handle.add_peer(AdvertisedPeer::new("11:22:33:44:55:66"));

        let peers = radio.scan(Duration::from_secs(5)).await.unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(handle.scan_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_radio_connect_respects_address_kind() {
        let (mut radio, handle) = MockRadio::new();
        handle.accept(ADDR, AddressKind::Public);

        assert!(radio.connect(ADDR, AddressKind::Random).await.is_err());
        radio.connect(ADDR, AddressKind::Public).await.unwrap();

        assert!(handle.is_connected());
        assert_eq!(
            handle.connect_attempts(),
            vec![
                (ADDR.to_string(), AddressKind::Random),
                (ADDR.to_string(), AddressKind::Public)
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_radio_service_lookup_requires_connection() {
        let (mut radio, handle) = MockRadio::new();
        handle.add_service(short_uuid(0xFFE0), vec![]);

        assert!(radio.has_service(short_uuid(0xFFE0)).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_radio_subscription_delivers_chunks() {
        let (mut radio, handle) = MockRadio::new();
        let service = short_uuid(0xFFE0);
        let characteristic = short_uuid(0xFFE1);
        handle.accept(ADDR, AddressKind::Public);
        handle.add_service(
            service,
            vec![CharacteristicInfo::new(characteristic, true, true)],
        );

        radio.connect(ADDR, AddressKind::Public).await.unwrap();
        let mut stream = radio.subscribe(service, characteristic).await.unwrap();

        handle.send_chunk(b"04AB").await.unwrap();
        assert_eq!(stream.recv().await.unwrap(), Bytes::from_static(b"04AB"));

        radio.disconnect().await.unwrap();
        assert!(stream.recv().await.is_none());
        assert!(handle.send_chunk(b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_radio_drop_link() {
        let (mut radio, handle) = MockRadio::new();
        handle.accept(ADDR, AddressKind::Public);
        radio.connect(ADDR, AddressKind::Public).await.unwrap();

        handle.drop_link();
        assert!(!radio.is_connected().await.unwrap());
        assert_eq!(handle.disconnect_count(), 0);
    }
}
