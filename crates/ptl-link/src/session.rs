//! Scanner session lifecycle.
//!
//! The session owns the radio and walks it through discovery, connection,
//! capability checks and subscription for the configured target:
//!
//! ```text
//!   Init ──first poll──┐
//!                      ▼  poll tick, not connected
//!   Idle ───────────────────────────► Scanning
//!    ▲                                   │ target seen
//!    │ connect or service failure        ▼
//!    ├──────────────────────────────  Connecting
//!    │                                   │ service present
//!    │ link lost / disconnect()          ▼
//!    └──────────────────────────────  Connected ── subscribed, or parked
//!                                                  on a characteristic failure
//! ```
//!
//! # Error Policy
//!
//! Nothing here is fatal. Scan, connection and service failures leave the
//! session `Idle` and the next poll tries again, with no backoff. Scans and
//! connection attempts are both time boxed, so a stuck radio call cannot hold
//! up a pending disconnect request. A characteristic
//! that cannot be subscribed leaves the link `Connected` but silent until the
//! target is changed from outside.
//!
//! # Address Kinds
//!
//! The scanner's address kind is not known in advance, so every connection
//! tries [`AddressKind::Public`] then [`AddressKind::Random`], each under the
//! connect timeout.

use crate::reassembler::NotificationReassembler;
use crate::registry::PeerDeviceRegistry;
use ptl_access::ConfigStore;
use ptl_core::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SCAN_DURATION_MS,
};
use ptl_core::{ConnectionState, Error, Result, parse_ble_uuid};
use ptl_hardware::{AddressKind, NotificationStream, RadioLink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Cadence of [`SessionManager::run`]; polls still happen only once per
/// poll interval.
pub const SESSION_TICK: Duration = Duration::from_secs(1);

/// Session timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Minimum time between two polls.
    pub poll_interval: Duration,

    /// Length of each discovery scan.
    pub scan_duration: Duration,

    /// Time box of each connection attempt.
    pub connect_timeout: Duration,
}

impl SessionConfig {
    /// Time box of a whole scan: the scan itself plus one connect timeout of
    /// slack for collecting results from the radio stack.
    pub fn scan_timeout(&self) -> Duration {
        self.scan_duration + self.connect_timeout
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            scan_duration: Duration::from_millis(DEFAULT_SCAN_DURATION_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Default)]
struct Requests {
    disconnect: AtomicBool,
    wake: Notify,
}

/// Handle for observing and steering a running session from other tasks.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    requests: Arc<Requests>,
    state: watch::Receiver<ConnectionState>,
}

impl SessionHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that sees every state change.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Ask the session to drop its link on its next tick.
    ///
    /// Used after retargeting so the new address, service and characteristic
    /// are resolved from scratch.
    pub fn request_disconnect(&self) {
        self.requests.disconnect.store(true, Ordering::SeqCst);
        self.requests.wake.notify_one();
    }
}

/// Connection lifecycle for one target scanner.
pub struct SessionManager<R> {
    radio: R,
    config: SessionConfig,
    store: ConfigStore,
    registry: PeerDeviceRegistry,
    reassembler: NotificationReassembler,
    state: watch::Sender<ConnectionState>,
    requests: Arc<Requests>,
    last_poll: Option<Instant>,
    subscribed: Option<Uuid>,
    pump: Option<JoinHandle<()>>,
}

impl<R: RadioLink> SessionManager<R> {
    pub fn new(
        radio: R,
        config: SessionConfig,
        store: ConfigStore,
        registry: PeerDeviceRegistry,
        reassembler: NotificationReassembler,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Init);
        Self {
            radio,
            config,
            store,
            registry,
            reassembler,
            state,
            requests: Arc::new(Requests::default()),
            last_poll: None,
            subscribed: None,
            pump: None,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            requests: Arc::clone(&self.requests),
            state: self.state.subscribe(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Characteristic currently feeding the reassembler.
    pub fn subscribed(&self) -> Option<Uuid> {
        self.subscribed
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = %current, to = %next, "Session state change");
            *current = next;
            true
        });
    }

    /// Run one scheduler step.
    ///
    /// Applies a pending disconnect request, then polls if the poll interval
    /// has elapsed: a dropped link returns to `Idle`, and an idle session
    /// scans and tries to connect. Failures are logged; the returned state is
    /// where the session settled.
    pub async fn tick(&mut self) -> ConnectionState {
        if self.requests.disconnect.swap(false, Ordering::SeqCst) {
            self.disconnect().await;
        }

        if self
            .last_poll
            .is_some_and(|at| at.elapsed() < self.config.poll_interval)
        {
            return self.state();
        }
        self.last_poll = Some(Instant::now());

        if self.state() == ConnectionState::Connected {
            match self.radio.is_connected().await {
                Ok(true) => return self.state(),
                Ok(false) => info!("Scanner link lost"),
                Err(e) => warn!("Link state query failed: {}", e),
            }
            self.disconnect().await;
        }

        if let Err(e) = self.poll().await {
            if matches!(e, Error::CharacteristicUnsubscribable { .. }) {
                error!("{}", e);
            } else {
                warn!("Session poll failed: {}", e);
            }
        }
        self.state()
    }

    /// Scan, then connect and subscribe if the target shows up.
    async fn poll(&mut self) -> Result<()> {
        let target = self.store.snapshot();

        self.set_state(ConnectionState::Scanning);
        let scan_timeout = self.config.scan_timeout();
        let peers = match timeout(scan_timeout, self.radio.scan(self.config.scan_duration)).await {
            Ok(Ok(peers)) => peers,
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Idle);
                return Err(e.into());
            }
            Err(_) => {
                self.set_state(ConnectionState::Idle);
                return Err(Error::ScanTimeout {
                    timeout_ms: scan_timeout.as_millis() as u64,
                });
            }
        };

        let mut found = false;
        for peer in &peers {
            self.registry.try_add(&peer.address, peer.service_id());
            found |= target.has_target() && peer.address.eq_ignore_ascii_case(&target.addr);
        }
        debug!(peers = peers.len(), found, "Scan finished");

        if !found {
            self.set_state(ConnectionState::Idle);
            return Ok(());
        }

        info!(address = %target.addr, "Target scanner found");
        self.set_state(ConnectionState::Connecting);
        if let Err(e) = self.connect(&target.addr).await {
            self.set_state(ConnectionState::Idle);
            return Err(e);
        }

        if let Err(e) = self.check_service(&target.service).await {
            self.disconnect().await;
            return Err(e);
        }
        self.set_state(ConnectionState::Connected);

        let service = parse_ble_uuid(&target.service)?;
        self.subscribe(service, &target.charact).await
    }

    async fn connect(&mut self, address: &str) -> Result<()> {
        for kind in AddressKind::FALLBACK_ORDER {
            match timeout(self.config.connect_timeout, self.radio.connect(address, kind)).await {
                Ok(Ok(())) => {
                    info!(%address, %kind, "Connected to scanner");
                    return Ok(());
                }
                Ok(Err(e)) => debug!(%address, %kind, "Connection attempt failed: {}", e),
                Err(_) => debug!(
                    %address,
                    %kind,
                    timeout_ms = self.config.connect_timeout.as_millis() as u64,
                    "Connection attempt timed out"
                ),
            }
        }

        Err(Error::ConnectionFailure {
            address: address.to_string(),
        })
    }

    async fn check_service(&mut self, service: &str) -> Result<()> {
        let uuid = parse_ble_uuid(service)?;
        if !self.radio.has_service(uuid).await? {
            return Err(Error::ServiceNotFound(service.to_string()));
        }
        debug!(%uuid, "Scanner service present");
        Ok(())
    }

    async fn subscribe(&mut self, service: Uuid, characteristic: &str) -> Result<()> {
        let unsubscribable = |reason: &str| Error::CharacteristicUnsubscribable {
            characteristic: characteristic.to_string(),
            reason: reason.to_string(),
        };

        if characteristic.is_empty() {
            return Err(unsubscribable("no characteristic configured"));
        }
        let uuid = parse_ble_uuid(characteristic)?;

        let info = self
            .radio
            .characteristic(service, uuid)
            .await?
            .ok_or_else(|| unsubscribable("not found"))?;
        if !info.readable {
            return Err(unsubscribable("not readable"));
        }
        if !info.notifiable {
            return Err(unsubscribable("not notifiable"));
        }

        let stream = self
            .radio
            .subscribe(service, uuid)
            .await
            .map_err(|e| unsubscribable(&e.to_string()))?;

        self.store.set_characteristic(uuid.to_string());
        self.start_pump(stream);
        self.subscribed = Some(uuid);
        info!(characteristic = %uuid, "Subscribed to scanner notifications");
        Ok(())
    }

    fn start_pump(&mut self, mut stream: NotificationStream) {
        let reassembler = self.reassembler.clone();
        let pump = tokio::spawn(async move {
            while let Some(chunk) = stream.recv().await {
                reassembler.on_chunk(&chunk);
            }
            debug!("Notification stream closed");
        });

        if let Some(previous) = self.pump.replace(pump) {
            previous.abort();
        }
    }

    /// Drop the link and return to `Idle`.
    ///
    /// Safe to call in any state, any number of times.
    pub async fn disconnect(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.subscribed = None;

        if let Err(e) = self.radio.disconnect().await {
            warn!("Disconnect failed: {}", e);
        }
        self.set_state(ConnectionState::Idle);
    }

    /// Tick forever on [`SESSION_TICK`], waking early for disconnect requests.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(SESSION_TICK);
        let requests = Arc::clone(&self.requests);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = requests.wake.notified() => {}
            }
            self.tick().await;
        }
    }
}

impl<R> Drop for SessionManager<R> {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
