//! Radio link backed by the host Bluetooth stack.
//!
//! Peers are looked up among the adapter's known peripherals by their
//! printed address. The host stack decides the address type on its own, so a
//! [`AddressKind::Random`] attempt is a plain second connection attempt.

use crate::{
    HardwareError, Result,
    traits::{NotificationStream, RadioLink},
    types::{AddressKind, AdvertisedPeer, CharacteristicInfo},
};
use btleplug::api::{
    CharPropFlags, Central, Characteristic, Manager as _, Peripheral as _, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

fn radio_error(context: &str, error: btleplug::Error) -> HardwareError {
    HardwareError::radio(format!("{context}: {error}"))
}

/// Radio link on the first Bluetooth adapter of the host.
#[derive(Debug)]
pub struct BtleplugRadio {
    adapter: Adapter,
    peripheral: Option<Peripheral>,
    subscribed: Option<Characteristic>,
    forwarder: Option<JoinHandle<()>>,
}

impl BtleplugRadio {
    /// Open the first adapter reported by the host stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack is unavailable or reports no adapter.
    pub async fn open() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|e| HardwareError::initialization_failed(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| HardwareError::initialization_failed(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| HardwareError::not_found("Bluetooth adapter"))?;

        info!("Bluetooth adapter opened");
        Ok(Self {
            adapter,
            peripheral: None,
            subscribed: None,
            forwarder: None,
        })
    }

    fn connected_peripheral(&self) -> Result<&Peripheral> {
        self.peripheral
            .as_ref()
            .ok_or_else(|| HardwareError::disconnected("bluetooth link"))
    }

    fn find_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<Option<Characteristic>> {
        Ok(self
            .connected_peripheral()?
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic))
    }

    async fn find_peripheral(&self, address: &str) -> Result<Peripheral> {
        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| radio_error("peripheral list", e))?;

        peripherals
            .into_iter()
            .find(|p| p.address().to_string().eq_ignore_ascii_case(address))
            .ok_or_else(|| HardwareError::not_found(format!("peer {address}")))
    }
}

impl RadioLink for BtleplugRadio {
    async fn scan(&mut self, duration: Duration) -> Result<Vec<AdvertisedPeer>> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| radio_error("start scan", e))?;
        tokio::time::sleep(duration).await;

        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| radio_error("peripheral list", e))?;

        let mut peers = Vec::new();
        for peripheral in peripherals {
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };
            let mut peer = AdvertisedPeer::new(peripheral.address().to_string());
            peer.name = props.local_name;
            peer.rssi = props.rssi;
            peer.service = props.services.first().copied();
            peers.push(peer);
        }

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }
        debug!(count = peers.len(), "Scan finished");
        Ok(peers)
    }

    async fn connect(&mut self, address: &str, kind: AddressKind) -> Result<()> {
        let peripheral = self.find_peripheral(address).await?;
        debug!(%address, %kind, "Opening link");

        peripheral
            .connect()
            .await
            .map_err(|e| radio_error("connect", e))?;
        peripheral
            .discover_services()
            .await
            .map_err(|e| radio_error("service discovery", e))?;

        self.peripheral = Some(peripheral);
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        match &self.peripheral {
            Some(peripheral) => peripheral
                .is_connected()
                .await
                .map_err(|e| radio_error("link state", e)),
            None => Ok(false),
        }
    }

    async fn has_service(&mut self, service: Uuid) -> Result<bool> {
        Ok(self
            .connected_peripheral()?
            .services()
            .iter()
            .any(|s| s.uuid == service))
    }

    async fn characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Option<CharacteristicInfo>> {
        Ok(self.find_characteristic(service, characteristic)?.map(|c| {
            CharacteristicInfo::new(
                c.uuid,
                c.properties.contains(CharPropFlags::READ),
                c.properties.contains(CharPropFlags::NOTIFY),
            )
        }))
    }

    async fn subscribe(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream> {
        let target = self
            .find_characteristic(service, characteristic)?
            .ok_or_else(|| HardwareError::not_found(format!("characteristic {characteristic}")))?;
        let peripheral = self.connected_peripheral()?.clone();

        peripheral
            .subscribe(&target)
            .await
            .map_err(|e| radio_error("subscribe", e))?;
        let mut notifications = peripheral
            .notifications()
            .await
            .map_err(|e| radio_error("notification stream", e))?;

        let (tx, rx) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);
        let wanted = target.uuid;
        let forwarder = tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid != wanted {
                    continue;
                }
                if tx.send(Bytes::from(notification.value)).await.is_err() {
                    break;
                }
            }
            debug!("Notification stream ended");
        });

        if let Some(previous) = self.forwarder.replace(forwarder) {
            previous.abort();
        }
        self.subscribed = Some(target);
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }

        let Some(peripheral) = self.peripheral.take() else {
            return Ok(());
        };

        if let Some(characteristic) = self.subscribed.take()
            && let Err(e) = peripheral.unsubscribe(&characteristic).await
        {
            debug!("Unsubscribe failed: {}", e);
        }

        peripheral
            .disconnect()
            .await
            .map_err(|e| radio_error("disconnect", e))
    }
}
