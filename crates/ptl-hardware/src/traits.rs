//! Hardware device trait definitions.
//!
//! This module defines the two seams between the controller core and its
//! peripherals: expander chips that drive indicator lines, and the radio link
//! that reaches the wireless scanner. Mock and real implementations are
//! interchangeable behind these traits.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{AddressKind, AdvertisedPeer, BusLayout, CharacteristicInfo, LineGroup};
use bytes::Bytes;
use ptl_core::LineLevel;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Stream of raw notification chunks from a subscribed characteristic.
///
/// Chunks arrive exactly as the radio delivered them; record boundaries are
/// recovered by the reassembler.
pub type NotificationStream = mpsc::Receiver<Bytes>;

/// Output expander chip hosted on one bus.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters, or the
/// [`AnyExpander`](crate::devices::AnyExpander) enum wrapper for dispatch.
///
/// # Examples
///
/// ```no_run
/// use ptl_hardware::traits::ExpanderChip;
/// use ptl_hardware::types::LineGroup;
/// use ptl_hardware::error::Result;
/// use ptl_core::LineLevel;
///
/// async fn blank<C: ExpanderChip>(chip: &mut C) -> Result<()> {
///     chip.write_group(LineGroup::Gpio, LineLevel::DARK).await?;
///     chip.write_group(LineGroup::Gpo, LineLevel::DARK).await
/// }
/// ```
pub trait ExpanderChip: Send + Sync {
    /// Check whether the chip answers on its bus.
    ///
    /// Called exactly once at startup; the answer fixes bus presence for the
    /// lifetime of the process.
    async fn probe(&mut self) -> Result<bool>;

    /// Put every line into output mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration transfer fails.
    async fn configure(&mut self) -> Result<()>;

    /// Drive a single line.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is outside the group or the bus transfer fails.
    async fn write_line(&mut self, group: LineGroup, offset: u8, level: LineLevel) -> Result<()>;

    /// Drive every line of a group to the same level.
    async fn write_group(&mut self, group: LineGroup, level: LineLevel) -> Result<()>;

    /// Line-group sizes of this chip.
    fn layout(&self) -> BusLayout;
}

/// Radio link to the wireless scanner.
///
/// A link owns at most one connection at a time. The session drives it
/// through discovery, connection, capability checks and subscription.
///
/// # Object Safety and Dynamic Dispatch
///
/// Like [`ExpanderChip`], this trait is not object-safe; use
/// [`AnyRadio`](crate::devices::AnyRadio) for dispatch.
///
/// # Examples
///
/// ```no_run
/// use ptl_hardware::traits::RadioLink;
/// use ptl_hardware::error::Result;
/// use std::time::Duration;
///
/// async fn addresses<R: RadioLink>(radio: &mut R) -> Result<Vec<String>> {
///     let peers = radio.scan(Duration::from_secs(5)).await?;
///     Ok(peers.into_iter().map(|p| p.address).collect())
/// }
/// ```
pub trait RadioLink: Send + Sync {
    /// Run a discovery scan for the given duration and report every peer seen.
    async fn scan(&mut self, duration: Duration) -> Result<Vec<AdvertisedPeer>>;

    /// Open a link to `address`, interpreting it as the given address kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer does not accept the connection.
    async fn connect(&mut self, address: &str, kind: AddressKind) -> Result<()>;

    /// Whether the link is currently up.
    async fn is_connected(&self) -> Result<bool>;

    /// Whether the connected peer exposes `service`.
    async fn has_service(&mut self, service: Uuid) -> Result<bool>;

    /// Look up a characteristic of a service on the connected peer.
    ///
    /// Returns `Ok(None)` when the service has no such characteristic.
    async fn characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Option<CharacteristicInfo>>;

    /// Subscribe to notifications of a characteristic.
    async fn subscribe(&mut self, service: Uuid, characteristic: Uuid)
    -> Result<NotificationStream>;

    /// Tear down remote service state and close the link.
    ///
    /// Closing an already closed link succeeds.
    async fn disconnect(&mut self) -> Result<()>;
}
