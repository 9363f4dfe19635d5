//! Status and scan events published to management clients.
//!
//! Events are named and carry a JSON payload, matching a server-sent-events
//! stream:
//!
//! ```text
//! event: status   {"status":2,"r":1718000000,"w":1718000000,"devices":[...]}
//! event: scan     {"code":"4006381333931","pin":"A1","t":1718000042}
//! ```

use ptl_core::{ConnectionState, PeerDevice, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default buffer of the broadcast sink; slow subscribers lose older events.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Periodic controller status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Connection status code, see [`ConnectionState::status_code`].
    pub status: u8,

    /// Unix time the access table was last read.
    pub r: i64,

    /// Unix time the configuration was last written.
    pub w: i64,

    /// Peers discovered so far.
    pub devices: Vec<PeerDevice>,
}

impl StatusPayload {
    pub fn new(
        state: ConnectionState,
        last_table_read: i64,
        last_config_write: i64,
        devices: Vec<PeerDevice>,
    ) -> Self {
        Self {
            status: state.status_code(),
            r: last_table_read,
            w: last_config_write,
            devices,
        }
    }
}

/// One processed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPayload {
    pub code: String,

    /// Resolved pin name; empty when the code is not in the table.
    pub pin: String,

    /// Unix time of the scan.
    pub t: i64,
}

/// Event published to management clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Status(StatusPayload),
    Scan(ScanPayload),
}

impl Event {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Scan(_) => "scan",
        }
    }

    /// JSON payload.
    pub fn to_json(&self) -> Result<String> {
        Ok(match self {
            Self::Status(payload) => serde_json::to_string(payload)?,
            Self::Scan(payload) => serde_json::to_string(payload)?,
        })
    }
}

/// Destination for published events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Fan-out sink over a tokio broadcast channel.
///
/// Emitting with no subscribers is not an error; the event is dropped.
///
/// # Examples
///
/// ```
/// use ptl_access::{BroadcastSink, Event, EventSink, ScanPayload};
///
/// # #[tokio::main]
/// # async fn main() {
/// let sink = BroadcastSink::new();
/// let mut rx = sink.subscribe();
///
/// sink.emit(Event::Scan(ScanPayload { code: "1".into(), pin: "A1".into(), t: 0 }));
/// assert_eq!(rx.recv().await.unwrap().name(), "scan");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Event>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: Event) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            trace!(event = name, "No event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payload_shape() {
        let payload = StatusPayload::new(
            ConnectionState::Connected,
            10,
            20,
            vec![PeerDevice::new("AA:BB", "svc")],
        );
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["status"], 2);
        assert_eq!(json["r"], 10);
        assert_eq!(json["w"], 20);
        assert_eq!(json["devices"][0]["address"], "AA:BB");
        assert_eq!(json["devices"][0]["service"], "svc");
    }

    #[test]
    fn test_transient_states_report_not_connected() {
        for state in [
            ConnectionState::Idle,
            ConnectionState::Scanning,
            ConnectionState::Connecting,
        ] {
            assert_eq!(StatusPayload::new(state, 0, 0, vec![]).status, 1);
        }
    }

    #[test]
    fn test_event_names_and_json() {
        let event = Event::Scan(ScanPayload {
            code: "123".into(),
            pin: String::new(),
            t: 5,
        });
        assert_eq!(event.name(), "scan");
        assert_eq!(event.to_json().unwrap(), r#"{"code":"123","pin":"","t":5}"#);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let sink = BroadcastSink::new();
        let mut a = sink.subscribe();
        let mut b = sink.subscribe();

        sink.emit(Event::Status(StatusPayload::new(
            ConnectionState::Idle,
            0,
            0,
            vec![],
        )));

        assert_eq!(a.recv().await.unwrap().name(), "status");
        assert_eq!(b.recv().await.unwrap().name(), "status");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let sink = BroadcastSink::new();
        sink.emit(Event::Scan(ScanPayload {
            code: "1".into(),
            pin: "A1".into(),
            t: 0,
        }));
    }
}
