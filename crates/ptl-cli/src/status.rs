//! Periodic status reporting and configuration persistence.

use ptl_access::{ConfigStore, Event, EventSink, StatusPayload, TableStore};
use ptl_link::{PeerDeviceRegistry, SessionHandle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Sources of one status payload.
#[derive(Debug, Clone)]
pub struct StatusSources {
    pub session: SessionHandle,
    pub registry: PeerDeviceRegistry,
    pub config: ConfigStore,
    pub tables: TableStore,
}

impl StatusSources {
    pub fn payload(&self) -> StatusPayload {
        StatusPayload::new(
            self.session.state(),
            self.tables.last_read(),
            self.config.last_write(),
            self.registry.snapshot(),
        )
    }
}

/// Emit a status event every `interval`.
///
/// When `persist` names a file, configuration changes made since the last
/// report (a retarget, or a characteristic resolved by the session) are
/// written back to it.
pub async fn run_status_loop(
    sources: StatusSources,
    sink: Arc<dyn EventSink>,
    interval: Duration,
    persist: Option<PathBuf>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut saved = sources.config.snapshot();

    loop {
        ticker.tick().await;

        if let Some(path) = &persist {
            let current = sources.config.snapshot();
            if current != saved {
                match sources.config.save(path) {
                    Ok(()) => saved = current,
                    Err(e) => warn!("Saving configuration failed: {}", e),
                }
            }
        }

        sink.emit(Event::Status(sources.payload()));
    }
}
