//! Scan record processing and operator controls.

use chrono::Utc;
use ptl_access::{
    AccessLog, AccessResolver, ConfigStore, Event, EventSink, LogEntry, Resolution, ScanPayload,
    TableStore,
};
use ptl_blink::BlinkHandle;
use ptl_core::{Error, PinAddress};
use ptl_link::{NotificationReassembler, ScanRecord, SessionHandle};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Turns finished scan records into blink jobs, log entries and events.
#[derive(Clone)]
pub struct ScanPipeline {
    config: ConfigStore,
    tables: TableStore,
    blink: BlinkHandle,
    log: Arc<Mutex<AccessLog>>,
    sink: Arc<dyn EventSink>,
}

impl ScanPipeline {
    pub fn new(
        config: ConfigStore,
        tables: TableStore,
        blink: BlinkHandle,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            tables,
            blink,
            log: Arc::new(Mutex::new(AccessLog::new())),
            sink,
        }
    }

    /// Resolve one record and act on it.
    ///
    /// Every record is logged and published. Only a code found in the table
    /// starts a blink; a miss is published with an empty pin name.
    pub fn process_scan(&self, record: &ScanRecord) -> Resolution {
        let code = record.text().into_owned();
        if record.is_truncated() {
            warn!(code = %code, "Processing truncated scan record");
        }

        let resolver = AccessResolver::new(self.tables.snapshot(), self.config.snapshot().pins);
        let resolution = resolver.resolve(&code);
        if resolution.is_miss() {
            info!("{}", Error::LookupMiss(code.clone()));
        } else {
            info!(code = %code, pin = %resolution.pin_name, index = %resolution.index, "Scan resolved");
            self.blink.trigger(resolution.index);
        }

        let t = Utc::now().timestamp();
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_at(t, resolution.pin_name.clone(), code.clone());

        self.sink.emit(Event::Scan(ScanPayload {
            code,
            pin: resolution.pin_name.clone(),
            t,
        }));

        resolution
    }

    /// Recent scans, oldest first.
    pub fn access_log(&self) -> Vec<LogEntry> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .cloned()
            .collect()
    }

    /// Process records as they become ready.
    pub async fn run(self, reassembler: NotificationReassembler) {
        loop {
            let record = reassembler.recv().await;
            self.process_scan(&record);
        }
    }
}

/// Operator actions on a running controller.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    config: ConfigStore,
    tables: TableStore,
    session: SessionHandle,
    blink: BlinkHandle,
}

impl ControlHandle {
    pub fn new(
        config: ConfigStore,
        tables: TableStore,
        session: SessionHandle,
        blink: BlinkHandle,
    ) -> Self {
        Self {
            config,
            tables,
            session,
            blink,
        }
    }

    pub fn blink(&self, pin: PinAddress) {
        self.blink.trigger(pin);
    }

    /// Walk every line from `start`, continuing past missing buses.
    pub fn sweep(&self, start: PinAddress) {
        self.blink.sweep(start);
    }

    /// Point the session at a different scanner.
    ///
    /// The current link, if any, is dropped on the session's next tick and
    /// the new target is picked up by the following poll.
    pub fn set_target(&self, address: &str, service: &str, characteristic: &str) {
        info!(address, service, characteristic, "Retargeting session");
        self.config.set_target(address, service, characteristic);
        self.session.request_disconnect();
    }

    pub fn reload_table(&self, path: &Path) -> ptl_core::Result<()> {
        self.tables.reload(path)
    }
}
