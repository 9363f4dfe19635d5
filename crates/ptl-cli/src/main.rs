//! putlight controller
//!
//! Connects to a wireless barcode/card scanner, looks every scanned code up
//! in the access table and blinks the matching indicator line.
//!
//! # Usage
//!
//! ```bash
//! # Everything simulated; type codes on stdin to scan them
//! putlight --simulate
//!
//! # Real scanner through the host Bluetooth stack
//! cargo run -p ptl-cli --features ble -- --config config.json --table table.json
//! ```
//!
//! Events are printed to stdout, one per line, as `event: <name> <json>`.

mod console;
mod pipeline;
mod status;

use anyhow::Context;
use clap::Parser;
use console::Command;
use pipeline::{ControlHandle, ScanPipeline};
use ptl_access::{AccessTable, BroadcastSink, Config, ConfigStore, EventSink, TableStore};
use ptl_blink::{BlinkConfig, BlinkScheduler};
use ptl_core::{parse_ble_uuid, short_uuid};
use ptl_hardware::mock::{MockExpander, MockRadio, MockRadioHandle};
use ptl_hardware::{AddressKind, AdvertisedPeer, AnyRadio, BusSlot, CharacteristicInfo, PinExpanderBus};
use ptl_link::{NotificationReassembler, PeerDeviceRegistry, SessionConfig, SessionManager};
use status::StatusSources;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Scanner address used by `--simulate` when the configuration names none.
const SIMULATED_SCANNER: &str = "00:00:5E:00:53:01";

/// Put-to-light controller
#[derive(Parser, Debug)]
#[command(name = "putlight")]
#[command(author, version, about = "Put-to-light controller", long_about = None)]
struct Cli {
    /// Configuration document
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Access table
    #[arg(short, long, default_value = "table.json")]
    table: PathBuf,

    /// Seconds between status events
    #[arg(long, default_value = "10")]
    status_interval: u64,

    /// Seconds between scanner reconnect polls
    #[arg(long, default_value = "10")]
    poll_interval: u64,

    /// Use a simulated scanner fed from stdin
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Starting putlight v{}", ptl_core::VERSION);

    let config = ConfigStore::load(&cli.config).unwrap_or_else(|e| {
        warn!("{}; starting with an empty configuration", e);
        ConfigStore::new(Config::default())
    });
    let tables = TableStore::load(&cli.table).unwrap_or_else(|e| {
        warn!("{}; starting with an empty access table", e);
        TableStore::new(AccessTable::new())
    });

    let (radio, simulator) = open_radio(cli.simulate, &config).await?;

    // Output lines are simulated; nothing on the host exposes the expander I2C buses.
    let bus = PinExpanderBus::new(
        BusSlot::probe(MockExpander::with_presence("bus0", true).0).await,
        BusSlot::probe(MockExpander::with_presence("bus1", true).0).await,
    );
    let scheduler = BlinkScheduler::new(bus, BlinkConfig::default());
    let blink = scheduler.handle();

    let registry = PeerDeviceRegistry::new();
    let reassembler = NotificationReassembler::new();
    let session = SessionManager::new(
        radio,
        SessionConfig {
            poll_interval: Duration::from_secs(cli.poll_interval.max(1)),
            ..SessionConfig::default()
        },
        config.clone(),
        registry.clone(),
        reassembler.clone(),
    );

    let sink = BroadcastSink::new();
    let events = sink.subscribe();
    let sink: Arc<dyn EventSink> = Arc::new(sink);

    let pipeline = ScanPipeline::new(config.clone(), tables.clone(), blink.clone(), Arc::clone(&sink));
    let control = ControlHandle::new(config.clone(), tables.clone(), session.handle(), blink);
    let sources = StatusSources {
        session: session.handle(),
        registry,
        config,
        tables,
    };

    tokio::spawn(print_events(events));
    tokio::spawn(scheduler.run());
    tokio::spawn(session.run());
    tokio::spawn(pipeline.clone().run(reassembler));
    tokio::spawn(status::run_status_loop(
        sources,
        sink,
        Duration::from_secs(cli.status_interval.max(1)),
        (!cli.simulate).then(|| cli.config.clone()),
    ));

    tokio::select! {
        _ = run_console(control, pipeline, simulator, cli.table) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Listening for Ctrl-C failed")?;
            info!("Shutting down");
        }
    }

    Ok(())
}

/// Open the scanner radio, or script a simulated one around the configured target.
async fn open_radio(
    simulate: bool,
    config: &ConfigStore,
) -> anyhow::Result<(AnyRadio, Option<MockRadioHandle>)> {
    if simulate {
        let (radio, handle) = MockRadio::new();

        let mut target = config.snapshot();
        if !target.has_target() {
            config.set_target(SIMULATED_SCANNER, "ffe0", "ffe1");
            target = config.snapshot();
        }

        let service = parse_ble_uuid(&target.service).unwrap_or_else(|_| short_uuid(0xFFE0));
        let characteristic = parse_ble_uuid(&target.charact).unwrap_or_else(|_| short_uuid(0xFFE1));
        handle.add_peer(AdvertisedPeer::new(target.addr.clone()).with_service(service));
        handle.accept(target.addr.clone(), AddressKind::Public);
        handle.add_service(service, vec![CharacteristicInfo::new(characteristic, true, true)]);

        info!(address = %target.addr, "Simulated scanner ready; type codes on stdin");
        return Ok((AnyRadio::Mock(radio), Some(handle)));
    }

    Ok((open_bluetooth().await?, None))
}

#[cfg(feature = "ble")]
async fn open_bluetooth() -> anyhow::Result<AnyRadio> {
    let radio = ptl_hardware::btleplug::BtleplugRadio::open()
        .await
        .context("Opening Bluetooth adapter failed")?;
    Ok(AnyRadio::Btleplug(radio))
}

#[cfg(not(feature = "ble"))]
async fn open_bluetooth() -> anyhow::Result<AnyRadio> {
    anyhow::bail!("built without the `ble` feature; run with --simulate")
}

/// Print published events to stdout until the sink closes.
async fn print_events(mut events: tokio::sync::broadcast::Receiver<ptl_access::Event>) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(event) => match event.to_json() {
                Ok(json) => println!("event: {} {}", event.name(), json),
                Err(e) => warn!("Encoding {} event failed: {}", event.name(), e),
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagging"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Read operator commands from stdin until it closes.
async fn run_console(
    control: ControlHandle,
    pipeline: ScanPipeline,
    simulator: Option<MockRadioHandle>,
    table_path: PathBuf,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Console closed");
                break;
            }
            Err(e) => {
                error!("Reading console failed: {}", e);
                break;
            }
        };

        let command = match Command::parse(&line) {
            Some(Ok(command)) => command,
            Some(Err(e)) => {
                warn!("{}", e);
                continue;
            }
            None => continue,
        };

        match command {
            Command::Scan(code) => match &simulator {
                Some(radio) => {
                    let mut chunk = code.into_bytes();
                    chunk.push(ptl_core::constants::RECORD_SENTINEL);
                    if let Err(e) = radio.send_chunk(&chunk).await {
                        warn!("Simulated scanner not connected: {}", e);
                    }
                }
                None => warn!("Codes can only be typed with --simulate"),
            },
            Command::Blink(pin) => control.blink(pin),
            Command::Sweep(start) => control.sweep(start),
            Command::Target {
                address,
                service,
                characteristic,
            } => control.set_target(&address, &service, &characteristic),
            Command::Reload => {
                if let Err(e) = control.reload_table(&table_path) {
                    warn!("Reloading access table failed: {}", e);
                }
            }
            Command::Log => {
                for entry in pipeline.access_log() {
                    println!("log: {} {} {}", entry.timestamp, entry.pin, entry.code);
                }
            }
        }
    }

    // Keep serving without a console.
    std::future::pending::<()>().await
}
