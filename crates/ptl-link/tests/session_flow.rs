//! End-to-end session tests against the mock radio.
//!
//! These tests drive the session through discovery, subscription and record
//! delivery the way the controller does, including link loss and retargeting.

use ptl_access::{Config, ConfigStore};
use ptl_core::{ConnectionState, short_uuid};
use ptl_hardware::mock::{MockRadio, MockRadioHandle};
use ptl_hardware::{AddressKind, AdvertisedPeer, CharacteristicInfo};
use ptl_link::{NotificationReassembler, PeerDeviceRegistry, SessionConfig, SessionManager};
use rstest::rstest;
use std::time::Duration;

const SCANNER: &str = "AA:BB:CC:DD:EE:FF";

struct Rig {
    manager: SessionManager<MockRadio>,
    radio: MockRadioHandle,
    store: ConfigStore,
    reassembler: NotificationReassembler,
    registry: PeerDeviceRegistry,
}

fn rig(charact: &str, readable: bool, notifiable: bool) -> Rig {
    let (radio, handle) = MockRadio::new();
    handle.add_peer(AdvertisedPeer::new(SCANNER).with_service(short_uuid(0xFFE0)));
    handle.accept(SCANNER, AddressKind::Public);
    handle.add_service(
        short_uuid(0xFFE0),
        vec![CharacteristicInfo::new(
            short_uuid(0xFFE1),
            readable,
            notifiable,
        )],
    );

    let store = ConfigStore::new(Config {
        addr: SCANNER.into(),
        service: "ffe0".into(),
        charact: charact.into(),
        pins: vec!["A1".into()],
        ..Config::default()
    });
    let reassembler = NotificationReassembler::new();
    let registry = PeerDeviceRegistry::new();
    let manager = SessionManager::new(
        radio,
        SessionConfig::default(),
        store.clone(),
        registry.clone(),
        reassembler.clone(),
    );

    Rig {
        manager,
        radio: handle,
        store,
        reassembler,
        registry,
    }
}

#[tokio::test]
async fn test_subscribes_and_delivers_records() {
    let mut rig = rig("ffe1", true, true);

    assert_eq!(rig.manager.tick().await, ConnectionState::Connected);
    assert_eq!(rig.manager.subscribed(), Some(short_uuid(0xFFE1)));
    assert_eq!(rig.radio.subscriptions(), vec![short_uuid(0xFFE1)]);
    assert_eq!(rig.registry.find(SCANNER), Some(0));

    rig.radio.send_chunk(b"40063").await.unwrap();
    rig.radio.send_chunk(b"81\r").await.unwrap();

    let record = tokio::time::timeout(Duration::from_secs(1), rig.reassembler.recv())
        .await
        .unwrap();
    assert_eq!(record.text(), "4006381");
}

#[tokio::test]
async fn test_characteristic_written_back_in_full_form() {
    let mut rig = rig("FFE1", true, true);

    rig.manager.tick().await;

    assert_eq!(
        rig.store.snapshot().charact,
        "0000ffe1-0000-1000-8000-00805f9b34fb"
    );
}

#[rstest]
#[case::not_readable(false, true)]
#[case::not_notifiable(true, false)]
#[case::neither(false, false)]
#[tokio::test(start_paused = true)]
async fn test_unsubscribable_parks_connected_without_retry(
    #[case] readable: bool,
    #[case] notifiable: bool,
) {
    let mut rig = rig("ffe1", readable, notifiable);

    assert_eq!(rig.manager.tick().await, ConnectionState::Connected);
    assert!(rig.manager.subscribed().is_none());
    assert_eq!(rig.store.snapshot().charact, "ffe1");

    tokio::time::advance(SessionConfig::default().poll_interval).await;
    assert_eq!(rig.manager.tick().await, ConnectionState::Connected);
    assert_eq!(rig.radio.scan_count(), 1);
    assert!(rig.radio.subscriptions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_polls_only_once_per_interval() {
    let mut rig = rig("ffe1", true, true);
    rig.radio.drop_link();
    rig.store.set_target("11:22:33:44:55:66", "ffe0", "ffe1");

    rig.manager.tick().await;
    rig.manager.tick().await;
    assert_eq!(rig.radio.scan_count(), 1);

    tokio::time::advance(Duration::from_secs(10)).await;
    rig.manager.tick().await;
    assert_eq!(rig.radio.scan_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_link_loss_returns_to_idle_and_reconnects() {
    let mut rig = rig("ffe1", true, true);
    assert_eq!(rig.manager.tick().await, ConnectionState::Connected);

    rig.radio.drop_link();
    tokio::time::advance(Duration::from_secs(10)).await;

    assert_eq!(rig.manager.tick().await, ConnectionState::Connected);
    assert_eq!(rig.radio.scan_count(), 2);
    assert_eq!(rig.radio.subscriptions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connect_attempts_are_time_boxed() {
    let mut rig = rig("ffe1", true, true);
    rig.radio.set_connect_delay(Duration::from_secs(60));

    let state = rig.manager.tick().await;

    assert_eq!(state, ConnectionState::Idle);
    assert_eq!(rig.radio.connect_attempts().len(), 2);
    assert!(!rig.radio.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_scan_is_time_boxed() {
    let mut rig = rig("ffe1", true, true);
    rig.radio.set_scan_delay(Duration::from_secs(3_600));

    let started = tokio::time::Instant::now();
    let state = rig.manager.tick().await;

    assert_eq!(state, ConnectionState::Idle);
    let elapsed = started.elapsed();
    assert!(elapsed >= SessionConfig::default().scan_timeout());
    assert!(elapsed < Duration::from_secs(3_600));
    assert_eq!(rig.radio.scan_count(), 1);
    assert!(rig.radio.connect_attempts().is_empty());
    assert!(rig.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_request_answered_after_stuck_scan() {
    let rig = rig("ffe1", true, true);
    rig.radio.set_scan_delay(Duration::from_secs(3_600));
    let handle = rig.manager.handle();

    tokio::spawn(rig.manager.run());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.state(), ConnectionState::Scanning);

    handle.request_disconnect();
    tokio::time::sleep(SessionConfig::default().scan_timeout()).await;
    assert!(rig.radio.disconnect_count() >= 1);
}

#[tokio::test]
async fn test_disconnect_request_applies_on_next_tick() {
    let mut rig = rig("ffe1", true, true);
    let handle = rig.manager.handle();
    rig.manager.tick().await;
    assert_eq!(handle.state(), ConnectionState::Connected);

    handle.request_disconnect();
    let state = rig.manager.tick().await;

    assert_eq!(state, ConnectionState::Idle);
    assert_eq!(handle.state(), ConnectionState::Idle);
    assert_eq!(rig.radio.disconnect_count(), 1);
    assert!(rig.radio.send_chunk(b"x").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_connects_in_background() {
    let rig = rig("ffe1", true, true);
    let handle = rig.manager.handle();
    let mut states = handle.watch();

    tokio::spawn(rig.manager.run());

    tokio::time::timeout(Duration::from_secs(5), async {
        while *states.borrow_and_update() != ConnectionState::Connected {
            states.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    rig.radio.send_chunk(b"123\r").await.unwrap();
    let record = tokio::time::timeout(Duration::from_secs(1), rig.reassembler.recv())
        .await
        .unwrap();
    assert_eq!(record.text(), "123");
}
