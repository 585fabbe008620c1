//! End-to-end scenarios across restarts: the same key-value backend is
//! handed to a fresh controller to simulate a power cycle.

use crate::mock_hw::{MockHardware, MockKv, RecordingNotify, RecordingSink, mock_store};

use airsense::app::events::AppEvent;
use airsense::app::service::StateController;
use airsense::classifier::AirQualityBand;
use airsense::config::AccessoryConfig;
use airsense::state::{AccessoryState, RECORD_LEN};

#[test]
fn power_survives_restart() {
    let config = AccessoryConfig::default();

    // ── First boot: empty store ───────────────────────────────
    let mut store = mock_store(MockKv::new());
    let mut hw = MockHardware::new();
    let mut notify = RecordingNotify::default();
    let mut sink = RecordingSink::default();

    let mut ctl = StateController::new(&config, 0);
    assert!(!ctl.restore(&mut hw, &store, &mut sink));
    assert!(!ctl.read_power());
    assert_eq!(sink.events[0], AppEvent::Restored { found: false });

    ctl.write_power(true, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap();
    assert_eq!(store.kv().sets, 1);

    let record = store.kv().record().unwrap();
    assert_eq!(record.len(), RECORD_LEN);
    let saved = AccessoryState::decode(record).unwrap();
    assert!(saved.power());
    assert_eq!(saved.temperature_c(), 0.0);
    assert_eq!(saved.humidity_pct(), 0.0);
    assert_eq!(saved.air_band(), AirQualityBand::Excellent);
    assert_eq!(saved.air_raw(), 0);

    // ── Second boot: same backend ─────────────────────────────
    let kv = store.kv().map.clone();
    let store = mock_store(MockKv {
        map: kv,
        ..Default::default()
    });
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::default();

    let mut ctl = StateController::new(&config, 0);
    assert!(ctl.restore(&mut hw, &store, &mut sink));
    assert!(ctl.read_power());
    assert!(hw.last_output().unwrap().high);
}

#[test]
fn sensor_values_are_saved_with_next_power_change() {
    let config = AccessoryConfig::default();
    let mut store = mock_store(MockKv::new());
    let mut hw = MockHardware::new();
    let mut notify = RecordingNotify::default();
    let mut sink = RecordingSink::default();
    let mut ctl = StateController::new(&config, 0);
    ctl.restore(&mut hw, &store, &mut sink);

    hw.set_climate(21.0, 48.5);
    hw.air_raw = 2_020;
    ctl.read_temperature(1_000, &mut hw, &mut sink);
    ctl.read_air_quality(&mut hw, &mut sink);
    // Reads alone never touch the store.
    assert_eq!(store.kv().sets, 0);

    ctl.write_power(true, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap();
    let saved = AccessoryState::decode(store.kv().record().unwrap()).unwrap();
    assert_eq!(saved.temperature_c(), 21.0);
    assert_eq!(saved.humidity_pct(), 48.5);
    assert_eq!(saved.air_band(), AirQualityBand::Inferior);
    assert_eq!(saved.air_label(), "Inferior");
}

#[test]
fn corrupt_record_falls_back_to_defaults() {
    let mut kv = MockKv::new();
    kv.map.insert((0, 0), vec![0xFF; 4]);
    let store = mock_store(kv);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::default();

    let mut ctl = StateController::new(&AccessoryConfig::default(), 0);
    assert!(!ctl.restore(&mut hw, &store, &mut sink));
    assert_eq!(ctl.state(), &AccessoryState::default());
    assert!(!hw.last_output().unwrap().high);
}
