//! Integration tests for the StateController → ports pipeline.
//!
//! These run on the host and verify power writes, sampling, classification
//! and notification behaviour against recording mocks.

use crate::mock_hw::{MockHardware, MockKv, RecordingNotify, RecordingSink, mock_store};

use airsense::app::commands::{AccessoryRequest, AccessoryResponse};
use airsense::app::events::{AppEvent, ServerState};
use airsense::app::ports::Characteristic;
use airsense::app::service::StateController;
use airsense::classifier::AirQualityBand;
use airsense::config::{AccessoryConfig, StoreFailurePolicy};
use airsense::error::{Error, SensorError, StoreError};
use airsense::notifier::{CancelToken, WakeOutcome};
use airsense::state::AccessoryState;

fn make_controller() -> (StateController, MockHardware, RecordingNotify, RecordingSink) {
    let config = AccessoryConfig::default();
    (
        StateController::new(&config, 0),
        MockHardware::new(),
        RecordingNotify::default(),
        RecordingSink::default(),
    )
}

// ── Power writes ──────────────────────────────────────────────

#[test]
fn power_change_saves_notifies_and_drives_indicator() {
    let (mut ctl, mut hw, mut notify, mut sink) = make_controller();
    let mut store = mock_store(MockKv::new());

    ctl.write_power(true, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap();

    assert!(ctl.read_power());
    assert_eq!(store.kv().sets, 1);
    assert_eq!(notify.raised, vec![Characteristic::PowerState]);
    let out = hw.last_output().unwrap();
    assert_eq!(out.pin, 4);
    assert!(out.high);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::PowerChanged(true))), 1);
}

#[test]
fn writing_same_power_value_is_a_noop() {
    let (mut ctl, mut hw, mut notify, mut sink) = make_controller();
    let mut store = mock_store(MockKv::new());

    ctl.write_power(false, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap();
    assert_eq!(store.kv().sets, 0);
    assert!(notify.raised.is_empty());
    assert!(hw.outputs.is_empty());

    ctl.write_power(true, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap();
    ctl.write_power(true, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap();
    assert_eq!(store.kv().sets, 1);
    assert_eq!(notify.raised.len(), 1);
    assert_eq!(hw.outputs.len(), 1);
}

#[test]
fn degrade_policy_keeps_running_after_save_failure() {
    let (mut ctl, mut hw, mut notify, mut sink) = make_controller();
    let mut store = mock_store(MockKv {
        fail_sets: 10,
        ..Default::default()
    });

    ctl.write_power(true, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap();

    assert!(ctl.read_power());
    assert!(ctl.is_degraded());
    assert_eq!(notify.raised, vec![Characteristic::PowerState]);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::StoreDegraded(_))), 1);

    // Next successful save clears the flag.
    store.kv_mut().fail_sets = 0;
    ctl.write_power(false, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap();
    assert!(!ctl.is_degraded());
}

#[test]
fn halt_policy_reports_store_failure_without_notifying() {
    let config = AccessoryConfig {
        store_failure_policy: StoreFailurePolicy::Halt,
        ..Default::default()
    };
    let mut ctl = StateController::new(&config, 0);
    let (mut hw, mut notify, mut sink) = (
        MockHardware::new(),
        RecordingNotify::default(),
        RecordingSink::default(),
    );
    let mut store = mock_store(MockKv {
        fail_sets: 10,
        ..Default::default()
    });

    let err = ctl
        .write_power(true, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Write(_))));
    assert!(notify.raised.is_empty());
    // One attempt plus the default three retries.
    assert_eq!(store.kv().sets, 4);
}

#[test]
fn halted_write_leaves_power_unchanged_and_retry_persists() {
    let config = AccessoryConfig {
        store_failure_policy: StoreFailurePolicy::Halt,
        ..Default::default()
    };
    let mut ctl = StateController::new(&config, 0);
    let (mut hw, mut notify, mut sink) = (
        MockHardware::new(),
        RecordingNotify::default(),
        RecordingSink::default(),
    );
    // Exactly enough failures to exhaust one save with retries.
    let mut store = mock_store(MockKv {
        fail_sets: 4,
        ..Default::default()
    });

    assert!(
        ctl.write_power(true, &mut hw, &mut store, &mut notify, &mut sink)
            .is_err()
    );
    assert!(!ctl.read_power(), "failed save must not flip the power flag");
    assert!(hw.outputs.is_empty(), "indicator must not follow an unsaved write");

    ctl.write_power(true, &mut hw, &mut store, &mut notify, &mut sink)
        .unwrap();
    assert!(ctl.read_power());
    assert_eq!(store.kv().sets, 5);
    let saved = AccessoryState::decode(store.kv().record().unwrap()).unwrap();
    assert!(saved.power());
    assert!(hw.last_output().unwrap().high);
    assert_eq!(notify.raised, vec![Characteristic::PowerState]);
}

// ── Climate reads ─────────────────────────────────────────────

#[test]
fn temperature_and_humidity_share_one_rate_limited_sample() {
    let (mut ctl, mut hw, _notify, mut sink) = make_controller();
    hw.set_climate(23.4, 55.0);

    assert_eq!(ctl.read_temperature(1_000, &mut hw, &mut sink), 23.4);
    assert_eq!(ctl.read_humidity(1_200, &mut hw, &mut sink), 55.0);
    assert_eq!(hw.climate_reads, 1);

    hw.set_climate(24.0, 56.0);
    assert_eq!(ctl.read_humidity(1_500, &mut hw, &mut sink), 56.0);
    assert_eq!(hw.climate_reads, 2);
}

#[test]
fn sensor_failure_serves_cached_values() {
    let (mut ctl, mut hw, _notify, mut sink) = make_controller();
    hw.set_climate(19.0, 33.0);
    ctl.read_temperature(0, &mut hw, &mut sink);

    hw.climate = Err(SensorError::Checksum);
    assert_eq!(ctl.read_temperature(2_000, &mut hw, &mut sink), 19.0);
    assert_eq!(ctl.read_humidity(2_100, &mut hw, &mut sink), 33.0);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SensorReadFailed(SensorError::Checksum))),
        2
    );
}

#[test]
fn sensor_failure_before_first_sample_returns_zero() {
    let (mut ctl, mut hw, _notify, mut sink) = make_controller();
    hw.climate = Err(SensorError::Timeout("response low"));
    assert_eq!(ctl.read_temperature(0, &mut hw, &mut sink), 0.0);
}

// ── Air quality ───────────────────────────────────────────────

#[test]
fn air_quality_read_classifies_and_updates_label() {
    let (mut ctl, mut hw, _notify, mut sink) = make_controller();

    hw.air_raw = 1_950;
    assert_eq!(ctl.read_air_quality(&mut hw, &mut sink), 3);
    assert_eq!(ctl.state().air_band(), AirQualityBand::Fair);
    assert_eq!(ctl.state().air_label(), "Fair");

    hw.air_raw = 2_100;
    assert_eq!(ctl.read_air_quality(&mut hw, &mut sink), 5);
    assert_eq!(ctl.state().air_raw(), 2_100);

    let last = sink.events.last().unwrap();
    assert!(matches!(last, AppEvent::StateUpdated(s) if s.air_label() == "Poor"));
}

// ── Identify / lifecycle ──────────────────────────────────────

#[test]
fn identify_has_no_state_effect() {
    let (mut ctl, _hw, _notify, mut sink) = make_controller();
    let before = ctl.state().clone();
    ctl.identify(&mut sink);
    assert_eq!(ctl.state(), &before);
    assert_eq!(sink.events, vec![AppEvent::Identified]);
}

#[test]
fn server_state_changes_are_published() {
    let (mut ctl, _hw, _notify, mut sink) = make_controller();
    ctl.on_server_state(ServerState::Running, &mut sink);
    ctl.on_server_state(ServerState::Stopping, &mut sink);
    assert_eq!(ctl.server_state(), ServerState::Stopping);
    assert_eq!(
        sink.events,
        vec![
            AppEvent::ServerStateChanged(ServerState::Running),
            AppEvent::ServerStateChanged(ServerState::Stopping),
        ]
    );
}

#[test]
fn restore_drives_indicator_to_saved_power() {
    let mut kv = MockKv::new();
    let record = AccessoryState::new(true, 20.0, 40.0, 1_850).encode().unwrap();
    kv.map.insert((0, 0), record.to_vec());
    let store = mock_store(kv);

    let (mut ctl, mut hw, _notify, mut sink) = make_controller();
    assert!(ctl.restore(&mut hw, &store, &mut sink));
    assert!(ctl.read_power());
    assert_eq!(ctl.state().air_label(), "Good");
    assert!(hw.last_output().unwrap().high);
    assert_eq!(sink.events[0], AppEvent::Restored { found: true });
}

// ── Periodic notifications ────────────────────────────────────

#[test]
fn poll_raises_one_batch_per_interval() {
    let (mut ctl, _hw, mut notify, mut sink) = make_controller();
    let token = CancelToken::new();

    let mut fired = 0;
    for t in (100..=25_000).step_by(100) {
        if ctl.poll(t, &token, &mut notify, &mut sink) == WakeOutcome::Fired {
            fired += 1;
        }
    }
    // Fires at 10 100 and 20 200.
    assert_eq!(fired, 2);
    assert_eq!(
        notify.raised,
        vec![
            Characteristic::AirQuality,
            Characteristic::Temperature,
            Characteristic::AirQuality,
            Characteristic::Temperature,
        ]
    );
    assert_eq!(sink.count(|e| matches!(e, AppEvent::NotificationsRaised)), 2);
}

#[test]
fn poll_stops_after_cancel() {
    let (mut ctl, _hw, mut notify, mut sink) = make_controller();
    let token = CancelToken::new();
    token.cancel();
    assert_eq!(ctl.poll(50_000, &token, &mut notify, &mut sink), WakeOutcome::Stopped);
    assert!(notify.raised.is_empty());
}

// ── Request dispatch ──────────────────────────────────────────

#[test]
fn requests_map_to_operations() {
    let (mut ctl, mut hw, mut notify, mut sink) = make_controller();
    let mut store = mock_store(MockKv::new());
    hw.set_climate(18.5, 60.0);
    hw.air_raw = 2_050;

    let mut ask = |ctl: &mut StateController, req| {
        ctl.handle_request(req, 0, &mut hw, &mut store, &mut notify, &mut sink)
            .unwrap()
    };

    assert_eq!(ask(&mut ctl, AccessoryRequest::ReadPower), AccessoryResponse::Bool(false));
    assert_eq!(ask(&mut ctl, AccessoryRequest::WritePower(true)), AccessoryResponse::Ack);
    assert_eq!(ask(&mut ctl, AccessoryRequest::ReadPower), AccessoryResponse::Bool(true));
    assert_eq!(ask(&mut ctl, AccessoryRequest::ReadTemperature), AccessoryResponse::Float(18.5));
    assert_eq!(ask(&mut ctl, AccessoryRequest::ReadHumidity), AccessoryResponse::Float(60.0));
    assert_eq!(ask(&mut ctl, AccessoryRequest::ReadAirQuality), AccessoryResponse::UInt8(4));
    assert_eq!(ask(&mut ctl, AccessoryRequest::Identify), AccessoryResponse::Ack);
}
