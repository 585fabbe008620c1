//! Application service — the hexagonal core.
//!
//! [`StateController`] owns the accessory state, the climate sampler and
//! the periodic notifier. It exposes a hardware-agnostic API that mirrors
//! the protocol server's characteristic callbacks. All I/O flows through
//! port traits injected at call sites, so the whole controller is testable
//! with mock adapters.
//!
//! ```text
//!  ClimateSensorPort ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!  AirQualityPort    ──▶ │     StateController     │ ──▶ NotificationPort
//!  OutputPort        ◀── │ state · sampler · timer │ ◀─▶ PersistentStateStore
//!                        └─────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::config::{AccessoryConfig, StoreFailurePolicy};
use crate::error::{Error, Result};
use crate::notifier::{CancelToken, PeriodicNotifier, WakeOutcome};
use crate::persistence::PersistentStateStore;
use crate::sampler::RateLimitedSampler;
use crate::state::AccessoryState;

use super::commands::{AccessoryRequest, AccessoryResponse};
use super::events::{AppEvent, ServerState};
use super::ports::{
    AccessoryHardware, AirQualityPort, Characteristic, ClimateSensorPort, EventSink,
    KeyValueStore, NotificationPort, OutputPort,
};

// ───────────────────────────────────────────────────────────────
// StateController
// ───────────────────────────────────────────────────────────────

/// Single owner of the accessory state.
pub struct StateController {
    state: AccessoryState,
    sampler: RateLimitedSampler,
    notifier: PeriodicNotifier,
    indicator_gpio: i32,
    store_policy: StoreFailurePolicy,
    degraded: bool,
    server_state: ServerState,
}

impl StateController {
    /// Construct the controller with zeroed state.
    ///
    /// The notifier is armed at `now_ms`; call [`restore`](Self::restore)
    /// next to load the persisted state.
    pub fn new(config: &AccessoryConfig, now_ms: u64) -> Self {
        Self {
            state: AccessoryState::default(),
            sampler: RateLimitedSampler::new(config.sample_min_interval_ms),
            notifier: PeriodicNotifier::new(config.notify_interval_ms, now_ms),
            indicator_gpio: config.indicator_gpio,
            store_policy: config.store_failure_policy,
            degraded: false,
            server_state: ServerState::Idle,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the persisted state, falling back to defaults.
    ///
    /// The indicator output is driven to match the restored power flag.
    /// Returns whether a stored record was found.
    pub fn restore<K: KeyValueStore, D: DelayNs>(
        &mut self,
        hw: &mut impl OutputPort,
        store: &PersistentStateStore<K, D>,
        sink: &mut impl EventSink,
    ) -> bool {
        let loaded = store.load();
        let found = loaded.is_some();
        self.state = loaded.unwrap_or_default();
        hw.set_level(self.indicator_gpio, self.state.power());

        info!(
            "StateController restored ({}): power={}",
            if found { "saved" } else { "defaults" },
            self.state.power()
        );
        sink.emit(&AppEvent::Restored { found });
        sink.emit(&AppEvent::StateUpdated(self.state.clone()));
        found
    }

    /// Record a protocol-server lifecycle transition.
    pub fn on_server_state(&mut self, server_state: ServerState, sink: &mut impl EventSink) {
        match server_state {
            ServerState::Idle => info!("Accessory server: idle"),
            ServerState::Running => info!("Accessory server: running"),
            ServerState::Stopping => info!("Accessory server: stopping"),
        }
        self.server_state = server_state;
        sink.emit(&AppEvent::ServerStateChanged(server_state));
    }

    // ── Power ─────────────────────────────────────────────────

    pub fn read_power(&self) -> bool {
        self.state.power()
    }

    /// Apply a power write from the protocol layer.
    ///
    /// Writing the current value is a no-op: no output change, no save, no
    /// notification. A new value is saved, drives the indicator and raises
    /// a `PowerState` notification.
    ///
    /// Under [`StoreFailurePolicy::Halt`] a failed save is returned as
    /// [`Error::Store`] with the power flag and indicator unchanged; under
    /// `Degrade` it is logged and the new value is applied anyway.
    pub fn write_power<K: KeyValueStore, D: DelayNs>(
        &mut self,
        value: bool,
        hw: &mut impl OutputPort,
        store: &mut PersistentStateStore<K, D>,
        notify: &mut impl NotificationPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if value == self.state.power() {
            return Ok(());
        }

        info!("Power write: {}", value);
        // A halted save must leave the state and the output untouched.
        let mut candidate = self.state.clone();
        candidate.set_power(value);

        match store.save(&candidate) {
            Ok(()) => {
                if self.degraded {
                    info!("State store recovered");
                    self.degraded = false;
                }
            }
            Err(e) => match self.store_policy {
                StoreFailurePolicy::Halt => {
                    error!("State save failed ({}), halting; power stays {}", e, !value);
                    return Err(Error::Store(e));
                }
                StoreFailurePolicy::Degrade => {
                    error!("State save failed ({}), continuing without persistence", e);
                    self.degraded = true;
                    sink.emit(&AppEvent::StoreDegraded(e));
                }
            },
        }

        self.state = candidate;
        hw.set_level(self.indicator_gpio, value);

        notify.raise_event(Characteristic::PowerState);
        sink.emit(&AppEvent::PowerChanged(value));
        sink.emit(&AppEvent::StateUpdated(self.state.clone()));
        Ok(())
    }

    // ── Sensor reads ──────────────────────────────────────────

    pub fn read_temperature(
        &mut self,
        now_ms: u64,
        hw: &mut impl ClimateSensorPort,
        sink: &mut impl EventSink,
    ) -> f32 {
        self.refresh_climate(now_ms, hw, sink);
        self.state.temperature_c()
    }

    pub fn read_humidity(
        &mut self,
        now_ms: u64,
        hw: &mut impl ClimateSensorPort,
        sink: &mut impl EventSink,
    ) -> f32 {
        self.refresh_climate(now_ms, hw, sink);
        self.state.humidity_pct()
    }

    /// Sample the gas sensor and return the band code (1..=5).
    pub fn read_air_quality(&mut self, hw: &mut impl AirQualityPort, sink: &mut impl EventSink) -> u8 {
        let raw = hw.read_raw();
        self.state.set_air_raw(raw);
        info!("Air quality: raw={} ({})", raw, self.state.air_label());
        sink.emit(&AppEvent::StateUpdated(self.state.clone()));
        self.state.air_band().code()
    }

    /// Sensor failures are absorbed here: the last good values stay in the
    /// state and are served to the caller.
    fn refresh_climate(
        &mut self,
        now_ms: u64,
        hw: &mut impl ClimateSensorPort,
        sink: &mut impl EventSink,
    ) {
        match self.sampler.sample(now_ms, hw) {
            Ok(reading) => self.state.apply_climate(reading),
            Err(e) => {
                warn!("Climate read failed ({}), serving cached values", e);
                sink.emit(&AppEvent::SensorReadFailed(e));
            }
        }
        sink.emit(&AppEvent::StateUpdated(self.state.clone()));
    }

    // ── Identify ──────────────────────────────────────────────

    pub fn identify(&mut self, sink: &mut impl EventSink) {
        info!("Identify requested");
        sink.emit(&AppEvent::Identified);
    }

    // ── Periodic notifications ────────────────────────────────

    /// Wake the notifier once.
    pub fn poll(
        &mut self,
        now_ms: u64,
        token: &CancelToken,
        notify: &mut impl NotificationPort,
        sink: &mut impl EventSink,
    ) -> WakeOutcome {
        let outcome = self.notifier.wake(now_ms, token, notify);
        if outcome == WakeOutcome::Fired {
            info!(
                "Notify: humidity={:.1}% temp={:.1} air={}",
                self.state.humidity_pct(),
                self.state.temperature_c(),
                self.state.air_label()
            );
            sink.emit(&AppEvent::NotificationsRaised);
        }
        outcome
    }

    // ── Request dispatch ──────────────────────────────────────

    /// Serve one protocol request.
    ///
    /// Only a power write under the `Halt` store policy can fail.
    pub fn handle_request<K: KeyValueStore, D: DelayNs>(
        &mut self,
        request: AccessoryRequest,
        now_ms: u64,
        hw: &mut impl AccessoryHardware,
        store: &mut PersistentStateStore<K, D>,
        notify: &mut impl NotificationPort,
        sink: &mut impl EventSink,
    ) -> Result<AccessoryResponse> {
        let response = match request {
            AccessoryRequest::ReadPower => AccessoryResponse::Bool(self.read_power()),
            AccessoryRequest::WritePower(value) => {
                self.write_power(value, hw, store, notify, sink)?;
                AccessoryResponse::Ack
            }
            AccessoryRequest::ReadTemperature => {
                AccessoryResponse::Float(self.read_temperature(now_ms, hw, sink))
            }
            AccessoryRequest::ReadHumidity => {
                AccessoryResponse::Float(self.read_humidity(now_ms, hw, sink))
            }
            AccessoryRequest::ReadAirQuality => {
                AccessoryResponse::UInt8(self.read_air_quality(hw, sink))
            }
            AccessoryRequest::Identify => {
                self.identify(sink);
                AccessoryResponse::Ack
            }
        };
        Ok(response)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &AccessoryState {
        &self.state
    }

    /// True after a failed save under the `Degrade` policy, until the next
    /// successful save.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn server_state(&self) -> ServerState {
        self.server_state
    }

    pub fn notifier(&self) -> &PeriodicNotifier {
        &self.notifier
    }
}
