//! AirSense Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative run loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     LogEventSink   NvsStore   SystemClock     │
//! │  (Climate+Air+Out)   (EventSink)    (KV store) (ClockPort)     │
//! │  DisplayObserver<OledDisplay>       ChannelNotifier            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            StateController (pure logic)                │    │
//! │  │  AccessoryState · RateLimitedSampler · Notifier        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  bridge::run (request / response / notify channels)            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;
use log::{error, info, warn};

use airsense::adapters::display::OledDisplay;
use airsense::adapters::hardware::HardwareAdapter;
use airsense::adapters::log_sink::LogEventSink;
use airsense::adapters::nvs::NvsStore;
use airsense::adapters::time::SystemClock;
use airsense::app::events::ServerState;
use airsense::app::ports::ClockPort;
use airsense::app::service::StateController;
use airsense::bridge::{self, ChannelNotifier, Mailbox};
use airsense::config::{AccessoryConfig, StoreFailurePolicy};
use airsense::display::DisplayObserver;
use airsense::drivers::hw_init;
use airsense::drivers::indicator::Indicator;
use airsense::error::{Error, StoreError};
use airsense::notifier::CancelToken;
use airsense::persistence::{PersistentStateStore, RetryPolicy};
use airsense::pins;
use airsense::sensors::air_quality::AirQualitySensor;
use airsense::sensors::climate::Dht22Sensor;

/// OLED bus clock.
const OLED_I2C_FREQ_HZ: u32 = 400_000;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AirSense v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = AccessoryConfig::default();
    config.validate()?;
    let info = &config.info;
    info!(
        "Accessory: '{}' by {} (model {}, serial {}, fw {}, hw {}, {:?})",
        info.name,
        info.manufacturer,
        info.model,
        info.serial_number,
        info.firmware_revision,
        info.hardware_revision,
        info.category,
    );

    // ── 3. Initialise hardware peripherals ────────────────────
    if let Err(e) = hw_init::init_peripherals(config.indicator_gpio) {
        error!("HAL init failed: {}", e);
        return Err(Error::Init("peripheral init failed").into());
    }

    let peripherals = Peripherals::take()?;
    // SAFETY: the OLED pins are not claimed by any other driver.
    let (sda, scl) = unsafe {
        (
            AnyIOPin::new(pins::OLED_SDA_GPIO as _),
            AnyIOPin::new(pins::OLED_SCL_GPIO as _),
        )
    };
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        sda,
        scl,
        &I2cConfig::new().baudrate(Hertz(OLED_I2C_FREQ_HZ)),
    )?;
    let mut display = DisplayObserver::new(OledDisplay::new(i2c, pins::OLED_I2C_ADDR));
    display.show_placeholder();

    // ── 4. Construct adapters ─────────────────────────────────
    let mut hw = HardwareAdapter::new(
        Dht22Sensor::new(pins::DHT_GPIO),
        AirQualitySensor::new(hw_init::ADC1_CH_AIR),
        Indicator::new(config.indicator_gpio),
    );
    let nvs = NvsStore::new().map_err(|e| Error::Store(StoreError::Write(e)))?;
    let mut store = PersistentStateStore::new(
        nvs,
        FreeRtos,
        RetryPolicy {
            attempts: config.store_retry_attempts,
            backoff_ms: config.store_retry_backoff_ms,
        },
    );
    let clock = SystemClock::new();
    let mut sink = (LogEventSink::new(false), display);
    let mut notify = ChannelNotifier::new(&bridge::NOTIFY_CHANNEL);

    // ── 5. Controller ─────────────────────────────────────────
    let mut controller = StateController::new(&config, clock.now_ms());
    if !controller.restore(&mut hw, &store, &mut sink) {
        info!("First boot: no saved accessory state");
    }
    controller.on_server_state(ServerState::Idle, &mut sink);

    spawn_protocol_stub();

    // ── 6. Run loop ───────────────────────────────────────────
    let token = CancelToken::new();
    let mut delay = FreeRtos;
    let result = bridge::run(
        &mut controller,
        &clock,
        &mut delay,
        &mut hw,
        &mut store,
        &mut notify,
        &mut sink,
        &token,
        Mailbox::global(),
        config.poll_interval_ms,
    );

    match result {
        Ok(()) => {
            info!("Run loop exited");
            Ok(())
        }
        Err(Error::Store(e)) if config.store_failure_policy == StoreFailurePolicy::Halt => {
            error!("Unrecoverable store failure ({}), restarting", e);
            // SAFETY: esp_restart never returns; no Rust state needs unwinding.
            unsafe { esp_idf_svc::sys::esp_restart() }
        }
        Err(e) => {
            warn!("Run loop failed: {}", e);
            Err(e.into())
        }
    }
}

/// Consume the outbound channels when no accessory server is linked in.
///
/// The protocol server owns the other end of the bridge channels. Without
/// one, responses and raise-event requests are drained and logged so the
/// bounded channels never fill.
fn spawn_protocol_stub() {
    let spawned = std::thread::Builder::new()
        .name("proto-stub".into())
        .stack_size(4096)
        .spawn(|| {
            bridge::SERVER_STATE_CHANNEL.try_send(ServerState::Running).ok();
            loop {
                while let Ok(msg) = bridge::RESPONSE_CHANNEL.try_receive() {
                    info!("proto-stub: response #{} {:?}", msg.id, msg.response);
                }
                while let Ok(characteristic) = bridge::NOTIFY_CHANNEL.try_receive() {
                    info!("proto-stub: raise event {}", characteristic.name());
                }
                FreeRtos::delay_ms(250);
            }
        });
    if let Err(e) = spawned {
        warn!("proto-stub: spawn failed ({}), outbound channels will fill", e);
    }
}
