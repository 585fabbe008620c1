//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ StateController (domain)
//! ```
//!
//! Driven adapters (sensors, indicator output, key-value store, protocol
//! notifications, display) implement these traits. The
//! [`StateController`](super::service::StateController) consumes them via
//! generics at each call site, so the domain core never touches hardware
//! directly.

use crate::display::DisplayFrame;
use crate::error::{DisplayError, SensorError};
use crate::sensors::ClimateReading;

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Combined temperature / relative-humidity sensor.
pub trait ClimateSensorPort {
    /// Perform one blocking read of the sensor.
    fn read_temperature_humidity(&mut self) -> Result<ClimateReading, SensorError>;
}

/// Analog gas sensor behind an ADC channel.
pub trait AirQualityPort {
    /// Raw ADC counts. Never fails; a dead channel reads as 0.
    fn read_raw(&mut self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Digital output used to mirror the accessory's power flag.
pub trait OutputPort {
    fn set_level(&mut self, pin: i32, high: bool);
}

/// Everything the request dispatcher needs from the board in one bound.
pub trait AccessoryHardware: ClimateSensorPort + AirQualityPort + OutputPort {}

impl<T: ClimateSensorPort + AirQualityPort + OutputPort> AccessoryHardware for T {}

// ───────────────────────────────────────────────────────────────
// Key-value store port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage addressed by a numeric domain and key.
///
/// Write operations MUST be atomic — no partial writes on power loss.
/// The ESP-IDF NVS API guarantees this natively; the in-memory simulation
/// achieves it trivially.
pub trait KeyValueStore {
    /// Read a value into `buf`.
    ///
    /// Returns `Ok(None)` when the key is absent, otherwise `Ok(Some(len))`
    /// where `len` is the full length of the stored value. At most
    /// `buf.len()` bytes are copied, so `len > buf.len()` signals a value
    /// that did not fit.
    fn get(&self, domain: u8, key: u8, buf: &mut [u8]) -> Result<Option<usize>, StorageError>;

    /// Write a value atomically, replacing any previous value.
    fn set(&mut self, domain: u8, key: u8, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn remove(&mut self, domain: u8, key: u8) -> Result<(), StorageError>;
}

/// Errors from [`KeyValueStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Notification port (driven adapter: domain → protocol server)
// ───────────────────────────────────────────────────────────────

/// Characteristics the accessory exposes to the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Characteristic {
    PowerState = 0,
    Temperature = 1,
    Humidity = 2,
    AirQuality = 3,
}

impl Characteristic {
    pub const fn name(self) -> &'static str {
        match self {
            Self::PowerState => "power-state",
            Self::Temperature => "current-temperature",
            Self::Humidity => "current-relative-humidity",
            Self::AirQuality => "air-quality",
        }
    }
}

/// Asks the protocol server to push a value-changed notification to
/// subscribed controllers.
pub trait NotificationPort {
    fn raise_event(&mut self, characteristic: Characteristic);
}

// ───────────────────────────────────────────────────────────────
// Display port (driven adapter: domain → panel)
// ───────────────────────────────────────────────────────────────

pub trait DisplayPort {
    /// Replace the panel contents with `frame`.
    fn draw(&mut self, frame: &DisplayFrame) -> Result<(), DisplayError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → observers)
// ───────────────────────────────────────────────────────────────

/// The domain publishes [`AppEvent`](super::events::AppEvent)s through this
/// port after every state change. Adapters decide where they go (serial
/// log, display, telemetry).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan-out: a pair of sinks receives every event in order.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &super::events::AppEvent) {
        (**self).emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}
