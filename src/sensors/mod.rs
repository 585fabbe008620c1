//! Sensor drivers.
//!
//! - [`climate`] — DHT22 / AM2301 temperature and humidity over one wire.
//! - [`air_quality`] — analog gas sensor on ADC1.
//!
//! Both follow the dual-target pattern: real peripherals on ESP-IDF, atomic
//! injection points on the host for simulation and tests.

pub mod air_quality;
pub mod climate;

/// One temperature / humidity sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}
