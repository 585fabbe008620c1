//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the climate sensor, the gas sensor and the indicator output,
//! exposing them through [`ClimateSensorPort`], [`AirQualityPort`] and
//! [`OutputPort`]. On non-espidf targets the underlying drivers use
//! cfg-gated simulation stubs.

use log::warn;

use crate::app::ports::{AirQualityPort, ClimateSensorPort, OutputPort};
use crate::drivers::indicator::Indicator;
use crate::error::SensorError;
use crate::sensors::ClimateReading;
use crate::sensors::air_quality::AirQualitySensor;
use crate::sensors::climate::Dht22Sensor;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    climate: Dht22Sensor,
    air: AirQualitySensor,
    indicator: Indicator,
}

impl HardwareAdapter {
    pub fn new(climate: Dht22Sensor, air: AirQualitySensor, indicator: Indicator) -> Self {
        Self {
            climate,
            air,
            indicator,
        }
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }
}

// ── Sensor ports ──────────────────────────────────────────────

impl ClimateSensorPort for HardwareAdapter {
    fn read_temperature_humidity(&mut self) -> Result<ClimateReading, SensorError> {
        self.climate.read()
    }
}

impl AirQualityPort for HardwareAdapter {
    fn read_raw(&mut self) -> u32 {
        self.air.read()
    }
}

// ── Output port ───────────────────────────────────────────────

impl OutputPort for HardwareAdapter {
    fn set_level(&mut self, pin: i32, high: bool) {
        if pin != self.indicator.gpio() {
            warn!("hardware: GPIO{} is not an output, ignoring", pin);
            return;
        }
        self.indicator.set(high);
    }
}
