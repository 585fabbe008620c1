//! Minimum-interval rate limiter for the climate sensor.
//!
//! The DHT22 answers slowly and self-heats when polled hard, so reads that
//! arrive inside the configured window are served from the last good
//! sample. The tick and cached reading live in one `Option` so they are
//! always replaced together.

use crate::app::ports::ClimateSensorPort;
use crate::error::SensorError;
use crate::sensors::ClimateReading;

/// Default minimum spacing between physical reads.
pub const DEFAULT_MIN_INTERVAL_MS: u32 = 500;

pub struct RateLimitedSampler {
    min_interval_ms: u32,
    last: Option<(u64, ClimateReading)>,
}

impl RateLimitedSampler {
    pub fn new(min_interval_ms: u32) -> Self {
        Self {
            min_interval_ms,
            last: None,
        }
    }

    pub fn min_interval_ms(&self) -> u32 {
        self.min_interval_ms
    }

    /// Return a reading no older than the interval.
    ///
    /// Inside the window the cache is returned and the sensor is not
    /// touched. Otherwise the sensor is read; a failure leaves the cache
    /// and tick as they were, so the next call retries immediately.
    pub fn sample(
        &mut self,
        now_ms: u64,
        sensor: &mut impl ClimateSensorPort,
    ) -> Result<ClimateReading, SensorError> {
        if let Some((tick, reading)) = self.last {
            if now_ms.saturating_sub(tick) < u64::from(self.min_interval_ms) {
                return Ok(reading);
            }
        }

        let reading = sensor.read_temperature_humidity()?;
        self.last = Some((now_ms, reading));
        Ok(reading)
    }

    /// Last good reading, if any.
    pub fn cached(&self) -> Option<ClimateReading> {
        self.last.map(|(_, reading)| reading)
    }
}

impl Default for RateLimitedSampler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL_MS)
    }
}
