//! Analog air-quality sensor driver.
//!
//! The gas sensor's output voltage is sampled on ADC1 channel 0 with 12-bit
//! width and 12 dB attenuation (configured by `hw_init`). Raw counts are
//! passed straight to the classifier; no calibration is applied.
//!
//! A failed conversion is logged, counted and reported as 0, so a dead
//! channel classifies as `Excellent` but stays visible in the log.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1_CH0 via the oneshot API.
//! On host/test: reads from static atomics for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use log::warn;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

#[cfg(not(target_os = "espidf"))]
static SIM_AIR_ADC: AtomicU32 = AtomicU32::new(0);
/// Non-zero: the next reads fail with this return code.
#[cfg(not(target_os = "espidf"))]
static SIM_AIR_ADC_ERROR: AtomicI32 = AtomicI32::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_air_adc(raw: u32) {
    SIM_AIR_ADC.store(raw, Ordering::Relaxed);
}

/// Make reads fail with `rc` (0 clears the fault).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_air_adc_error(rc: i32) {
    SIM_AIR_ADC_ERROR.store(rc, Ordering::Relaxed);
}

pub struct AirQualitySensor {
    channel: u32,
    total_reads: u32,
    read_errors: u32,
}

impl AirQualitySensor {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            total_reads: 0,
            read_errors: 0,
        }
    }

    pub fn read(&mut self) -> u32 {
        self.total_reads = self.total_reads.saturating_add(1);
        match self.read_adc() {
            Ok(raw) => u32::from(raw),
            Err(rc) => {
                self.read_errors = self.read_errors.saturating_add(1);
                warn!(
                    "air: ADC1 channel {} read failed (rc={}), reporting 0",
                    self.channel, rc
                );
                0
            }
        }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn total_reads(&self) -> u32 {
        self.total_reads
    }

    /// Failed conversions since boot.
    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> Result<u16, i32> {
        hw_init::adc1_read(self.channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> Result<u16, i32> {
        match SIM_AIR_ADC_ERROR.load(Ordering::Relaxed) {
            0 => Ok(SIM_AIR_ADC.load(Ordering::Relaxed).min(u32::from(u16::MAX)) as u16),
            rc => Err(rc),
        }
    }
}
