//! Accessory configuration parameters.
//!
//! All tunable parameters for the AirSense accessory: identity reported
//! to the protocol layer, sampling and notification timing, and what to do
//! when the state store misbehaves.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins;

/// Capacity of every identity string.
pub const INFO_STR_CAP: usize = 64;

pub type InfoString = String<INFO_STR_CAP>;

/// Accessory category advertised to controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessoryCategory {
    Sensors,
}

/// Identity reported through the accessory information service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryInfo {
    pub name: InfoString,
    pub manufacturer: InfoString,
    pub model: InfoString,
    pub serial_number: InfoString,
    pub firmware_revision: InfoString,
    pub hardware_revision: InfoString,
    pub category: AccessoryCategory,
}

fn info_str(s: &str) -> InfoString {
    let mut out = InfoString::new();
    // Defaults are all far shorter than the capacity.
    let _ = out.push_str(s);
    out
}

impl Default for AccessoryInfo {
    fn default() -> Self {
        Self {
            name: info_str("Air Quality Sensor"),
            manufacturer: info_str("AirSense"),
            model: info_str("Sensor1,1"),
            serial_number: info_str("000000000001"),
            firmware_revision: info_str("1"),
            hardware_revision: info_str("1"),
            category: AccessoryCategory::Sensors,
        }
    }
}

impl AccessoryInfo {
    fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("name", self.name.as_str()),
            ("manufacturer", self.manufacturer.as_str()),
            ("model", self.model.as_str()),
            ("serial_number", self.serial_number.as_str()),
            ("firmware_revision", self.firmware_revision.as_str()),
            ("hardware_revision", self.hardware_revision.as_str()),
        ]
    }
}

/// What `write_power` does when the state cannot be saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StoreFailurePolicy {
    /// Report the failure to the caller; the binary restarts the device.
    Halt,
    /// Keep running without persistence and flag the controller degraded.
    #[default]
    Degrade,
}

/// Core accessory configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryConfig {
    pub info: AccessoryInfo,

    // --- Timing ---
    /// Minimum spacing of physical climate reads (milliseconds)
    pub sample_min_interval_ms: u32,
    /// Spacing of unsolicited notification batches (milliseconds)
    pub notify_interval_ms: u32,
    /// Run-loop wake period (milliseconds)
    pub poll_interval_ms: u32,

    // --- Outputs ---
    /// GPIO mirroring the power flag
    pub indicator_gpio: i32,

    // --- Persistence ---
    pub store_failure_policy: StoreFailurePolicy,
    /// Extra save attempts after the first failure
    pub store_retry_attempts: u8,
    /// First retry delay; doubled each retry (milliseconds)
    pub store_retry_backoff_ms: u32,
}

impl Default for AccessoryConfig {
    fn default() -> Self {
        Self {
            info: AccessoryInfo::default(),

            // Timing
            sample_min_interval_ms: 500,
            notify_interval_ms: 10_000,
            poll_interval_ms: 100,

            // Outputs
            indicator_gpio: pins::INDICATOR_GPIO,

            // Persistence
            store_failure_policy: StoreFailurePolicy::Degrade,
            store_retry_attempts: 3,
            store_retry_backoff_ms: 20,
        }
    }
}

impl AccessoryConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<()> {
        if !(1..=60_000).contains(&self.sample_min_interval_ms) {
            return Err(Error::Config("sample_min_interval_ms must be 1–60000"));
        }
        if !(10..=1_000).contains(&self.poll_interval_ms) {
            return Err(Error::Config("poll_interval_ms must be 10–1000"));
        }
        if self.notify_interval_ms <= self.poll_interval_ms {
            return Err(Error::Config(
                "notify_interval_ms must be > poll_interval_ms",
            ));
        }
        if self.store_retry_attempts > 10 {
            return Err(Error::Config("store_retry_attempts must be 0–10"));
        }
        if self.indicator_gpio < 0 {
            return Err(Error::Config("indicator_gpio must be a valid pin"));
        }
        for (field, value) in self.info.fields() {
            if value.is_empty() || !is_printable_ascii(value) {
                log::warn!("config: accessory info field '{}' rejected", field);
                return Err(Error::Config(
                    "accessory info strings must be non-empty printable ASCII",
                ));
            }
        }
        Ok(())
    }
}

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
