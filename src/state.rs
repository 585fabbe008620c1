//! The accessory state record and its fixed-size persisted form.
//!
//! [`AccessoryState`] is the one mutable record the firmware keeps. Its
//! air-quality band and label are derived from the raw reading through
//! [`classify`](crate::classifier::classify) and have no setters, so they
//! can never drift from `air_raw`.
//!
//! ## Persisted layout
//!
//! The record is serialized with `postcard` into exactly [`RECORD_LEN`]
//! bytes; every field is fixed width:
//!
//! ```text
//!  0      1      2            6            10     11           15
//!  ├──────┼──────┼────────────┼────────────┼──────┼────────────┤
//!  │ ver  │power │ temp f32LE │ hum f32LE  │ band │ raw u32LE  │
//!  └──────┴──────┴────────────┴────────────┴──────┴────────────┘
//! ```
//!
//! The label is not stored; decoding re-derives it.

use core::fmt::Write as _;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::classifier::{AirQualityBand, classify};
use crate::sensors::ClimateReading;

/// Exact byte length of an encoded record.
pub const RECORD_LEN: usize = 15;

/// Layout version written into byte 0.
const RECORD_VERSION: u8 = 1;

/// Capacity of the air-quality label.
pub const AIR_LABEL_CAP: usize = 16;

/// Live accessory state.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessoryState {
    power: bool,
    temperature_c: f32,
    humidity_pct: f32,
    air_raw: u32,
    air_band: AirQualityBand,
    air_label: String<AIR_LABEL_CAP>,
}

impl Default for AccessoryState {
    fn default() -> Self {
        Self::new(false, 0.0, 0.0, 0)
    }
}

impl AccessoryState {
    /// Build a state; band and label are derived from `air_raw`.
    pub fn new(power: bool, temperature_c: f32, humidity_pct: f32, air_raw: u32) -> Self {
        let mut state = Self {
            power,
            temperature_c,
            humidity_pct,
            air_raw: 0,
            air_band: AirQualityBand::default(),
            air_label: String::new(),
        };
        state.set_air_raw(air_raw);
        state
    }

    pub fn power(&self) -> bool {
        self.power
    }

    pub fn temperature_c(&self) -> f32 {
        self.temperature_c
    }

    pub fn humidity_pct(&self) -> f32 {
        self.humidity_pct
    }

    pub fn air_raw(&self) -> u32 {
        self.air_raw
    }

    pub fn air_band(&self) -> AirQualityBand {
        self.air_band
    }

    pub fn air_label(&self) -> &str {
        &self.air_label
    }

    // ── Mutation (controller only) ────────────────────────────

    pub(crate) fn set_power(&mut self, power: bool) {
        self.power = power;
    }

    pub(crate) fn apply_climate(&mut self, reading: ClimateReading) {
        self.temperature_c = reading.temperature_c;
        self.humidity_pct = reading.humidity_pct;
    }

    /// Store a raw air reading and re-derive band and label from it.
    pub(crate) fn set_air_raw(&mut self, raw: u32) {
        let (band, label) = classify(raw);
        self.air_raw = raw;
        self.air_band = band;
        self.air_label.clear();
        // Every label is shorter than AIR_LABEL_CAP.
        let _ = self.air_label.write_str(label);
    }

    // ── Persisted form ────────────────────────────────────────

    /// Serialize into the fixed-size record.
    pub fn encode(&self) -> Option<[u8; RECORD_LEN]> {
        let record = StateRecord {
            version: RECORD_VERSION,
            power: self.power,
            temperature_c: self.temperature_c,
            humidity_pct: self.humidity_pct,
            band: self.air_band.code(),
            air_raw: self.air_raw,
        };
        let mut buf = [0u8; RECORD_LEN];
        let used = postcard::to_slice(&record, &mut buf).ok()?.len();
        (used == RECORD_LEN).then_some(buf)
    }

    /// Parse a record. Rejects wrong lengths, unknown versions, and records
    /// whose stored band disagrees with their raw reading.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != RECORD_LEN {
            return None;
        }
        let record: StateRecord = postcard::from_bytes(bytes).ok()?;
        if record.version != RECORD_VERSION {
            return None;
        }
        let state = Self::new(
            record.power,
            record.temperature_c,
            record.humidity_pct,
            record.air_raw,
        );
        (AirQualityBand::from_code(record.band) == Some(state.air_band)).then_some(state)
    }
}

/// Wire shape of the persisted record. Field order is the byte order.
#[derive(Serialize, Deserialize)]
struct StateRecord {
    version: u8,
    power: bool,
    temperature_c: f32,
    humidity_pct: f32,
    band: u8,
    #[serde(with = "postcard::fixint::le")]
    air_raw: u32,
}
