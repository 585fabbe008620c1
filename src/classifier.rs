//! Air-quality classification.
//!
//! Maps a raw ADC reading from the gas sensor onto one of five discrete
//! bands. The mapping is pure and total: every `u32` lands in exactly one
//! band, and each threshold belongs to the band that starts at it.
//!
//! ```text
//!   raw:   0 ──── 1800 ──── 1900 ──── 2000 ──── 2100 ────▶
//!   band:  Excellent │ Good │  Fair  │ Inferior │  Poor
//! ```

use serde::{Deserialize, Serialize};

/// Discrete air-quality band. Discriminants are the numeric codes reported
/// to the protocol layer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum AirQualityBand {
    #[default]
    Excellent = 1,
    Good = 2,
    Fair = 3,
    Inferior = 4,
    Poor = 5,
}

/// Lower bound (inclusive) of every band above `Excellent`, ascending.
const BAND_THRESHOLDS: [(u32, AirQualityBand); 4] = [
    (1800, AirQualityBand::Good),
    (1900, AirQualityBand::Fair),
    (2000, AirQualityBand::Inferior),
    (2100, AirQualityBand::Poor),
];

impl AirQualityBand {
    /// Band for a raw reading.
    pub fn from_raw(raw: u32) -> Self {
        BAND_THRESHOLDS
            .iter()
            .rev()
            .find(|(lower, _)| raw >= *lower)
            .map_or(Self::Excellent, |(_, band)| *band)
    }

    /// Numeric code (1 = Excellent … 5 = Poor).
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`code`](Self::code). Rejects 0 and anything above 5.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Excellent),
            2 => Some(Self::Good),
            3 => Some(Self::Fair),
            4 => Some(Self::Inferior),
            5 => Some(Self::Poor),
            _ => None,
        }
    }

    /// Human-readable label shown on the display.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Inferior => "Inferior",
            Self::Poor => "Poor",
        }
    }
}

/// Classify a raw reading into its band and label.
pub fn classify(raw: u32) -> (AirQualityBand, &'static str) {
    let band = AirQualityBand::from_raw(raw);
    (band, band.label())
}
