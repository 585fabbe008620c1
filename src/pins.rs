//! GPIO / peripheral pin assignments for the AirSense board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Climate sensor (AM2301 / DHT22)
// ---------------------------------------------------------------------------

/// Open-drain data line of the temperature / humidity sensor.
pub const DHT_GPIO: i32 = 25;

// ---------------------------------------------------------------------------
// Air-quality sensor (analog gas sensor)
// ---------------------------------------------------------------------------

/// Analog output of the gas sensor (ADC1_CH0).
pub const AIR_ADC_GPIO: i32 = 36;

// ---------------------------------------------------------------------------
// Indicator output
// ---------------------------------------------------------------------------

/// Digital output mirroring the accessory's power flag (active HIGH).
pub const INDICATOR_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// OLED display (SH1107, I2C)
// ---------------------------------------------------------------------------

pub const OLED_SDA_GPIO: i32 = 23;
pub const OLED_SCL_GPIO: i32 = 22;
/// 7-bit panel address.
pub const OLED_I2C_ADDR: u8 = 0x3C;
