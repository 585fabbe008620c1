//! DHT22 / AM2301 temperature and humidity sensor.
//!
//! Single-wire protocol: the host pulls the line low for ~2 ms, releases
//! it, and the sensor answers with an 80 µs low / 80 µs high preamble
//! followed by 40 data bits. Each bit is a ~50 µs low followed by a high
//! pulse whose length encodes the value (~27 µs = 0, ~70 µs = 1).
//!
//! Frame: `[hum_hi, hum_lo, temp_hi, temp_lo, checksum]`, values in
//! tenths; bit 15 of the temperature word is the sign.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-banged on an open-drain GPIO with interrupts masked
//! for the duration of the frame.
//! On host/test: the frame is synthesized from atomically injected values.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicI32, AtomicU8, AtomicU32, Ordering};

use crate::error::SensorError;
use crate::sensors::ClimateReading;

// ── Frame codec ───────────────────────────────────────────────

/// Decode a 40-bit frame into engineering units.
pub fn decode_frame(frame: [u8; 5]) -> Result<ClimateReading, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::Checksum);
    }

    let raw_humidity = u16::from_be_bytes([frame[0], frame[1]]);
    let raw_temp = u16::from_be_bytes([frame[2], frame[3]]);

    let humidity_pct = f32::from(raw_humidity) / 10.0;
    let magnitude = f32::from(raw_temp & 0x7FFF) / 10.0;
    let temperature_c = if raw_temp & 0x8000 == 0 { magnitude } else { -magnitude };

    Ok(ClimateReading {
        temperature_c,
        humidity_pct,
    })
}

/// Build the frame a sensor would send for the given tenths.
pub fn encode_frame(temp_tenths: i16, humidity_tenths: u16) -> [u8; 5] {
    let mut temp_word = temp_tenths.unsigned_abs() & 0x7FFF;
    if temp_tenths < 0 {
        temp_word |= 0x8000;
    }
    let [h_hi, h_lo] = humidity_tenths.to_be_bytes();
    let [t_hi, t_lo] = temp_word.to_be_bytes();
    let checksum = h_hi
        .wrapping_add(h_lo)
        .wrapping_add(t_hi)
        .wrapping_add(t_lo);
    [h_hi, h_lo, t_hi, t_lo, checksum]
}

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_TENTHS: AtomicI32 = AtomicI32::new(215);
#[cfg(not(target_os = "espidf"))]
static SIM_HUMIDITY_TENTHS: AtomicU32 = AtomicU32::new(450);

#[cfg(not(target_os = "espidf"))]
const SIM_FAULT_NONE: u8 = 0;
#[cfg(not(target_os = "espidf"))]
const SIM_FAULT_TIMEOUT: u8 = 1;
#[cfg(not(target_os = "espidf"))]
const SIM_FAULT_CHECKSUM: u8 = 2;
#[cfg(not(target_os = "espidf"))]
static SIM_FAULT: AtomicU8 = AtomicU8::new(SIM_FAULT_NONE);

/// Injectable faults for the host simulation.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    None,
    Timeout,
    Checksum,
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_climate(temp_tenths: i16, humidity_tenths: u16) {
    SIM_TEMP_TENTHS.store(i32::from(temp_tenths), Ordering::Relaxed);
    SIM_HUMIDITY_TENTHS.store(u32::from(humidity_tenths), Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_climate_fault(fault: SimFault) {
    let code = match fault {
        SimFault::None => SIM_FAULT_NONE,
        SimFault::Timeout => SIM_FAULT_TIMEOUT,
        SimFault::Checksum => SIM_FAULT_CHECKSUM,
    };
    SIM_FAULT.store(code, Ordering::Relaxed);
}

// ── Driver ────────────────────────────────────────────────────

pub struct Dht22Sensor {
    gpio: i32,
    failures: u32,
}

impl Dht22Sensor {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, failures: 0 }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Consecutive failed reads since the last good one.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let result = self.read_frame().and_then(decode_frame);
        match result {
            Ok(_) => self.failures = 0,
            Err(_) => self.failures = self.failures.saturating_add(1),
        }
        result
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_frame(&self) -> Result<[u8; 5], SensorError> {
        let temp = SIM_TEMP_TENTHS.load(Ordering::Relaxed);
        let humidity = SIM_HUMIDITY_TENTHS.load(Ordering::Relaxed);
        let mut frame = encode_frame(
            temp.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
            humidity.min(u32::from(u16::MAX)) as u16,
        );
        match SIM_FAULT.load(Ordering::Relaxed) {
            SIM_FAULT_TIMEOUT => Err(SensorError::Timeout("response low")),
            SIM_FAULT_CHECKSUM => {
                frame[4] = frame[4].wrapping_add(1);
                Ok(frame)
            }
            _ => Ok(frame),
        }
    }

    #[cfg(target_os = "espidf")]
    fn read_frame(&self) -> Result<[u8; 5], SensorError> {
        use esp_idf_svc::sys::*;

        let pin = self.gpio;

        // SAFETY: the pin is owned by this driver and was configured as
        // open-drain input/output by hw_init; main-loop access only.
        unsafe {
            gpio_set_level(pin, 0);
            esp_rom_delay_us(2_000);
            gpio_set_level(pin, 1);
            esp_rom_delay_us(30);
        }

        // Bit timing is tens of microseconds, so interrupts stay masked
        // until the last bit has been sampled.
        esp_idf_svc::hal::interrupt::free(|| {
            wait_for_level(pin, false, 200, "response low")?;
            wait_for_level(pin, true, 200, "response high")?;
            wait_for_level(pin, false, 200, "data preamble")?;

            let mut frame = [0u8; 5];
            for byte in &mut frame {
                for _ in 0..8 {
                    wait_for_level(pin, true, 80, "bit high")?;
                    let start = now_us();
                    wait_for_level(pin, false, 120, "bit low")?;
                    *byte <<= 1;
                    if now_us() - start > 50 {
                        *byte |= 1;
                    }
                }
            }
            Ok(frame)
        })
    }
}

#[cfg(target_os = "espidf")]
fn wait_for_level(
    pin: i32,
    high: bool,
    timeout_us: i64,
    stage: &'static str,
) -> Result<(), SensorError> {
    let deadline = now_us() + timeout_us;
    while now_us() <= deadline {
        // SAFETY: read-only register access on a configured pin.
        if (unsafe { esp_idf_svc::sys::gpio_get_level(pin) } != 0) == high {
            return Ok(());
        }
    }
    Err(SensorError::Timeout(stage))
}

#[cfg(target_os = "espidf")]
fn now_us() -> i64 {
    // SAFETY: esp_timer_get_time reads a free-running counter.
    unsafe { esp_idf_svc::sys::esp_timer_get_time() }
}
