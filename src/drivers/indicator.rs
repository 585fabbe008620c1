//! Power indicator output.
//!
//! A single active-high GPIO that mirrors the accessory's power flag.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the pin via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;

pub struct Indicator {
    gpio: i32,
    lit: bool,
}

impl Indicator {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, lit: false }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    pub fn set(&mut self, on: bool) {
        hw_init::gpio_write(self.gpio, on);
        self.lit = on;
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
