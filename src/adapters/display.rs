//! OLED display adapter.
//!
//! Implements [`DisplayPort`] on the 128×128 SH1107 panel. Each frame is
//! rendered with `embedded-graphics` mono fonts into the driver's
//! framebuffer and flushed over I2C: the temperature in a large font on
//! top, humidity and the air-quality label below it.
//!
//! The panel is brought up lazily on the first draw. A failed bring-up
//! reports `NotReady`; a failed flush reports `Bus` and forces a fresh
//! bring-up next time, since the panel may have lost power.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::iso_8859_1::{FONT_9X15, FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{Drawable, Point};
use embedded_graphics::text::{Baseline, Text};
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::DisplayPort;
use crate::display::DisplayFrame;
use crate::drivers::sh1107::Sh1107;
use crate::error::DisplayError;

/// Text baselines, in pixels from the top edge.
const TEMPERATURE_Y: i32 = 40;
const HUMIDITY_Y: i32 = 80;
const AIR_QUALITY_Y: i32 = 115;

pub struct OledDisplay<I2C> {
    panel: Sh1107<I2C>,
    ready: bool,
    frames: u32,
}

impl<I2C: I2c> OledDisplay<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            panel: Sh1107::new(i2c, address),
            ready: false,
            frames: 0,
        }
    }

    pub fn panel(&self) -> &Sh1107<I2C> {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut Sh1107<I2C> {
        &mut self.panel
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Frames flushed to the panel since boot.
    pub fn frames_drawn(&self) -> u32 {
        self.frames
    }

    fn bring_up(&mut self) -> Result<(), DisplayError> {
        if self.ready {
            return Ok(());
        }
        if let Err(e) = self.panel.init() {
            warn!("oled: init at 0x{:02X} failed ({:?})", self.panel.address(), e);
            return Err(DisplayError::NotReady);
        }
        info!("oled: SH1107 ready at 0x{:02X}", self.panel.address());
        self.ready = true;
        Ok(())
    }

    fn render(&mut self, frame: &DisplayFrame) {
        let large = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        let small = MonoTextStyle::new(&FONT_9X15, BinaryColor::On);
        let [temperature, humidity, air_quality] = frame.lines();

        self.panel.clear_buffer();
        for (text, style, y) in [
            (temperature, large, TEMPERATURE_Y),
            (humidity, small, HUMIDITY_Y),
            (air_quality, small, AIR_QUALITY_Y),
        ] {
            // Drawing into the framebuffer cannot fail.
            let _ = Text::with_baseline(text, Point::new(0, y), style, Baseline::Alphabetic)
                .draw(&mut self.panel);
        }
    }
}

impl<I2C: I2c> DisplayPort for OledDisplay<I2C> {
    fn draw(&mut self, frame: &DisplayFrame) -> Result<(), DisplayError> {
        self.bring_up()?;
        self.render(frame);
        if let Err(e) = self.panel.flush() {
            self.ready = false;
            warn!("oled: flush failed ({:?})", e);
            return Err(DisplayError::Bus);
        }
        self.frames = self.frames.saturating_add(1);
        Ok(())
    }
}
