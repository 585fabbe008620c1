//! SH1107 128×128 monochrome OLED over I2C.
//!
//! Keeps a page-organised framebuffer (16 pages of 128 columns, one bit per
//! pixel, LSB at the top of each page) and exposes it to `embedded-graphics`
//! as a [`DrawTarget`]. Nothing reaches the panel until [`Sh1107::flush`],
//! which rewrites every page in page-addressing mode.
//!
//! Generic over any `embedded-hal` 1.0 [`I2c`] bus: `I2cDriver` on ESP-IDF,
//! a recording mock on host.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};
use embedded_hal::i2c::I2c;

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 128;

const PAGES: usize = (HEIGHT / 8) as usize;
const COLUMNS: usize = WIDTH as usize;

/// Control byte: the rest of the transfer is commands.
const CONTROL_COMMAND: u8 = 0x00;
/// Control byte: the rest of the transfer is display RAM data.
const CONTROL_DATA: u8 = 0x40;

const DISPLAY_ON: u8 = 0xAF;
const SET_PAGE: u8 = 0xB0;
const SET_COLUMN_LOW: u8 = 0x00;
const SET_COLUMN_HIGH: u8 = 0x10;

/// Register setup after power-on. The panel stays dark until `DISPLAY_ON`.
pub const INIT_SEQUENCE: [u8; 20] = [
    0xAE, // display off
    0xDC, 0x00, // display start line
    0x81, 0x2F, // contrast
    0x20, // page addressing mode
    0xA0, // segment remap: normal
    0xC0, // COM scan: normal
    0xA8, 0x7F, // multiplex ratio: 128
    0xD3, 0x00, // display offset
    0xD5, 0x51, // clock divider / oscillator
    0xD9, 0x22, // pre-charge period
    0xDB, 0x35, // VCOMH deselect level
    0xA4, // display follows RAM
    0xA6, // non-inverted
];

/// Longest command transfer, control byte included.
const COMMAND_BUF: usize = INIT_SEQUENCE.len() + 1;

pub struct Sh1107<I2C> {
    i2c: I2C,
    address: u8,
    buffer: [[u8; COLUMNS]; PAGES],
}

impl<I2C> Sh1107<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            buffer: [[0; COLUMNS]; PAGES],
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn bus(&self) -> &I2C {
        &self.i2c
    }

    pub fn bus_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Blank the framebuffer (the panel keeps its contents until `flush`).
    pub fn clear_buffer(&mut self) {
        for page in &mut self.buffer {
            page.fill(0);
        }
    }

    /// Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }
        let byte = &mut self.buffer[(y / 8) as usize][x as usize];
        let mask = 1u8 << (y % 8);
        if on {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        x < WIDTH && y < HEIGHT && self.buffer[(y / 8) as usize][x as usize] & (1 << (y % 8)) != 0
    }
}

impl<I2C: I2c> Sh1107<I2C> {
    /// Configure the controller, clear its RAM and switch the panel on.
    pub fn init(&mut self) -> Result<(), I2C::Error> {
        self.command(&INIT_SEQUENCE)?;
        self.clear_buffer();
        self.flush()?;
        self.command(&[DISPLAY_ON])
    }

    /// Write the whole framebuffer to display RAM, page by page.
    pub fn flush(&mut self) -> Result<(), I2C::Error> {
        let mut data = [0u8; COLUMNS + 1];
        data[0] = CONTROL_DATA;
        for page in 0..PAGES {
            self.command(&[SET_PAGE | page as u8, SET_COLUMN_LOW, SET_COLUMN_HIGH])?;
            data[1..].copy_from_slice(&self.buffer[page]);
            self.i2c.write(self.address, &data)?;
        }
        Ok(())
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), I2C::Error> {
        let len = bytes.len().min(COMMAND_BUF - 1);
        let mut transfer = [0u8; COMMAND_BUF];
        transfer[0] = CONTROL_COMMAND;
        transfer[1..=len].copy_from_slice(&bytes[..len]);
        self.i2c.write(self.address, &transfer[..=len])
    }
}

impl<I2C> OriginDimensions for Sh1107<I2C> {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl<I2C> DrawTarget for Sh1107<I2C> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.set_pixel(x, y, color.is_on());
            }
        }
        Ok(())
    }
}
