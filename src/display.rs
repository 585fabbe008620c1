//! Display rendering.
//!
//! The panel shows three lines: temperature, humidity and the air-quality
//! label. [`DisplayObserver`] listens for `StateUpdated` events and redraws
//! only when the rendered text actually changes. Draw failures are logged
//! and swallowed; the display never affects accessory behaviour.

use core::fmt::Write as _;

use heapless::String;
use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::{DisplayPort, EventSink};
use crate::state::AccessoryState;

/// Capacity of one display line.
pub const LINE_CAP: usize = 24;

pub type DisplayLine = String<LINE_CAP>;

/// Text content of one full screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayFrame {
    pub temperature: DisplayLine,
    pub humidity: DisplayLine,
    pub air_quality: DisplayLine,
}

impl DisplayFrame {
    pub fn from_state(state: &AccessoryState) -> Self {
        let mut frame = Self::default();
        let _ = write!(frame.temperature, "{:.1}\u{00b0}", state.temperature_c());
        let _ = write!(frame.humidity, "{:.1} %", state.humidity_pct());
        let _ = frame.air_quality.push_str(state.air_label());
        frame
    }

    /// Shown at boot until the first state is known.
    pub fn placeholder() -> Self {
        let mut frame = Self::default();
        let _ = frame.temperature.push_str("-");
        let _ = frame.humidity.push_str("Humidity: -");
        let _ = frame.air_quality.push_str("Air: -");
        frame
    }

    pub fn lines(&self) -> [&str; 3] {
        [&self.temperature, &self.humidity, &self.air_quality]
    }
}

/// Event-driven display refresher.
pub struct DisplayObserver<D: DisplayPort> {
    panel: D,
    last: Option<DisplayFrame>,
    failures: u32,
}

impl<D: DisplayPort> DisplayObserver<D> {
    pub fn new(panel: D) -> Self {
        Self {
            panel,
            last: None,
            failures: 0,
        }
    }

    /// Draw the boot placeholder.
    pub fn show_placeholder(&mut self) {
        self.render(DisplayFrame::placeholder());
    }

    pub fn panel(&self) -> &D {
        &self.panel
    }

    /// Draw failures since boot.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn render(&mut self, frame: DisplayFrame) {
        if self.last.as_ref() == Some(&frame) {
            return;
        }
        match self.panel.draw(&frame) {
            Ok(()) => self.last = Some(frame),
            Err(e) => {
                // Leave `last` alone so the next update retries.
                self.failures = self.failures.saturating_add(1);
                warn!("display: draw failed ({})", e);
            }
        }
    }
}

impl<D: DisplayPort> EventSink for DisplayObserver<D> {
    fn emit(&mut self, event: &AppEvent) {
        if let AppEvent::StateUpdated(state) = event {
            self.render(DisplayFrame::from_state(state));
        }
    }
}
