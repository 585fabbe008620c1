//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    /// Emit `StateUpdated` snapshots too; they arrive on every read.
    verbose: bool,
}

impl LogEventSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Restored { found } => {
                info!("BOOT  | state {}", if *found { "restored" } else { "defaulted" });
            }
            AppEvent::StateUpdated(s) => {
                if self.verbose {
                    info!(
                        "STATE | power={} | T={:.1}\u{00b0}C | RH={:.1}% | air={} ({})",
                        s.power(),
                        s.temperature_c(),
                        s.humidity_pct(),
                        s.air_label(),
                        s.air_raw(),
                    );
                }
            }
            AppEvent::PowerChanged(on) => {
                info!("POWER | {}", if *on { "on" } else { "off" });
            }
            AppEvent::SensorReadFailed(e) => {
                warn!("SENSE | climate read failed: {}", e);
            }
            AppEvent::NotificationsRaised => {
                info!("NOTIFY| air quality + temperature");
            }
            AppEvent::StoreDegraded(e) => {
                warn!("STORE | degraded: {}", e);
            }
            AppEvent::Identified => {
                info!("IDENT | identify");
            }
            AppEvent::ServerStateChanged(state) => {
                info!("SERVER| {:?}", state);
            }
        }
    }
}
