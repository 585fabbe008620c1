//! Outbound application events.
//!
//! The [`StateController`](super::service::StateController) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on the
//! other side decide what to do with them: log to serial, redraw the
//! display, etc.

use crate::error::{SensorError, StoreError};
use crate::state::AccessoryState;

/// Lifecycle of the external protocol server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Running,
    Stopping,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Boot-time restore finished; `found` is false when defaults were used.
    Restored { found: bool },

    /// The accessory state changed or was re-read (carries a snapshot).
    StateUpdated(AccessoryState),

    /// The power flag was written with a new value.
    PowerChanged(bool),

    /// A climate read failed; the cached value was served instead.
    SensorReadFailed(SensorError),

    /// A periodic notification batch was raised.
    NotificationsRaised,

    /// Saving failed and the controller continues without persistence.
    StoreDegraded(StoreError),

    /// A controller asked the accessory to identify itself.
    Identified,

    /// The protocol server changed lifecycle state.
    ServerStateChanged(ServerState),
}
