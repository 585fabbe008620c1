//! Periodic change-notification driver.
//!
//! Woken by the run loop every poll interval. Once more than the notify
//! interval has passed since the last batch it asks the protocol layer to
//! push AirQuality and Temperature to subscribed controllers, then re-arms.
//!
//! ```text
//!            elapsed > interval
//!   Waiting ───────────────────▶ Due ──(raise events)──▶ Waiting
//!      │
//!      │ token cancelled
//!      ▼
//!   Stopped  (terminal)
//! ```
//!
//! Cancellation is observed only at wake boundaries; a batch that has
//! started always completes.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

use crate::app::ports::{Characteristic, NotificationPort};

/// Default spacing between notification batches.
pub const DEFAULT_NOTIFY_INTERVAL_MS: u32 = 10_000;

/// Characteristics pushed in every batch, in order.
pub const NOTIFY_BATCH: [Characteristic; 2] = [Characteristic::AirQuality, Characteristic::Temperature];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierState {
    Waiting,
    Due,
    Stopped,
}

/// Result of a single wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeOutcome {
    Idle,
    Fired,
    Stopped,
}

/// Shared stop flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct PeriodicNotifier {
    interval_ms: u32,
    last_fire_ms: u64,
    state: NotifierState,
    batches: u32,
}

impl PeriodicNotifier {
    /// Arm the notifier; the first batch is due one interval after `now_ms`.
    pub fn new(interval_ms: u32, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fire_ms: now_ms,
            state: NotifierState::Waiting,
            batches: 0,
        }
    }

    pub fn state(&self) -> NotifierState {
        self.state
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Number of batches raised so far.
    pub fn batches(&self) -> u32 {
        self.batches
    }

    /// Restart the interval from `now_ms` without firing.
    pub fn rearm(&mut self, now_ms: u64) {
        if self.state != NotifierState::Stopped {
            self.last_fire_ms = now_ms;
            self.state = NotifierState::Waiting;
        }
    }

    pub fn wake(
        &mut self,
        now_ms: u64,
        token: &CancelToken,
        notify: &mut impl NotificationPort,
    ) -> WakeOutcome {
        if self.state == NotifierState::Stopped {
            return WakeOutcome::Stopped;
        }
        if token.is_cancelled() {
            info!("notifier: cancelled after {} batches", self.batches);
            self.state = NotifierState::Stopped;
            return WakeOutcome::Stopped;
        }

        let elapsed = now_ms.saturating_sub(self.last_fire_ms);
        if elapsed <= u64::from(self.interval_ms) {
            return WakeOutcome::Idle;
        }

        self.state = NotifierState::Due;
        for characteristic in NOTIFY_BATCH {
            notify.raise_event(characteristic);
        }
        self.last_fire_ms = now_ms;
        self.batches = self.batches.saturating_add(1);
        self.state = NotifierState::Waiting;
        WakeOutcome::Fired
    }
}
