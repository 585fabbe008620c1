//! Protocol bridge: channels between the accessory server and the run loop.
//!
//! Uses `embassy-sync` bounded channels so the protocol server's callbacks
//! (on whatever task the server runs) never touch the controller directly.
//! The run loop drains requests, answers them, and wakes the notifier.
//!
//! ```text
//! ┌─────────────────┐  RequestMsg      ┌──────────────┐
//! │ Accessory server│────────────────▶│   Run loop   │
//! │  (protocol)     │◀────────────────│ (controller) │
//! │                 │  ResponseMsg     │              │
//! │                 │◀────────────────│              │
//! └─────────────────┘  Characteristic  └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::commands::{AccessoryRequest, AccessoryResponse};
use crate::app::events::ServerState;
use crate::app::ports::{
    AccessoryHardware, Characteristic, ClockPort, EventSink, KeyValueStore, NotificationPort,
};
use crate::app::service::StateController;
use crate::error::Result;
use crate::notifier::{CancelToken, WakeOutcome};
use crate::persistence::PersistentStateStore;

/// Inbound request tagged with the server's correlation id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestMsg {
    pub id: u16,
    pub request: AccessoryRequest,
}

/// Outbound answer for the request with the same id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseMsg {
    pub id: u16,
    pub response: AccessoryResponse,
}

/// Channel depth for inbound requests.
const REQUEST_DEPTH: usize = 8;
/// Channel depth for outbound responses.
const RESPONSE_DEPTH: usize = 8;
/// Channel depth for outbound value-changed notifications.
const NOTIFY_DEPTH: usize = 8;
/// Channel depth for server lifecycle updates.
const SERVER_STATE_DEPTH: usize = 4;

pub type RequestChannel = Channel<CriticalSectionRawMutex, RequestMsg, REQUEST_DEPTH>;
pub type ResponseChannel = Channel<CriticalSectionRawMutex, ResponseMsg, RESPONSE_DEPTH>;
pub type NotifyChannel = Channel<CriticalSectionRawMutex, Characteristic, NOTIFY_DEPTH>;
pub type ServerStateChannel = Channel<CriticalSectionRawMutex, ServerState, SERVER_STATE_DEPTH>;

/// Protocol server → run loop.
pub static REQUEST_CHANNEL: RequestChannel = Channel::new();
/// Run loop → protocol server.
pub static RESPONSE_CHANNEL: ResponseChannel = Channel::new();
/// Run loop → protocol server (raise-event requests).
pub static NOTIFY_CHANNEL: NotifyChannel = Channel::new();
/// Protocol server → run loop (lifecycle updates).
pub static SERVER_STATE_CHANNEL: ServerStateChannel = Channel::new();

/// The channel set the run loop services.
#[derive(Clone, Copy)]
pub struct Mailbox<'a> {
    pub requests: &'a RequestChannel,
    pub responses: &'a ResponseChannel,
    pub server_states: &'a ServerStateChannel,
}

impl Mailbox<'static> {
    /// The process-wide channels.
    pub fn global() -> Self {
        Self {
            requests: &REQUEST_CHANNEL,
            responses: &RESPONSE_CHANNEL,
            server_states: &SERVER_STATE_CHANNEL,
        }
    }
}

/// [`NotificationPort`] that forwards raise-event requests over a channel.
pub struct ChannelNotifier<'a> {
    channel: &'a NotifyChannel,
    dropped: u32,
}

impl<'a> ChannelNotifier<'a> {
    pub fn new(channel: &'a NotifyChannel) -> Self {
        Self { channel, dropped: 0 }
    }

    /// Notifications lost because the channel was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl NotificationPort for ChannelNotifier<'_> {
    fn raise_event(&mut self, characteristic: Characteristic) {
        if self.channel.try_send(characteristic).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("bridge: notify channel full, dropped {}", characteristic.name());
        }
    }
}

/// Apply queued lifecycle updates, then answer every queued request.
///
/// Returns the number of requests served. A request that fails (power write
/// under the `Halt` store policy) is answered with
/// [`AccessoryResponse::Failed`] and the error is returned immediately.
pub fn serve_pending<K: KeyValueStore, D: DelayNs>(
    controller: &mut StateController,
    now_ms: u64,
    hw: &mut impl AccessoryHardware,
    store: &mut PersistentStateStore<K, D>,
    notify: &mut impl NotificationPort,
    sink: &mut impl EventSink,
    mailbox: Mailbox<'_>,
) -> Result<usize> {
    while let Ok(server_state) = mailbox.server_states.try_receive() {
        controller.on_server_state(server_state, sink);
    }

    let mut served = 0;
    while let Ok(msg) = mailbox.requests.try_receive() {
        let result = controller.handle_request(msg.request, now_ms, hw, store, notify, sink);
        let response = match &result {
            Ok(response) => *response,
            Err(e) => {
                let target = msg
                    .request
                    .characteristic()
                    .map_or("accessory", Characteristic::name);
                warn!("bridge: request #{} on {} failed ({})", msg.id, target, e);
                AccessoryResponse::Failed
            }
        };
        if mailbox
            .responses
            .try_send(ResponseMsg {
                id: msg.id,
                response,
            })
            .is_err()
        {
            warn!("bridge: response channel full, dropped reply {}", msg.id);
        }
        result?;
        served += 1;
    }
    Ok(served)
}

/// Drive the controller until the notifier is cancelled.
///
/// Each iteration sleeps one poll interval, serves pending requests and
/// wakes the notifier. Returns `Ok(())` once the notifier reports
/// `Stopped`, or the first unrecoverable error.
pub fn run<K: KeyValueStore, D: DelayNs>(
    controller: &mut StateController,
    clock: &impl ClockPort,
    delay: &mut impl DelayNs,
    hw: &mut impl AccessoryHardware,
    store: &mut PersistentStateStore<K, D>,
    notify: &mut impl NotificationPort,
    sink: &mut impl EventSink,
    token: &CancelToken,
    mailbox: Mailbox<'_>,
    poll_interval_ms: u32,
) -> Result<()> {
    info!("bridge: run loop started (poll every {} ms)", poll_interval_ms);
    loop {
        delay.delay_ms(poll_interval_ms);
        let now_ms = clock.now_ms();
        serve_pending(controller, now_ms, hw, store, notify, sink, mailbox)?;
        if controller.poll(now_ms, token, notify, sink) == WakeOutcome::Stopped {
            info!("bridge: run loop stopped");
            return Ok(());
        }
    }
}
