//! Integration tests for the protocol bridge: request servicing over
//! channels and the cooperative run loop on simulated time.

use crate::mock_hw::{MockHardware, MockKv, RecordingNotify, RecordingSink, SimTime, mock_store};

use airsense::app::commands::{AccessoryRequest, AccessoryResponse};
use airsense::app::events::{AppEvent, ServerState};
use airsense::app::ports::{Characteristic, NotificationPort};
use airsense::app::service::StateController;
use airsense::bridge::{
    self, Mailbox, RequestChannel, RequestMsg, ResponseChannel, ResponseMsg, ServerStateChannel,
};
use airsense::config::{AccessoryConfig, StoreFailurePolicy};
use airsense::error::Error;
use airsense::notifier::CancelToken;

struct Channels {
    requests: RequestChannel,
    responses: ResponseChannel,
    server_states: ServerStateChannel,
}

impl Channels {
    fn new() -> Self {
        Self {
            requests: RequestChannel::new(),
            responses: ResponseChannel::new(),
            server_states: ServerStateChannel::new(),
        }
    }

    fn mailbox(&self) -> Mailbox<'_> {
        Mailbox {
            requests: &self.requests,
            responses: &self.responses,
            server_states: &self.server_states,
        }
    }

    fn send(&self, id: u16, request: AccessoryRequest) {
        assert!(self.requests.try_send(RequestMsg { id, request }).is_ok());
    }

    fn replies(&self) -> Vec<ResponseMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = self.responses.try_receive() {
            out.push(msg);
        }
        out
    }
}

/// Notification recorder that cancels the run loop after `limit` events.
struct CancellingNotify {
    inner: RecordingNotify,
    token: CancelToken,
    limit: usize,
}

impl NotificationPort for CancellingNotify {
    fn raise_event(&mut self, characteristic: Characteristic) {
        self.inner.raise_event(characteristic);
        if self.inner.raised.len() >= self.limit {
            self.token.cancel();
        }
    }
}

// ── serve_pending ─────────────────────────────────────────────

#[test]
fn serve_pending_answers_in_order_with_ids() {
    let channels = Channels::new();
    let mut ctl = StateController::new(&AccessoryConfig::default(), 0);
    let mut hw = MockHardware::new();
    hw.air_raw = 1_700;
    let mut store = mock_store(MockKv::new());
    let mut notify = RecordingNotify::default();
    let mut sink = RecordingSink::default();

    channels.send(7, AccessoryRequest::WritePower(true));
    channels.send(8, AccessoryRequest::ReadPower);
    channels.send(9, AccessoryRequest::ReadAirQuality);

    let served = bridge::serve_pending(
        &mut ctl,
        0,
        &mut hw,
        &mut store,
        &mut notify,
        &mut sink,
        channels.mailbox(),
    )
    .unwrap();

    assert_eq!(served, 3);
    assert_eq!(
        channels.replies(),
        vec![
            ResponseMsg { id: 7, response: AccessoryResponse::Ack },
            ResponseMsg { id: 8, response: AccessoryResponse::Bool(true) },
            ResponseMsg { id: 9, response: AccessoryResponse::UInt8(1) },
        ]
    );
    assert_eq!(notify.raised, vec![Characteristic::PowerState]);
}

#[test]
fn serve_pending_applies_server_state_before_requests() {
    let channels = Channels::new();
    let mut ctl = StateController::new(&AccessoryConfig::default(), 0);
    let mut hw = MockHardware::new();
    let mut store = mock_store(MockKv::new());
    let mut notify = RecordingNotify::default();
    let mut sink = RecordingSink::default();

    assert!(channels.server_states.try_send(ServerState::Running).is_ok());
    channels.send(1, AccessoryRequest::Identify);

    bridge::serve_pending(
        &mut ctl,
        0,
        &mut hw,
        &mut store,
        &mut notify,
        &mut sink,
        channels.mailbox(),
    )
    .unwrap();

    assert_eq!(ctl.server_state(), ServerState::Running);
    assert_eq!(
        sink.events,
        vec![
            AppEvent::ServerStateChanged(ServerState::Running),
            AppEvent::Identified,
        ]
    );
}

#[test]
fn failed_write_under_halt_replies_failed_and_returns_error() {
    let channels = Channels::new();
    let config = AccessoryConfig {
        store_failure_policy: StoreFailurePolicy::Halt,
        ..Default::default()
    };
    let mut ctl = StateController::new(&config, 0);
    let mut hw = MockHardware::new();
    let mut store = mock_store(MockKv {
        fail_sets: 10,
        ..Default::default()
    });
    let mut notify = RecordingNotify::default();
    let mut sink = RecordingSink::default();

    channels.send(3, AccessoryRequest::WritePower(true));
    channels.send(4, AccessoryRequest::ReadPower);

    let err = bridge::serve_pending(
        &mut ctl,
        0,
        &mut hw,
        &mut store,
        &mut notify,
        &mut sink,
        channels.mailbox(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Store(_)));
    assert_eq!(
        channels.replies(),
        vec![ResponseMsg {
            id: 3,
            response: AccessoryResponse::Failed
        }]
    );
    // The second request is left queued for whoever handles the restart.
    assert!(channels.requests.try_receive().is_ok());
}

// ── run ───────────────────────────────────────────────────────

#[test]
fn run_raises_batch_after_interval_and_stops_on_cancel() {
    let channels = Channels::new();
    let time = SimTime::default();
    let mut delay = time.clone();
    let mut ctl = StateController::new(&AccessoryConfig::default(), 0);
    let mut hw = MockHardware::new();
    let mut store = mock_store(MockKv::new());
    let token = CancelToken::new();
    let mut notify = CancellingNotify {
        inner: RecordingNotify::default(),
        token: token.clone(),
        limit: 2,
    };
    let mut sink = RecordingSink::default();

    bridge::run(
        &mut ctl,
        &time,
        &mut delay,
        &mut hw,
        &mut store,
        &mut notify,
        &mut sink,
        &token,
        channels.mailbox(),
        100,
    )
    .unwrap();

    // First batch at 10 100 ms, cancellation seen one poll later.
    assert_eq!(time.0.get(), 10_200);
    assert_eq!(
        notify.inner.raised,
        vec![Characteristic::AirQuality, Characteristic::Temperature]
    );
    assert_eq!(ctl.notifier().batches(), 1);
}

#[test]
fn run_serves_queued_requests_on_first_iteration() {
    let channels = Channels::new();
    let time = SimTime::default();
    let mut delay = time.clone();
    let mut ctl = StateController::new(&AccessoryConfig::default(), 0);
    let mut hw = MockHardware::new();
    hw.set_climate(25.0, 40.0);
    let mut store = mock_store(MockKv::new());
    let token = CancelToken::new();
    let mut notify = CancellingNotify {
        inner: RecordingNotify::default(),
        token: token.clone(),
        limit: 1,
    };
    let mut sink = RecordingSink::default();

    channels.send(1, AccessoryRequest::ReadTemperature);
    channels.send(2, AccessoryRequest::WritePower(true));

    bridge::run(
        &mut ctl,
        &time,
        &mut delay,
        &mut hw,
        &mut store,
        &mut notify,
        &mut sink,
        &token,
        channels.mailbox(),
        100,
    )
    .unwrap();

    // The power notification cancels the loop at the first poll.
    assert_eq!(time.0.get(), 100);
    assert_eq!(
        channels.replies(),
        vec![
            ResponseMsg { id: 1, response: AccessoryResponse::Float(25.0) },
            ResponseMsg { id: 2, response: AccessoryResponse::Ack },
        ]
    );
    assert_eq!(store.kv().sets, 1);
}
