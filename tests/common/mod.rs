//! Shared fixtures for session-level tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

use swordplay_client::api::SessionBootstrap;
use swordplay_client::config::SyncSettings;
use swordplay_client::game::map::MapDescriptor;
use swordplay_client::game::session::Session;
use swordplay_client::util::time::SessionClock;
use swordplay_client::ws::channel::{DropReason, OutboundSink, SendOutcome};
use swordplay_client::ws::protocol::OutboundMsg;

/// Sink that records every accepted message with the session time it was sent
pub struct RecordingSink {
    clock: SessionClock,
    open: Cell<bool>,
    sent: RefCell<Vec<(Duration, OutboundMsg)>>,
}

impl RecordingSink {
    pub fn new(clock: SessionClock) -> Self {
        Self {
            clock,
            open: Cell::new(true),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn set_open(&self, open: bool) {
        self.open.set(open);
    }

    pub fn sent(&self) -> Vec<(Duration, OutboundMsg)> {
        self.sent.borrow().clone()
    }

    /// Send times of the periodic position messages
    pub fn position_times(&self) -> Vec<Duration> {
        self.sent
            .borrow()
            .iter()
            .filter(|(_, msg)| matches!(msg, OutboundMsg::Position { .. }))
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.sent
            .borrow()
            .iter()
            .filter(|(_, msg)| msg.kind() == kind)
            .count()
    }
}

impl OutboundSink for RecordingSink {
    fn send(&self, msg: &OutboundMsg) -> SendOutcome {
        if !self.open.get() {
            return SendOutcome::Dropped(DropReason::ChannelNotOpen);
        }
        self.sent
            .borrow_mut()
            .push((self.clock.elapsed(), msg.clone()));
        SendOutcome::Sent
    }
}

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// A 20x15 map, the size used by the default server map
pub fn bootstrap() -> SessionBootstrap {
    SessionBootstrap {
        player_id: Uuid::new_v4(),
        map: MapDescriptor {
            name: "arena".into(),
            width: 20,
            height: 15,
            tiles: Vec::new(),
        },
    }
}

pub fn new_session() -> (Session<RecordingSink>, SessionClock) {
    let clock = SessionClock::manual();
    let session = Session::new(
        bootstrap(),
        &SyncSettings::default(),
        clock.clone(),
        RecordingSink::new(clock.clone()),
    );
    (session, clock)
}

/// One player's snapshot entry with both ankles posed
pub fn player_json(x: f64, y: f64, speed: f64) -> Value {
    json!({
        "x": x,
        "y": y,
        "speed": speed,
        "angle": 0.0,
        "pivot_points": {
            "l_ankle": [0.3, 0.1],
            "r_ankle": [0.7, 0.0],
            "neck": [0.5, 1.8]
        },
        "crouching": false
    })
}

/// Serialize a snapshot frame from (id, entry) pairs
pub fn snapshot(entries: &[(Uuid, Value)]) -> String {
    let map: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(id, entry)| (id.to_string(), entry.clone()))
        .collect();
    Value::Object(map).to_string()
}
