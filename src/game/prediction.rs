//! Local prediction of the player's horizontal position
//!
//! Runs once per frame. Speed always comes from the last snapshot; the loop
//! only integrates x with it, so divergence is bounded by one snapshot's
//! worth of speed staleness.

use std::time::Duration;

use tracing::trace;

use crate::util::rate_limit::SendThrottle;
use crate::util::time::SessionClock;
use crate::ws::protocol::OutboundMsg;

use super::dust::{Direction, ReversalDetector};
use super::input::InputState;
use super::state::PlayerStore;

/// Content of the last periodic message that actually went out
#[derive(Debug, Clone, Copy, PartialEq)]
struct SentPosition {
    x: f64,
    running: bool,
    crouching: bool,
}

/// Prediction-private memory: last frame time, last x, run direction, last send
#[derive(Debug, Default)]
pub struct LocalPredictionCache {
    last_frame_at: Option<Duration>,
    last_x: Option<f64>,
    reversal: ReversalDetector,
    last_sent: Option<SentPosition>,
}

impl LocalPredictionCache {
    pub fn last_x(&self) -> Option<f64> {
        self.last_x
    }

    pub fn last_direction(&self) -> Option<Direction> {
        self.reversal.last_direction()
    }
}

/// Result of one prediction step
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// No local player in the store yet
    Idle,
    Predicted(PredictedFrame),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictedFrame {
    pub delta: Duration,
    pub x: f64,
    /// Set when a running reversal happened this frame
    pub reversal: Option<Direction>,
    /// Periodic message the throttle let through this frame
    pub position_msg: Option<OutboundMsg>,
}

/// Pure horizontal step: both keys held cancel out additively. The result
/// always lies in `[0, max_x]`, even when the starting x did not.
pub fn step_x(
    x: f64,
    speed: f64,
    tile_size: f64,
    delta: Duration,
    input: &InputState,
    max_x: f64,
) -> f64 {
    let distance = (speed / tile_size) * delta.as_secs_f64();
    let mut x = x;
    if input.left {
        x = (x - distance).max(0.0);
    }
    if input.right {
        x = (x + distance).min(max_x);
    }
    x.clamp(0.0, max_x)
}

/// The per-frame prediction step
pub struct PredictionLoop {
    clock: SessionClock,
    throttle: SendThrottle,
    tile_size: f64,
    max_x: f64,
    cache: LocalPredictionCache,
}

impl PredictionLoop {
    pub fn new(clock: SessionClock, send_interval: Duration, tile_size: f64, max_x: f64) -> Self {
        let throttle = SendThrottle::new(send_interval, &clock);
        Self {
            clock,
            throttle,
            tile_size,
            max_x,
            cache: LocalPredictionCache::default(),
        }
    }

    pub fn cache(&self) -> &LocalPredictionCache {
        &self.cache
    }

    /// Advance the local prediction to the clock's current time
    pub fn tick(&mut self, store: &mut PlayerStore, input: &InputState) -> FrameOutcome {
        let now = self.clock.elapsed();
        let delta = self
            .cache
            .last_frame_at
            .map(|last| now.saturating_sub(last))
            .unwrap_or(Duration::ZERO);
        self.cache.last_frame_at = Some(now);

        let (Some(server), Some(view)) = (store.local_player(), store.local_view()) else {
            return FrameOutcome::Idle;
        };
        let speed = server.speed;
        let x = step_x(view.x, speed, self.tile_size, delta, input, self.max_x);

        let reversal = self
            .cache
            .last_x
            .and_then(|previous| self.cache.reversal.observe(previous, x, input.running));
        self.cache.last_x = Some(x);
        store.set_predicted_x(x);

        let position_msg = self.position_message(x, input);

        trace!(x, speed, delta_ms = delta.as_millis() as u64, "Predicted local position");

        FrameOutcome::Predicted(PredictedFrame {
            delta,
            x,
            reversal,
            position_msg,
        })
    }

    /// Record that the periodic message went out
    pub fn confirm_sent(&mut self, msg: &OutboundMsg) {
        if let OutboundMsg::Position {
            x,
            running,
            crouching,
        } = *msg
        {
            self.cache.last_sent = Some(SentPosition {
                x,
                running,
                crouching,
            });
        }
    }

    fn position_message(&mut self, x: f64, input: &InputState) -> Option<OutboundMsg> {
        let current = SentPosition {
            x,
            running: input.running,
            crouching: input.crouching,
        };
        if self.cache.last_sent == Some(current) {
            return None;
        }
        if !self.throttle.try_acquire() {
            return None;
        }
        Some(OutboundMsg::Position {
            x,
            running: input.running,
            crouching: input.crouching,
        })
    }
}
