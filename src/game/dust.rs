//! Footstep dust: run-direction reversal detection and effect lifetimes

use std::time::Duration;

use super::coords::{PixelPoint, TileGrid, TilePoint};
use super::pose::Pose;

/// Sprite frames per dust puff
pub const DUST_FRAME_COUNT: u32 = 3;
/// Time each sprite frame is shown
pub const DUST_FRAME_DURATION: Duration = Duration::from_millis(100);
/// Sprite offset from the ankle pivot, in pixels
pub const DUST_OFFSET: (f64, f64) = (-40.0, 39.0);
/// Movement below this (tiles) never counts as a reversal
pub const REVERSAL_EPSILON: f64 = 0.01;

/// Horizontal run direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Direction of travel from `from` to `to`; no movement counts as right
    pub fn between(from: f64, to: f64) -> Self {
        if to < from {
            Self::Left
        } else {
            Self::Right
        }
    }
}

/// Watches the predicted x for a change of run direction
#[derive(Debug, Default)]
pub struct ReversalDetector {
    last_direction: Option<Direction>,
}

impl ReversalDetector {
    pub fn last_direction(&self) -> Option<Direction> {
        self.last_direction
    }

    /// Feed one prediction tick. Returns the new direction on a reversal.
    ///
    /// Only running movement counts. The first qualifying movement records a
    /// direction without reporting it.
    pub fn observe(&mut self, previous_x: f64, new_x: f64, running: bool) -> Option<Direction> {
        if !running || (new_x - previous_x).abs() <= REVERSAL_EPSILON {
            return None;
        }
        let direction = Direction::between(previous_x, new_x);
        match self.last_direction.replace(direction) {
            Some(last) if last != direction => Some(direction),
            _ => None,
        }
    }
}

/// A short-lived dust puff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustEvent {
    pub id: u64,
    /// Top-left pixel of the sprite
    pub position: PixelPoint,
    pub created_at: Duration,
}

impl DustEvent {
    /// Sprite frame showing at `now`, or `None` once the animation is over
    pub fn frame_at(&self, now: Duration) -> Option<u32> {
        let age = now.saturating_sub(self.created_at);
        let frame = (age.as_millis() / DUST_FRAME_DURATION.as_millis()) as u32;
        (frame < DUST_FRAME_COUNT).then_some(frame)
    }
}

/// Active dust puffs
#[derive(Debug, Default)]
pub struct DustEffects {
    active: Vec<DustEvent>,
    next_id: u64,
}

impl DustEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn one puff per foot of a character standing at `feet`.
    /// Returns how many were spawned: 2, or 0 if the pose lacks either ankle.
    pub fn spawn_footsteps(
        &mut self,
        pose: &Pose,
        feet: TilePoint,
        grid: &TileGrid,
        now: Duration,
    ) -> usize {
        let Some((left, right)) = pose.ankles() else {
            return 0;
        };
        for ankle in [left, right] {
            let position = grid
                .pose_point_to_screen(feet, ankle)
                .offset(DUST_OFFSET.0, DUST_OFFSET.1);
            self.active.push(DustEvent {
                id: self.next_id,
                position,
                created_at: now,
            });
            self.next_id += 1;
        }
        2
    }

    /// Drop finished puffs. Returns how many were removed.
    pub fn prune(&mut self, now: Duration) -> usize {
        let before = self.active.len();
        self.active.retain(|d| d.frame_at(now).is_some());
        before - self.active.len()
    }

    /// Puffs still animating at `now`, with their current frame
    pub fn visible(&self, now: Duration) -> impl Iterator<Item = (&DustEvent, u32)> {
        self.active
            .iter()
            .filter_map(move |d| d.frame_at(now).map(|frame| (d, frame)))
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
