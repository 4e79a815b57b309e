//! One running game session
//!
//! Owns everything the client knows about the match and is driven from a
//! single task: frames, inbound snapshots and input events are applied one at
//! a time, so none of the state below needs locking.

use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::api::SessionBootstrap;
use crate::config::SyncSettings;
use crate::util::time::SessionClock;
use crate::ws::channel::{OutboundSink, SendOutcome};
use crate::ws::protocol::{decode_snapshot, OutboundMsg, PointerOffset};

use super::coords::{PixelPoint, TileGrid};
use super::dust::DustEffects;
use super::input::{InputEvent, InputStateMachine};
use super::map::MapDescriptor;
use super::pose::Pose;
use super::prediction::{FrameOutcome, PredictionLoop};
use super::state::PlayerStore;

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub snapshots_applied: u64,
    pub snapshots_malformed: u64,
    pub sends_ok: u64,
    pub sends_dropped: u64,
    pub dust_emitted: u64,
}

/// Window size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// One character as the renderer should draw it
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSprite {
    pub id: Uuid,
    pub is_local: bool,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    pub pose: Pose,
    pub mouse_position: Option<PointerOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustSprite {
    pub id: u64,
    pub position: PixelPoint,
    pub frame: u32,
}

/// Everything visible at one instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    /// Ordered by player id
    pub players: Vec<PlayerSprite>,
    pub dust: Vec<DustSprite>,
}

impl RenderFrame {
    pub fn player(&self, id: &Uuid) -> Option<&PlayerSprite> {
        self.players.iter().find(|p| p.id == *id)
    }

    pub fn local(&self) -> Option<&PlayerSprite> {
        self.players.iter().find(|p| p.is_local)
    }
}

pub struct Session<S: OutboundSink> {
    player_id: Uuid,
    map: MapDescriptor,
    grid: TileGrid,
    store: PlayerStore,
    input: InputStateMachine,
    prediction: PredictionLoop,
    dust: DustEffects,
    sink: S,
    clock: SessionClock,
    stats: SessionStats,
    viewport: Option<Viewport>,
}

impl<S: OutboundSink> Session<S> {
    pub fn new(
        bootstrap: SessionBootstrap,
        settings: &SyncSettings,
        clock: SessionClock,
        sink: S,
    ) -> Self {
        let SessionBootstrap { player_id, map } = bootstrap;
        let grid = TileGrid::from_settings(settings, map.height_tiles());
        let prediction = PredictionLoop::new(
            clock.clone(),
            settings.send_interval,
            settings.tile_size,
            map.max_x(),
        );

        info!(
            player_id = %player_id,
            map = %map.name,
            send_interval_ms = settings.send_interval.as_millis() as u64,
            "Session started"
        );

        Self {
            player_id,
            map,
            grid,
            store: PlayerStore::new(player_id),
            input: InputStateMachine::new(),
            prediction,
            dust: DustEffects::new(),
            sink,
            clock,
            stats: SessionStats::default(),
            viewport: None,
        }
    }

    pub fn player_id(&self) -> Uuid {
        self.player_id
    }

    pub fn map(&self) -> &MapDescriptor {
        &self.map
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    pub fn input(&self) -> &InputStateMachine {
        &self.input
    }

    pub fn dust(&self) -> &DustEffects {
        &self.dust
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Run one prediction frame and age the dust
    pub fn on_frame(&mut self) {
        self.stats.frames += 1;
        let now = self.clock.elapsed();

        let outcome = self.prediction.tick(&mut self.store, self.input.state());
        if let FrameOutcome::Predicted(frame) = outcome {
            if let Some(msg) = frame.position_msg {
                if self.dispatch(&msg).is_sent() {
                    self.prediction.confirm_sent(&msg);
                }
            }

            if let Some(direction) = frame.reversal {
                let spawned = match (self.store.local_player(), self.store.local_view()) {
                    (Some(player), Some(view)) => {
                        self.dust
                            .spawn_footsteps(&player.pose, view.position(), &self.grid, now)
                    }
                    _ => 0,
                };
                self.stats.dust_emitted += spawned as u64;
                debug!(?direction, spawned, x = frame.x, "Run direction reversed");
            }
        }

        let pruned = self.dust.prune(now);
        if pruned > 0 {
            trace!(pruned, "Dust pruned");
        }
    }

    /// Apply one inbound text frame. A malformed frame leaves the store as it was.
    pub fn on_inbound(&mut self, text: &str) {
        match decode_snapshot(text) {
            Ok(snapshot) => {
                self.store.apply_snapshot(snapshot);
                self.stats.snapshots_applied += 1;
            }
            Err(e) => {
                self.stats.snapshots_malformed += 1;
                warn!(error = %e, len = text.len(), "Discarding malformed snapshot");
            }
        }
    }

    /// Apply one input event, sending its edge message if it has one
    pub fn on_input(&mut self, event: InputEvent) -> Option<SendOutcome> {
        let msg = match event {
            InputEvent::Pressed(action) => self.input.press(action),
            InputEvent::Released(action) => self.input.release(action),
            InputEvent::PointerMoved { x, y } => {
                let anchor = self.local_anchor()?;
                let offset = PointerOffset {
                    x: x - anchor.x,
                    y: y - anchor.y,
                };
                Some(self.input.pointer_moved(offset))
            }
            InputEvent::Resized { width, height } => {
                self.viewport = Some(Viewport { width, height });
                info!(width, height, "Viewport resized");
                None
            }
        }?;
        Some(self.dispatch(&msg))
    }

    /// Snapshot of everything the renderer draws right now
    pub fn render(&self) -> RenderFrame {
        let (width, height) = self.grid.character_size();
        let mut players: Vec<PlayerSprite> = self
            .store
            .iter()
            .map(|(id, player)| {
                let is_local = self.store.is_local(id);
                let feet = match self.store.local_view().filter(|_| is_local) {
                    Some(view) => view.position(),
                    None => player.position(),
                };
                let anchor = self.grid.character_anchor(feet);
                PlayerSprite {
                    id: *id,
                    is_local,
                    left: anchor.x,
                    top: anchor.y,
                    width,
                    height,
                    angle: player.angle,
                    pose: player.pose.clone(),
                    mouse_position: player.mouse_position,
                }
            })
            .collect();
        players.sort_by_key(|p| p.id);

        let now = self.clock.elapsed();
        let dust = self
            .dust
            .visible(now)
            .map(|(event, frame)| DustSprite {
                id: event.id,
                position: event.position,
                frame,
            })
            .collect();

        RenderFrame { players, dust }
    }

    /// End the session and hand back the sink for teardown
    pub fn shutdown(self) -> S {
        info!(
            player_id = %self.player_id,
            frames = self.stats.frames,
            snapshots_applied = self.stats.snapshots_applied,
            snapshots_malformed = self.stats.snapshots_malformed,
            sends_ok = self.stats.sends_ok,
            sends_dropped = self.stats.sends_dropped,
            dust_emitted = self.stats.dust_emitted,
            "Session ended"
        );
        self.sink
    }

    /// Top-left pixel of the local sprite, once it is on screen
    fn local_anchor(&self) -> Option<PixelPoint> {
        self.store.local_player()?;
        let view = self.store.local_view()?;
        Some(self.grid.character_anchor(view.position()))
    }

    fn dispatch(&mut self, msg: &OutboundMsg) -> SendOutcome {
        let outcome = self.sink.send(msg);
        match outcome {
            SendOutcome::Sent => self.stats.sends_ok += 1,
            SendOutcome::Dropped(reason) => {
                self.stats.sends_dropped += 1;
                debug!(kind = msg.kind(), ?reason, "Outbound message dropped");
            }
        }
        outcome
    }
}
