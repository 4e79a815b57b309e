//! Shared player-state store and snapshot reconciliation
//!
//! Field ownership is split between the two writers:
//! - the prediction loop owns the local player's x once it has predicted it,
//! - snapshots own everything else (all remote state, and the local y,
//!   speed, angle and pose).
//!
//! Reconciliation therefore never overwrites a predicted local x, which keeps
//! the result independent of whether a snapshot lands before or after a frame.

use std::collections::HashMap;

use tracing::trace;
use uuid::Uuid;

use crate::ws::protocol::{PlayerSnapshot, PointerOffset, WorldSnapshot};

use super::coords::TilePoint;
use super::pose::Pose;

/// Authoritative state of one player, as last told by the server
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub angle: f64,
    pub pose: Pose,
    pub crouching: bool,
    pub mouse_position: Option<PointerOffset>,
}

impl PlayerState {
    pub fn position(&self) -> TilePoint {
        TilePoint::new(self.x, self.y)
    }
}

impl From<PlayerSnapshot> for PlayerState {
    fn from(s: PlayerSnapshot) -> Self {
        Self {
            x: s.x,
            y: s.y,
            speed: s.speed,
            angle: s.angle,
            pose: s.pivot_points,
            crouching: s.crouching,
            mouse_position: s.mouse_position,
        }
    }
}

/// What the renderer shows for the local player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalView {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub angle: f64,
    /// Set once the prediction loop has written x
    pub predicted: bool,
}

impl LocalView {
    pub fn position(&self) -> TilePoint {
        TilePoint::new(self.x, self.y)
    }
}

/// Where the local x came from after a snapshot was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalXSource {
    /// First sighting: x taken from the server
    Seeded,
    /// Prediction kept ownership of x
    Predicted,
    /// The snapshot had no entry for the local player
    Absent,
}

/// Outcome of applying one snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileReport {
    pub remote_players: usize,
    pub local_x: LocalXSource,
    /// Server x minus predicted x, when prediction owns x
    pub drift: Option<f64>,
}

/// The shared store read by the renderer every frame
#[derive(Debug, Clone)]
pub struct PlayerStore {
    local_id: Uuid,
    players: HashMap<Uuid, PlayerState>,
    local: Option<LocalView>,
}

impl PlayerStore {
    pub fn new(local_id: Uuid) -> Self {
        Self {
            local_id,
            players: HashMap::new(),
            local: None,
        }
    }

    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    /// Server-side state of the local player, if the last snapshot had it
    pub fn local_player(&self) -> Option<&PlayerState> {
        self.players.get(&self.local_id)
    }

    pub fn local_view(&self) -> Option<&LocalView> {
        self.local.as_ref()
    }

    pub fn get(&self, id: &Uuid) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_local(&self, id: &Uuid) -> bool {
        *id == self.local_id
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &PlayerState)> {
        self.players.iter()
    }

    pub fn remotes(&self) -> impl Iterator<Item = (&Uuid, &PlayerState)> {
        let local_id = self.local_id;
        self.players.iter().filter(move |(id, _)| **id != local_id)
    }

    /// Merge an authoritative snapshot.
    ///
    /// The players collection is replaced as a whole. The local view takes
    /// y, speed and angle from the server; x is taken only until the
    /// prediction loop has written one.
    pub fn apply_snapshot(&mut self, snapshot: WorldSnapshot) -> ReconcileReport {
        self.players = snapshot
            .players
            .into_iter()
            .map(|(id, player)| (id, PlayerState::from(player)))
            .collect();

        let remote_players = self.players.len() - usize::from(self.local_player().is_some());

        let Some(server) = self.players.get(&self.local_id) else {
            return ReconcileReport {
                remote_players,
                local_x: LocalXSource::Absent,
                drift: None,
            };
        };

        let report = match self.local.as_mut().filter(|view| view.predicted) {
            Some(view) => {
                view.y = server.y;
                view.speed = server.speed;
                view.angle = server.angle;
                ReconcileReport {
                    remote_players,
                    local_x: LocalXSource::Predicted,
                    drift: Some(server.x - view.x),
                }
            }
            None => {
                self.local = Some(LocalView {
                    x: server.x,
                    y: server.y,
                    speed: server.speed,
                    angle: server.angle,
                    predicted: false,
                });
                ReconcileReport {
                    remote_players,
                    local_x: LocalXSource::Seeded,
                    drift: None,
                }
            }
        };

        trace!(
            remote_players = report.remote_players,
            local_x = ?report.local_x,
            drift = ?report.drift,
            "Snapshot reconciled"
        );
        report
    }

    /// Record a predicted local x. No-op until the local player is known.
    pub fn set_predicted_x(&mut self, x: f64) {
        let speed = self.local_player().map(|p| p.speed);
        if let Some(view) = self.local.as_mut() {
            view.x = x;
            if let Some(speed) = speed {
                view.speed = speed;
            }
            view.predicted = true;
        }
    }
}
