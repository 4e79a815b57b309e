//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::pose::Pose;

/// Pointer offset in screen pixels, relative to the local player's sprite
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerOffset {
    pub x: f64,
    pub y: f64,
}

/// Messages sent from client to server
///
/// The server accepts loose JSON objects with no common envelope, so the
/// variants serialize untagged. Variant order matters for decoding: the
/// periodic position message is the only one carrying `x` and must be tried
/// before the standalone crouch toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundMsg {
    /// Periodic predicted position plus level-triggered flags
    Position {
        x: f64,
        running: bool,
        crouching: bool,
    },

    /// One-shot jump impulse, always `true`
    Jump { jump: bool },

    /// Guard toggle edge
    Guard { guard: bool },

    /// Crouch toggle edge
    Crouch { crouching: bool },

    /// Pointer moved
    PointerMoved { player_mouse_position: PointerOffset },
}

impl OutboundMsg {
    pub fn jump() -> Self {
        Self::Jump { jump: true }
    }

    /// Short name for logs and counters
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Position { .. } => "position",
            Self::Jump { .. } => "jump",
            Self::Guard { .. } => "guard",
            Self::Crouch { .. } => "crouch",
            Self::PointerMoved { .. } => "pointer",
        }
    }

    /// Edge messages bypass the send throttle
    pub fn is_edge(&self) -> bool {
        matches!(self, Self::Jump { .. } | Self::Guard { .. } | Self::Crouch { .. })
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Position { x, .. } if !x.is_finite() => {
                Err(ProtocolError::Invalid("position x is not finite".into()))
            }
            Self::Jump { jump: false } => {
                Err(ProtocolError::Invalid("jump impulse must be true".into()))
            }
            Self::PointerMoved {
                player_mouse_position: p,
            } if !(p.x.is_finite() && p.y.is_finite()) => {
                Err(ProtocolError::Invalid("pointer offset is not finite".into()))
            }
            _ => Ok(()),
        }
    }
}

/// One player's authoritative state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Position X in tiles
    pub x: f64,
    /// Position Y in tiles (feet, world space)
    pub y: f64,
    /// Horizontal speed in pixels per second
    #[serde(default)]
    pub speed: f64,
    /// Body tilt used by the renderer
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub pivot_points: Pose,
    #[serde(default)]
    pub crouching: bool,
    /// Facing as reported by the animation system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Last pointer offset this player reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mouse_position: Option<PointerOffset>,
}

impl PlayerSnapshot {
    fn validate(&self, id: &Uuid) -> Result<(), ProtocolError> {
        let scalars = [self.x, self.y, self.speed, self.angle];
        if !scalars.iter().all(|v| v.is_finite()) {
            return Err(ProtocolError::Invalid(format!(
                "non-finite state for player {}",
                id
            )));
        }
        if let Some((name, _)) = self.pivot_points.iter().find(|(_, p)| !p.is_finite()) {
            return Err(ProtocolError::Invalid(format!(
                "non-finite pivot {} for player {}",
                name, id
            )));
        }
        Ok(())
    }
}

/// Full authoritative state, keyed by player id. Always a full replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldSnapshot {
    pub players: HashMap<Uuid, PlayerSnapshot>,
}

impl WorldSnapshot {
    pub fn get(&self, id: &Uuid) -> Option<&PlayerSnapshot> {
        self.players.get(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Encode an outbound message after checking its shape
pub fn encode_outbound(msg: &OutboundMsg) -> Result<String, ProtocolError> {
    msg.validate()?;
    Ok(serde_json::to_string(msg)?)
}

/// Decode an outbound message (used by servers and test doubles)
pub fn decode_outbound(text: &str) -> Result<OutboundMsg, ProtocolError> {
    let msg: OutboundMsg = serde_json::from_str(text)?;
    msg.validate()?;
    Ok(msg)
}

/// Decode an inbound snapshot and check every entry
pub fn decode_snapshot(text: &str) -> Result<WorldSnapshot, ProtocolError> {
    let snapshot: WorldSnapshot = serde_json::from_str(text)?;
    for (id, player) in &snapshot.players {
        player.validate(id)?;
    }
    Ok(snapshot)
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid message: {0}")]
    Invalid(String),
}
