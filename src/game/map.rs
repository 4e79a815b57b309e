//! Map descriptor received at session bootstrap

use serde::{Deserialize, Serialize};

/// A single colored tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTile {
    pub x: i32,
    pub y: i32,
    /// CSS hex color, e.g. `#7a4a1e`
    pub color: String,
    /// Layer 1 is the collision layer on the server
    #[serde(default)]
    pub layer: i32,
}

/// World dimensions and tiles. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDescriptor {
    #[serde(default)]
    pub name: String,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    #[serde(default)]
    pub tiles: Vec<MapTile>,
}

impl MapDescriptor {
    /// Largest x the local player may occupy
    pub fn max_x(&self) -> f64 {
        f64::from(self.width.saturating_sub(1))
    }

    pub fn height_tiles(&self) -> f64 {
        f64::from(self.height)
    }

    /// Tiles on a given layer
    pub fn layer(&self, layer: i32) -> impl Iterator<Item = &MapTile> {
        self.tiles.iter().filter(move |t| t.layer == layer)
    }
}
