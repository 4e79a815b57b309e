//! Tile space ↔ pixel space conversion
//!
//! World y grows upward from the bottom of the map; screen y grows downward
//! from the top. A character is anchored at its feet, so placing its sprite
//! needs the character height to find the top-left corner.

use crate::config::SyncSettings;

use super::pose::PivotPoint;

/// A point in tile units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePoint {
    pub x: f64,
    pub y: f64,
}

/// A point in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl TilePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Grid geometry for one loaded map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    tile_size: f64,
    map_height: f64,
    character_height: f64,
}

impl TileGrid {
    pub fn new(tile_size: f64, map_height: f64, character_height: f64) -> Self {
        Self {
            tile_size,
            map_height,
            character_height,
        }
    }

    pub fn from_settings(settings: &SyncSettings, map_height: f64) -> Self {
        Self::new(settings.tile_size, map_height, settings.character_height)
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn character_height(&self) -> f64 {
        self.character_height
    }

    pub fn tile_to_pixel(&self, p: TilePoint) -> PixelPoint {
        PixelPoint::new(p.x * self.tile_size, p.y * self.tile_size)
    }

    pub fn pixel_to_tile(&self, p: PixelPoint) -> TilePoint {
        TilePoint::new(p.x / self.tile_size, p.y / self.tile_size)
    }

    /// Screen y of the top edge of something `height` tiles tall whose
    /// bottom sits at `world_y`
    pub fn flip_y(&self, world_y: f64, height: f64) -> f64 {
        (self.map_height - world_y - height) * self.tile_size
    }

    /// Inverse of [`TileGrid::flip_y`]
    pub fn unflip_y(&self, screen_y: f64, height: f64) -> f64 {
        self.map_height - height - screen_y / self.tile_size
    }

    /// Top-left pixel of a character standing at `feet`
    pub fn character_anchor(&self, feet: TilePoint) -> PixelPoint {
        PixelPoint::new(
            feet.x * self.tile_size,
            self.flip_y(feet.y, self.character_height),
        )
    }

    /// Screen pixel of a pose point for a character anchored (feet) at `anchor`.
    /// The point is placed as the world point `anchor + point` with zero height.
    pub fn pose_point_to_screen(&self, anchor: TilePoint, point: PivotPoint) -> PixelPoint {
        PixelPoint::new(
            (anchor.x + point.x) * self.tile_size,
            self.flip_y(anchor.y + point.y, 0.0),
        )
    }

    /// Pixel width and height of a character sprite
    pub fn character_size(&self) -> (f64, f64) {
        (self.tile_size, self.tile_size * self.character_height)
    }
}
