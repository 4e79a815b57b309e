//! Skeletal pose produced by the server animation system

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const LEFT_ANKLE: &str = "l_ankle";
pub const RIGHT_ANKLE: &str = "r_ankle";

/// A pivot point in tile units, relative to the player's anchor.
/// Travels on the wire as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct PivotPoint {
    pub x: f64,
    pub y: f64,
}

impl PivotPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for PivotPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<PivotPoint> for [f64; 2] {
    fn from(p: PivotPoint) -> Self {
        [p.x, p.y]
    }
}

/// Named pivot points (neck, pelvis, l_ankle, r_hand, sword_tip, ...).
/// Opaque to the sync core apart from the ankles used for dust.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose(BTreeMap<String, PivotPoint>);

impl Pose {
    pub fn get(&self, name: &str) -> Option<PivotPoint> {
        self.0.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, point: PivotPoint) {
        self.0.insert(name.into(), point);
    }

    /// Both ankles, or `None` if either is missing
    pub fn ankles(&self) -> Option<(PivotPoint, PivotPoint)> {
        Some((self.get(LEFT_ANKLE)?, self.get(RIGHT_ANKLE)?))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, PivotPoint)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, PivotPoint)> for Pose {
    fn from_iter<I: IntoIterator<Item = (String, PivotPoint)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
