//! World-frame positions.

use serde::{Deserialize, Serialize};

/// Robot position in world meters.
///
/// Orientation is carried by the bus messages but never used for rendering,
/// so only the position is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X in meters
    pub x: f64,
    /// Y in meters
    pub y: f64,
}

impl Pose2D {
    /// Create a new pose.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// World position of grid cell (0, 0).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapOrigin {
    /// X in meters
    pub x: f64,
    /// Y in meters
    pub y: f64,
    /// Z in meters (carried through, unused by rendering)
    #[serde(default)]
    pub z: f64,
}

impl MapOrigin {
    /// Create a new origin.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Round to the nearest integer, halves toward positive infinity.
///
/// Differs from `f64::round` on negative halves: -2.5 maps to -2, not -3.
#[inline]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
