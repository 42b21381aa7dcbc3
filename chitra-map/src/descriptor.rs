//! Geo-referencing descriptor written next to each raster.
//!
//! ROS `map_server` layout, one key per line:
//!
//! ```text
//! image: mission_map.png
//! resolution: 0.05
//! origin: [-2.5, -2.5, 0.0]
//! occupied_thresh: 0.65
//! free_thresh: 0.196
//! negate: 0
//! ```

use std::fmt;

use serde::Serialize;

use crate::grid::OccupancyGrid;

/// Occupancy probability above which a pixel is an obstacle.
pub const DEFAULT_OCCUPIED_THRESH: f64 = 0.65;

/// Occupancy probability below which a pixel is free.
pub const DEFAULT_FREE_THRESH: f64 = 0.196;

/// Map descriptor paired with a rendered image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeoDescriptor {
    /// Image file the descriptor refers to
    pub image: String,
    /// Meters per pixel
    pub resolution: f64,
    /// World pose of the lower-left pixel: [x, y, theta]
    pub origin: [f64; 3],
    /// Obstacle threshold
    pub occupied_thresh: f64,
    /// Free-space threshold
    pub free_thresh: f64,
    /// 1 if white means occupied
    pub negate: u8,
}

impl GeoDescriptor {
    /// Descriptor with the origin re-derived so the map is centered on the
    /// world origin: `(-(w*res)/2, -(h*res)/2, 0)`.
    pub fn centered(image: impl Into<String>, resolution: f64, width: usize, height: usize) -> Self {
        let origin_x = -(width as f64 * resolution) / 2.0;
        let origin_y = -(height as f64 * resolution) / 2.0;
        Self::with_origin(image, resolution, [origin_x, origin_y, 0.0])
    }

    /// Descriptor carrying the grid's own origin instead of a centered one.
    pub fn from_grid(image: impl Into<String>, grid: &OccupancyGrid) -> Self {
        let origin = grid.origin();
        Self::with_origin(image, grid.resolution(), [origin.x, origin.y, 0.0])
    }

    fn with_origin(image: impl Into<String>, resolution: f64, origin: [f64; 3]) -> Self {
        Self {
            image: image.into(),
            resolution,
            origin,
            occupied_thresh: DEFAULT_OCCUPIED_THRESH,
            free_thresh: DEFAULT_FREE_THRESH,
            negate: 0,
        }
    }

    /// Descriptor text.
    pub fn to_yaml(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GeoDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "image: {}", self.image)?;
        // `{:?}` keeps the decimal point on whole numbers (`1.0`, not `1`).
        writeln!(f, "resolution: {:?}", self.resolution)?;
        writeln!(
            f,
            "origin: [{:?}, {:?}, {:?}]",
            self.origin[0], self.origin[1], self.origin[2]
        )?;
        writeln!(f, "occupied_thresh: {:?}", self.occupied_thresh)?;
        writeln!(f, "free_thresh: {:?}", self.free_thresh)?;
        writeln!(f, "negate: {}", self.negate)
    }
}
