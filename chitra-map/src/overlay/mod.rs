//! Overlay compositor.
//!
//! Stamps the travelled path and the robot footprint onto a classified copy
//! of the grid:
//!
//! 1. Classify the grid cells into a fresh buffer (the grid is never mutated)
//! 2. Rasterize each consecutive pair of path points with [`BresenhamLine`]
//!    and stamp [`CellClass::Path`]
//! 3. Stamp the square robot footprint with [`CellClass::Robot`]
//!
//! The robot goes last, so it wins wherever it overlaps the path.
//!
//! Cells that fall outside the grid are dropped and counted in
//! [`OverlayStats`]; clipping is not an error.

mod line;
mod marker;

pub use line::BresenhamLine;
pub use marker::{DEFAULT_MARKER_HALF_WIDTH, MAX_MARKER_HALF_WIDTH, footprint};

use serde::{Deserialize, Serialize};

use crate::core::{GridCoord, Pose2D};
use crate::grid::{AxisConvention, CellClass, InputPalette, OccupancyGrid};

/// Overlay geometry settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// World-to-row convention
    pub convention: AxisConvention,
    /// Robot marker half-width in cells
    pub marker_half_width: i32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            convention: AxisConvention::GridUp,
            marker_half_width: DEFAULT_MARKER_HALF_WIDTH,
        }
    }
}

/// What to draw on top of the grid.
#[derive(Clone, Copy, Debug, Default)]
pub struct Overlay<'a> {
    /// Robot position, if known
    pub robot: Option<Pose2D>,
    /// Travelled path, in traversal order
    pub path: &'a [Pose2D],
}

impl<'a> Overlay<'a> {
    /// Nothing drawn.
    pub fn none() -> Self {
        Self::default()
    }

    /// Robot marker only.
    pub fn robot(pose: Pose2D) -> Self {
        Self {
            robot: Some(pose),
            path: &[],
        }
    }

    /// Path trace and optional robot marker.
    pub fn with_path(robot: Option<Pose2D>, path: &'a [Pose2D]) -> Self {
        Self { robot, path }
    }
}

/// Cell write counters for one composition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OverlayStats {
    /// Marker cells written
    pub marker_cells: usize,
    /// Marker cells dropped outside the grid
    pub marker_clipped: usize,
    /// Path cells written (a cell shared by two segments counts twice)
    pub path_cells: usize,
    /// Path cells dropped outside the grid
    pub path_clipped: usize,
    /// Poses skipped because they were not finite or out of range
    pub invalid_poses: usize,
}

impl OverlayStats {
    /// Total dropped writes.
    pub fn clipped(&self) -> usize {
        self.marker_clipped + self.path_clipped
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: &OverlayStats) {
        self.marker_cells += other.marker_cells;
        self.marker_clipped += other.marker_clipped;
        self.path_cells += other.path_cells;
        self.path_clipped += other.path_clipped;
        self.invalid_poses += other.invalid_poses;
    }
}

/// Composited working copy, ready for the raster encoder.
#[derive(Clone, Debug)]
pub struct Composited {
    /// Row-major cell classes, same dimensions as the source grid
    pub cells: Vec<CellClass>,
    /// Write counters
    pub stats: OverlayStats,
}

/// Composite path and robot onto a copy of the grid.
pub fn compose(
    grid: &OccupancyGrid,
    palette: InputPalette,
    overlay: Overlay<'_>,
    config: &OverlayConfig,
) -> Composited {
    let mut cells = grid.classify(palette);
    let mut stats = OverlayStats::default();

    trace_path(grid, &mut cells, overlay.path, config, &mut stats);

    if let Some(pose) = overlay.robot {
        stamp_robot(grid, &mut cells, pose, config, &mut stats);
    }

    if stats.clipped() > 0 {
        log::debug!(
            "Overlay clipped {} marker and {} path cells outside {}x{} grid",
            stats.marker_clipped,
            stats.path_clipped,
            grid.width(),
            grid.height()
        );
    }

    Composited { cells, stats }
}

/// Stamp the robot footprint centered on `pose`.
pub fn stamp_robot(
    grid: &OccupancyGrid,
    cells: &mut [CellClass],
    pose: Pose2D,
    config: &OverlayConfig,
    stats: &mut OverlayStats,
) {
    let Some(center) = grid.world_to_cell(pose, config.convention) else {
        stats.invalid_poses += 1;
        return;
    };

    for coord in footprint(center, config.marker_half_width) {
        if stamp(grid, cells, coord, CellClass::Robot) {
            stats.marker_cells += 1;
        } else {
            stats.marker_clipped += 1;
        }
    }
}

/// Rasterize every consecutive pair of path points.
pub fn trace_path(
    grid: &OccupancyGrid,
    cells: &mut [CellClass],
    path: &[Pose2D],
    config: &OverlayConfig,
    stats: &mut OverlayStats,
) {
    for segment in path.windows(2) {
        let start = grid.world_to_cell(segment[0], config.convention);
        let end = grid.world_to_cell(segment[1], config.convention);
        let (Some(start), Some(end)) = (start, end) else {
            stats.invalid_poses += 1;
            continue;
        };

        for coord in BresenhamLine::new(start, end) {
            if stamp(grid, cells, coord, CellClass::Path) {
                stats.path_cells += 1;
            } else {
                stats.path_clipped += 1;
            }
        }
    }
}

#[inline]
fn stamp(grid: &OccupancyGrid, cells: &mut [CellClass], coord: GridCoord, class: CellClass) -> bool {
    match grid.coord_to_index(coord) {
        Some(index) => {
            cells[index] = class;
            true
        }
        None => false,
    }
}
