//! Occupancy grid model.
//!
//! An [`OccupancyGrid`] is built fresh from every map message and is
//! read-only afterwards. Rendering never touches its cell buffer: overlays
//! work on a classified copy produced by [`OccupancyGrid::classify`].
//!
//! ## Cell values
//!
//! Two input palettes are in circulation:
//!
//! | Palette        | Unknown | Free | Occupied |
//! |----------------|---------|------|----------|
//! | [`InputPalette::Ros`]        | -1  | 0 | 1..=100 |
//! | [`InputPalette::Normalized`] | 205 | 0 | 254 |
//!
//! ## Axis conventions
//!
//! ```text
//!   GridUp                    ImageDown
//!   row = cellY               row = height - 1 - cellY
//!
//!   row 0 ─ origin row        row 0 ─ top of image (+Y)
//!   ...                       ...
//!   row h-1 ─ +Y              row h-1 ─ origin row
//! ```

use serde::{Deserialize, Serialize};

use crate::core::{GridCoord, MapOrigin, Pose2D, round_half_up};
use crate::error::{Error, Result};

/// Semantic class of a cell in the working copy.
///
/// `Path` and `Robot` are the overlay sentinels; they never appear in a
/// grid received from the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellClass {
    /// Not observed
    #[default]
    Unknown = 0,
    /// Traversable
    Free = 1,
    /// Obstacle
    Occupied = 2,
    /// Travelled path trace
    Path = 3,
    /// Robot footprint
    Robot = 4,
}

impl CellClass {
    /// Single character representation for debugging
    pub fn as_char(self) -> char {
        match self {
            CellClass::Unknown => '?',
            CellClass::Free => '.',
            CellClass::Occupied => '#',
            CellClass::Path => '*',
            CellClass::Robot => 'R',
        }
    }
}

/// How raw integer cell values are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputPalette {
    /// -1 unknown, 0 free, anything positive occupied
    #[default]
    Ros,
    /// 205 unknown, 0 free, anything else non-negative occupied
    Normalized,
}

impl InputPalette {
    /// Classify one raw cell value.
    #[inline]
    pub fn classify(self, value: i16) -> CellClass {
        match self {
            InputPalette::Ros => match value {
                v if v < 0 => CellClass::Unknown,
                0 => CellClass::Free,
                _ => CellClass::Occupied,
            },
            InputPalette::Normalized => match value {
                0 => CellClass::Free,
                205 => CellClass::Unknown,
                v if v < 0 => CellClass::Unknown,
                _ => CellClass::Occupied,
            },
        }
    }
}

/// Largest cell coordinate magnitude a pose may map to. Poses beyond it
/// are invalid.
pub const MAX_CELL_COORD: i32 = 1 << 24;

/// Direction of the grid's Y axis relative to the raster rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisConvention {
    /// Row index equals cellY (rows stored bottom-up, as received)
    #[default]
    GridUp,
    /// Row index is flipped so +Y points to the top of the raster
    ImageDown,
}

/// Occupancy grid as received from the robot.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    resolution: f64,
    origin: MapOrigin,
    cells: Vec<i16>,
}

impl OccupancyGrid {
    /// Build a grid, validating the cell buffer against the dimensions.
    ///
    /// Fails with [`Error::InvalidGridData`] when a dimension is zero, the
    /// resolution is not a positive finite number, the buffer is empty, or
    /// `cells.len() != width * height`.
    pub fn new(
        width: usize,
        height: usize,
        resolution: f64,
        origin: MapOrigin,
        cells: Vec<i16>,
    ) -> Result<Self> {
        if cells.is_empty() {
            return Err(Error::InvalidGridData("cell array is empty".to_string()));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidGridData(format!(
                "dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(Error::InvalidGridData(format!(
                "resolution must be positive, got {}",
                resolution
            )));
        }
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| Error::InvalidGridData(format!("{}x{} overflows", width, height)))?;
        if cells.len() != expected {
            return Err(Error::InvalidGridData(format!(
                "{} cells for a {}x{} grid (expected {})",
                cells.len(),
                width,
                height,
                expected
            )));
        }

        Ok(Self {
            width,
            height,
            resolution,
            origin,
            cells,
        })
    }

    /// Width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Meters per cell edge.
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// World position of cell (0, 0).
    #[inline]
    pub fn origin(&self) -> MapOrigin {
        self.origin
    }

    /// Raw cell values, row-major.
    #[inline]
    pub fn cells(&self) -> &[i16] {
        &self.cells
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false for a constructed grid; kept for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check if grid coordinates are within bounds.
    #[inline]
    pub fn is_valid_coord(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.width
            && (coord.y as usize) < self.height
    }

    /// Row-major index of an in-bounds coordinate.
    #[inline]
    pub fn coord_to_index(&self, coord: GridCoord) -> Option<usize> {
        if self.is_valid_coord(coord) {
            Some(coord.y as usize * self.width + coord.x as usize)
        } else {
            None
        }
    }

    /// Convert a world position to cell coordinates.
    ///
    /// The result may lie outside the grid. Returns `None` for non-finite
    /// input and for cells more than [`MAX_CELL_COORD`] from the origin.
    pub fn world_to_cell(&self, pose: Pose2D, convention: AxisConvention) -> Option<GridCoord> {
        if !pose.is_finite() {
            return None;
        }

        let cx = round_half_up((pose.x - self.origin.x) / self.resolution);
        let cy = round_half_up((pose.y - self.origin.y) / self.resolution);
        let limit = MAX_CELL_COORD as f64;
        if !(cx.abs() <= limit && cy.abs() <= limit) {
            return None;
        }

        let cx = cx as i32;
        let cy = cy as i32;
        let row = match convention {
            AxisConvention::GridUp => cy,
            AxisConvention::ImageDown => (self.height as i32 - 1).saturating_sub(cy),
        };
        Some(GridCoord::new(cx, row))
    }

    /// Classified copy of the cells. The stored buffer is left untouched.
    pub fn classify(&self, palette: InputPalette) -> Vec<CellClass> {
        self.cells.iter().map(|&v| palette.classify(v)).collect()
    }

    /// Count cells by class: (free, unknown, occupied).
    pub fn count_cells(&self, palette: InputPalette) -> (usize, usize, usize) {
        let mut free = 0;
        let mut unknown = 0;
        let mut occupied = 0;
        for &v in &self.cells {
            match palette.classify(v) {
                CellClass::Free => free += 1,
                CellClass::Occupied => occupied += 1,
                _ => unknown += 1,
            }
        }
        (free, unknown, occupied)
    }
}
