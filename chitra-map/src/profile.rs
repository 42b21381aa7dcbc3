//! Render profiles.
//!
//! A [`RenderProfile`] fixes every numeric and geometric choice of one
//! rendering pipeline: the grayscale code written for each [`CellClass`],
//! the orientation applied to the display image, and whether the display
//! image is recolored.
//!
//! Two profiles ship, and consumers depend on their exact palettes:
//!
//! | Class    | [`RenderProfile::LIVE`] | [`RenderProfile::MISSION`] |
//! |----------|------|---------|
//! | Unknown  | 128  | 205     |
//! | Free     | 255  | 0       |
//! | Occupied | 0    | 254     |
//! | Robot    | 0    | 255     |
//! | Path     | 0    | 200     |
//!
//! The live map shows the robot as an obstacle-colored block on a plain
//! grayscale image in the grid's own orientation. The mission map uses
//! distinct codes for robot and path so the display stage can paint them,
//! and is rotated 90° and mirrored for the browser view.

use serde::Serialize;

use crate::grid::CellClass;

/// Clockwise rotation applied to the display image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub enum Rotation {
    /// No rotation
    #[default]
    None,
    /// 90° clockwise
    Cw90,
    /// 180°
    Cw180,
    /// 270° clockwise
    Cw270,
}

impl Rotation {
    /// Rotation from a multiple of 90 degrees.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }

    /// Rotation in degrees.
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Whether width and height swap.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

/// Parameters of one rendering pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RenderProfile {
    /// Profile name, used for file naming and logs
    pub name: &'static str,
    /// Grayscale code for unknown cells
    pub unknown_value: u8,
    /// Grayscale code for free cells
    pub free_value: u8,
    /// Grayscale code for occupied cells
    pub occupied_value: u8,
    /// Grayscale code for the robot footprint
    pub robot_value: u8,
    /// Grayscale code for the path trace
    pub path_value: u8,
    /// Rotation applied by the display stage
    pub rotation: Rotation,
    /// Horizontal mirror applied after rotation
    pub mirror: bool,
    /// Recolor robot/path/occupancy codes into RGB in the display stage
    pub colorize: bool,
}

impl RenderProfile {
    /// Live map: grayscale, grid orientation, robot drawn as an obstacle.
    pub const LIVE: RenderProfile = RenderProfile {
        name: "live",
        unknown_value: 128,
        free_value: 255,
        occupied_value: 0,
        robot_value: 0,
        path_value: 0,
        rotation: Rotation::None,
        mirror: false,
        colorize: false,
    };

    /// Mission map: distinct robot/path codes, recolored, rotated and mirrored.
    pub const MISSION: RenderProfile = RenderProfile {
        name: "mission",
        unknown_value: 205,
        free_value: 0,
        occupied_value: 254,
        robot_value: 255,
        path_value: 200,
        rotation: Rotation::Cw90,
        mirror: true,
        colorize: true,
    };

    /// Grayscale code for a cell class.
    #[inline]
    pub fn value_for(&self, class: CellClass) -> u8 {
        match class {
            CellClass::Unknown => self.unknown_value,
            CellClass::Free => self.free_value,
            CellClass::Occupied => self.occupied_value,
            CellClass::Path => self.path_value,
            CellClass::Robot => self.robot_value,
        }
    }

    /// Lookup table from [`CellClass`] discriminant to grayscale code.
    pub fn value_table(&self) -> [u8; 5] {
        [
            self.unknown_value,
            self.free_value,
            self.occupied_value,
            self.path_value,
            self.robot_value,
        ]
    }
}
