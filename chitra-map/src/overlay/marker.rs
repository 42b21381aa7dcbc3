//! Square robot marker footprint.

use crate::core::GridCoord;

/// Half-width of the robot marker in cells (side = 2 * 3 + 1).
pub const DEFAULT_MARKER_HALF_WIDTH: i32 = 3;

/// Largest accepted marker half-width. Larger values are clamped.
pub const MAX_MARKER_HALF_WIDTH: i32 = 256;

/// Cells of a square footprint centered on `center`, unclipped, row by row.
///
/// `half_width` is clamped to `0..=MAX_MARKER_HALF_WIDTH`.
pub fn footprint(center: GridCoord, half_width: i32) -> impl Iterator<Item = GridCoord> {
    let half_width = half_width.clamp(0, MAX_MARKER_HALF_WIDTH);
    (-half_width..=half_width)
        .flat_map(move |dy| (-half_width..=half_width).map(move |dx| center.offset(dx, dy)))
}
