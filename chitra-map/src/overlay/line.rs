//! Bresenham line rasterization for path traces.
//!
//! Integer-only, error-accumulator form covering all octants without axis
//! swapping. Every cell between the two endpoints (inclusive) is produced
//! exactly once and consecutive cells are 8-connected:
//!
//! ```text
//! From (0,0) to (7,3):
//!
//!     3 │             ● ●
//!     2 │         ● ●
//!     1 │     ● ●
//!     0 ● ●
//!       └─────────────────
//!        0 1 2 3 4 5 6 7
//! ```

use crate::core::GridCoord;

/// Cells of a segment, start to end.
#[derive(Clone, Debug)]
pub struct BresenhamLine {
    cursor: GridCoord,
    end: GridCoord,
    /// |dx|
    run: i32,
    /// -|dy|
    rise: i32,
    step_x: i32,
    step_y: i32,
    error: i32,
    finished: bool,
}

impl BresenhamLine {
    /// Segment from `start` to `end`, both inclusive.
    pub fn new(start: GridCoord, end: GridCoord) -> Self {
        let run = (end.x - start.x).abs();
        let rise = -(end.y - start.y).abs();
        Self {
            cursor: start,
            end,
            run,
            rise,
            step_x: (end.x - start.x).signum(),
            step_y: (end.y - start.y).signum(),
            error: run + rise,
            finished: false,
        }
    }

    /// Number of cells the segment produces.
    pub fn cell_count(start: GridCoord, end: GridCoord) -> usize {
        start.chebyshev(end) as usize + 1
    }
}

impl Iterator for BresenhamLine {
    type Item = GridCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let cell = self.cursor;
        if cell == self.end {
            self.finished = true;
            return Some(cell);
        }

        let doubled = 2 * self.error;
        if doubled >= self.rise {
            self.error += self.rise;
            self.cursor.x += self.step_x;
        }
        if doubled <= self.run {
            self.error += self.run;
            self.cursor.y += self.step_y;
        }
        Some(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn line(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<GridCoord> {
        BresenhamLine::new(GridCoord::new(x0, y0), GridCoord::new(x1, y1)).collect()
    }

    fn assert_connected(cells: &[GridCoord]) {
        for pair in cells.windows(2) {
            assert_eq!(pair[0].chebyshev(pair[1]), 1, "gap between {:?}", pair);
        }
    }

    #[test]
    fn test_horizontal() {
        let cells = line(0, 0, 5, 0);
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|c| c.y == 0));
        assert_eq!(cells[0], GridCoord::new(0, 0));
        assert_eq!(cells[5], GridCoord::new(5, 0));
    }

    #[test]
    fn test_vertical_reverse() {
        let cells = line(2, 4, 2, -1);
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|c| c.x == 2));
        assert_eq!(cells.first(), Some(&GridCoord::new(2, 4)));
        assert_eq!(cells.last(), Some(&GridCoord::new(2, -1)));
    }

    #[test]
    fn test_diagonal() {
        let cells = line(0, 0, 3, 3);
        assert_eq!(
            cells,
            vec![
                GridCoord::new(0, 0),
                GridCoord::new(1, 1),
                GridCoord::new(2, 2),
                GridCoord::new(3, 3)
            ]
        );
    }

    #[test]
    fn test_shallow_slope_cells() {
        assert_eq!(
            line(0, 0, 7, 3),
            vec![
                GridCoord::new(0, 0),
                GridCoord::new(1, 0),
                GridCoord::new(2, 1),
                GridCoord::new(3, 1),
                GridCoord::new(4, 2),
                GridCoord::new(5, 2),
                GridCoord::new(6, 3),
                GridCoord::new(7, 3)
            ]
        );
    }

    #[test]
    fn test_single_point() {
        assert_eq!(line(4, 4, 4, 4), vec![GridCoord::new(4, 4)]);
    }

    #[test]
    fn test_every_octant_is_gapless_and_unique() {
        let ends = [
            (7, 3),
            (3, 7),
            (-3, 7),
            (-7, 3),
            (-7, -3),
            (-3, -7),
            (3, -7),
            (7, -3),
        ];
        for (ex, ey) in ends {
            let cells = line(0, 0, ex, ey);
            assert_eq!(cells.len(), BresenhamLine::cell_count(GridCoord::new(0, 0), GridCoord::new(ex, ey)));
            assert_eq!(cells.first(), Some(&GridCoord::new(0, 0)));
            assert_eq!(cells.last(), Some(&GridCoord::new(ex, ey)));
            assert_connected(&cells);
            let unique: HashSet<_> = cells.iter().collect();
            assert_eq!(unique.len(), cells.len());
        }
    }
}
