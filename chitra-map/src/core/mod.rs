//! Core coordinate types shared by every rendering stage.
//!
//! - [`GridCoord`]: integer cell indices (may be negative or past the edge;
//!   clipping is the caller's job)
//! - [`Pose2D`]: world position in meters
//! - [`MapOrigin`]: world position of cell (0, 0)

mod point;
mod pose;

pub use point::GridCoord;
pub use pose::{MapOrigin, Pose2D, round_half_up};
