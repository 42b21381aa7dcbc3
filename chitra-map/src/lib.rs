//! # Chitra-Map: Occupancy Grid Rasterizer
//!
//! Turns robot-reported occupancy grids into display artifacts:
//! a binary PGM raster, an oriented PNG, and a ROS-style map descriptor.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chitra_map::{InputPalette, OccupancyGrid, Overlay, OverlayConfig, RenderProfile};
//! use chitra_map::core::{MapOrigin, Pose2D};
//!
//! let grid = OccupancyGrid::new(4, 4, 1.0, MapOrigin::default(), vec![0; 16])?;
//! let out = chitra_map::render(
//!     &grid,
//!     InputPalette::Ros,
//!     Overlay::robot(Pose2D::new(2.0, 2.0)),
//!     &OverlayConfig::default(),
//!     &RenderProfile::LIVE,
//!     "map_live",
//! )?;
//! std::fs::write("map_live.png", &out.image.bytes)?;
//! std::fs::write("map_live.yaml", out.descriptor.to_yaml())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Coordinate Frame
//!
//! World coordinates are meters. A pose maps to a cell by
//! `round((world - origin) / resolution)` on each axis, with halves rounded
//! toward +∞. The row index is either `cellY` ([`AxisConvention::GridUp`])
//! or `height - 1 - cellY` ([`AxisConvention::ImageDown`]).
//!
//! ## Data Flow
//!
//! ```text
//!   OccupancyGrid ──classify──▶ Vec<CellClass> (copy)
//!                                    │
//!                     path (Bresenham), then robot marker
//!                                    ▼
//!                               RasterBuffer  (P5 + w*h bytes)
//!                                    │
//!                  parse, recolor, rotate, mirror, PNG
//!                                    ▼
//!                               DisplayImage  +  GeoDescriptor
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Cell coordinates, world poses, map origin
//! - [`grid`]: Validated occupancy grid and cell classification
//! - [`overlay`]: Robot marker and path trace compositing
//! - [`profile`]: Live and mission render profiles
//! - [`raster`]: PGM encoding and header parsing
//! - [`display`]: PNG conversion
//! - [`descriptor`]: Map descriptor text

pub mod core;
pub mod descriptor;
pub mod display;
pub mod error;
pub mod grid;
pub mod overlay;
pub mod profile;
pub mod raster;
mod render;

pub use descriptor::GeoDescriptor;
pub use display::DisplayImage;
pub use error::{Error, Result};
pub use grid::{AxisConvention, CellClass, InputPalette, OccupancyGrid};
pub use overlay::{Overlay, OverlayConfig, OverlayStats};
pub use profile::{RenderProfile, Rotation};
pub use raster::RasterBuffer;
pub use render::{RenderOutput, rasterize, render};
