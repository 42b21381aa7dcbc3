//! Full in-memory render: overlay → raster → display image → descriptor.
//!
//! Callers that persist artifacts between stages (so a raster survives a
//! failed conversion) use [`rasterize`] and [`display::convert`] directly.

use crate::descriptor::GeoDescriptor;
use crate::display::{self, DISPLAY_EXTENSION, DisplayImage};
use crate::error::Result;
use crate::grid::{InputPalette, OccupancyGrid};
use crate::overlay::{self, Overlay, OverlayConfig, OverlayStats};
use crate::profile::RenderProfile;
use crate::raster::RasterBuffer;

/// Artifacts of one render.
#[derive(Clone, Debug)]
pub struct RenderOutput {
    /// Encoded PGM
    pub raster: RasterBuffer,
    /// Oriented PNG
    pub image: DisplayImage,
    /// Descriptor referring to the PNG
    pub descriptor: GeoDescriptor,
    /// Overlay write counters
    pub stats: OverlayStats,
}

/// Composite the overlay and encode the raster.
pub fn rasterize(
    grid: &OccupancyGrid,
    palette: InputPalette,
    overlay: Overlay<'_>,
    config: &OverlayConfig,
    profile: &RenderProfile,
) -> Result<(RasterBuffer, OverlayStats)> {
    let composited = overlay::compose(grid, palette, overlay, config);
    let raster = RasterBuffer::encode(&composited.cells, grid.width(), grid.height(), profile)?;
    Ok((raster, composited.stats))
}

/// Render every artifact for `base_name` (`<base_name>.png` is the image the
/// descriptor points at).
pub fn render(
    grid: &OccupancyGrid,
    palette: InputPalette,
    overlay: Overlay<'_>,
    config: &OverlayConfig,
    profile: &RenderProfile,
    base_name: &str,
) -> Result<RenderOutput> {
    let (raster, stats) = rasterize(grid, palette, overlay, config, profile)?;
    let image = display::convert(raster.as_bytes(), grid.width(), grid.height(), profile)?;
    let descriptor = GeoDescriptor::centered(
        format!("{}.{}", base_name, DISPLAY_EXTENSION),
        grid.resolution(),
        grid.width(),
        grid.height(),
    );

    Ok(RenderOutput {
        raster,
        image,
        descriptor,
        stats,
    })
}
