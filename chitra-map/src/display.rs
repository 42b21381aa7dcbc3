//! Raster → display image conversion.
//!
//! Takes an encoded [`RasterBuffer`](crate::raster::RasterBuffer) and turns it
//! into a lossless PNG in the orientation the browser expects:
//!
//! 1. Parse the header and check it against the expected dimensions and the
//!    payload length.
//! 2. Recolor through a fixed lookup table when the profile asks for it.
//! 3. Rotate clockwise, then mirror horizontally.
//! 4. Encode PNG with fixed compression and filter settings, so identical
//!    input always gives identical bytes.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, GrayImage, ImageBuffer, ImageEncoder, Pixel, RgbImage, imageops};

use crate::error::{Error, Result};
use crate::profile::{RenderProfile, Rotation};
use crate::raster;

/// File extension of converted images.
pub const DISPLAY_EXTENSION: &str = "png";

/// RGB colors used when a profile recolors its raster.
pub mod palette {
    /// Free space
    pub const FREE: [u8; 3] = [255, 255, 255];
    /// Unexplored space
    pub const UNKNOWN: [u8; 3] = [128, 128, 128];
    /// Obstacles
    pub const OCCUPIED: [u8; 3] = [0, 0, 0];
    /// Travelled path
    pub const PATH: [u8; 3] = [0, 255, 0];
    /// Robot footprint
    pub const ROBOT: [u8; 3] = [255, 0, 0];
}

/// Encoded display image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayImage {
    /// Width after orientation
    pub width: u32,
    /// Height after orientation
    pub height: u32,
    /// PNG bytes
    pub bytes: Vec<u8>,
}

/// Convert raster file bytes into a display PNG.
///
/// `width`/`height` are the dimensions the caller encoded; a header that
/// declares anything else is rejected.
pub fn convert(
    raster_bytes: &[u8],
    width: usize,
    height: usize,
    profile: &RenderProfile,
) -> Result<DisplayImage> {
    let (header, pixels) = raster::decode(raster_bytes)?;
    if header.width != width || header.height != height {
        return Err(Error::DimensionMismatch {
            expected: format!("{}x{}", width, height),
            found: format!("{}x{}", header.width, header.height),
        });
    }

    let w = to_u32(width)?;
    let h = to_u32(height)?;

    if profile.colorize {
        let lut = color_table(profile);
        let mut rgb = Vec::with_capacity(pixels.len() * 3);
        for &value in pixels {
            rgb.extend_from_slice(&lut[value as usize]);
        }
        let img = RgbImage::from_raw(w, h, rgb).ok_or_else(|| buffer_mismatch(w, h))?;
        let img = orient(&img, profile.rotation, profile.mirror);
        encode_png(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
    } else {
        let img = GrayImage::from_raw(w, h, pixels.to_vec()).ok_or_else(|| buffer_mismatch(w, h))?;
        let img = orient(&img, profile.rotation, profile.mirror);
        encode_png(img.as_raw(), img.width(), img.height(), ExtendedColorType::L8)
    }
}

/// Lookup from grayscale code to RGB.
///
/// Codes the profile does not use map to the matching gray. The robot entry
/// is written last so it wins if a profile reuses its code.
pub fn color_table(profile: &RenderProfile) -> [[u8; 3]; 256] {
    let mut lut = [[0u8; 3]; 256];
    for (value, entry) in lut.iter_mut().enumerate() {
        let v = value as u8;
        *entry = [v, v, v];
    }
    lut[profile.free_value as usize] = palette::FREE;
    lut[profile.unknown_value as usize] = palette::UNKNOWN;
    lut[profile.occupied_value as usize] = palette::OCCUPIED;
    lut[profile.path_value as usize] = palette::PATH;
    lut[profile.robot_value as usize] = palette::ROBOT;
    lut
}

/// Rotate clockwise, then optionally mirror left-right.
pub fn orient<P>(
    img: &ImageBuffer<P, Vec<u8>>,
    rotation: Rotation,
    mirror: bool,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let rotated = match rotation {
        Rotation::None => img.clone(),
        Rotation::Cw90 => imageops::rotate90(img),
        Rotation::Cw180 => imageops::rotate180(img),
        Rotation::Cw270 => imageops::rotate270(img),
    };
    if mirror {
        imageops::flip_horizontal(&rotated)
    } else {
        rotated
    }
}

fn encode_png(
    raw: &[u8],
    width: u32,
    height: u32,
    color: ExtendedColorType,
) -> Result<DisplayImage> {
    let mut bytes = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, FilterType::Adaptive);
    encoder.write_image(raw, width, height, color)?;
    Ok(DisplayImage {
        width,
        height,
        bytes,
    })
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::DimensionMismatch {
        expected: format!("dimension <= {}", u32::MAX),
        found: value.to_string(),
    })
}

fn buffer_mismatch(width: u32, height: u32) -> Error {
    Error::DimensionMismatch {
        expected: format!("{}x{} pixels", width, height),
        found: "short pixel buffer".to_string(),
    }
}
