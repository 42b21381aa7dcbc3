//! Binary grayscale raster (PGM `P5`) encoding and header parsing.
//!
//! ## Layout
//!
//! ```text
//! "P5\n<width> <height>\n255\n" + <width*height bytes, row-major>
//! ```
//!
//! Rows are written in the order they are stored (row 0 first). Orientation
//! for display is the converter's concern, not the encoder's.
//!
//! The parser accepts exactly this layout: single `\n` separators, a single
//! space between the dimensions, no comments, maxval 255. Anything else is
//! [`Error::HeaderParse`].

use crate::error::{Error, Result};
use crate::grid::CellClass;
use crate::profile::RenderProfile;

/// PGM magic for binary grayscale.
pub const PGM_MAGIC: &str = "P5";

/// Only supported maxval.
pub const PGM_MAX_VALUE: u32 = 255;

/// Encoded raster: header plus one byte per cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    width: usize,
    height: usize,
    header_len: usize,
    bytes: Vec<u8>,
}

impl RasterBuffer {
    /// Encode classified cells with a profile's palette.
    ///
    /// Fails with [`Error::MalformedGrid`] if `cells.len() != width * height`.
    pub fn encode(
        cells: &[CellClass],
        width: usize,
        height: usize,
        profile: &RenderProfile,
    ) -> Result<Self> {
        let expected = width.checked_mul(height).unwrap_or(usize::MAX);
        if width == 0 || height == 0 || cells.len() != expected {
            return Err(Error::MalformedGrid {
                expected,
                actual: cells.len(),
            });
        }

        let header = header_for(width, height);
        let table = profile.value_table();

        let mut bytes = Vec::with_capacity(header.len() + cells.len());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend(cells.iter().map(|&class| table[class as usize]));

        Ok(Self {
            width,
            height,
            header_len: header.len(),
            bytes,
        })
    }

    /// Wrap existing PGM bytes after validating header and payload size.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let header = parse_header(&bytes)?;
        let payload = bytes.len() - header.data_offset;
        if payload != header.pixel_count() {
            return Err(Error::DimensionMismatch {
                expected: format!("{} bytes", header.pixel_count()),
                found: format!("{} bytes", payload),
            });
        }
        Ok(Self {
            width: header.width,
            height: header.height,
            header_len: header.data_offset,
            bytes,
        })
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Full file contents (header + pixels).
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Pixel payload without the header.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.bytes[self.header_len..]
    }

    /// Consume into the full file contents.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Parsed PGM header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PgmHeader {
    /// Declared width
    pub width: usize,
    /// Declared height
    pub height: usize,
    /// Byte offset of the first pixel
    pub data_offset: usize,
}

impl PgmHeader {
    /// width * height
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Header text for the given dimensions.
pub fn header_for(width: usize, height: usize) -> String {
    format!("{}\n{} {}\n{}\n", PGM_MAGIC, width, height, PGM_MAX_VALUE)
}

/// Parse the fixed `P5\n<w> <h>\n255\n` header.
pub fn parse_header(bytes: &[u8]) -> Result<PgmHeader> {
    let mut offset = 0;

    let magic = next_line(bytes, &mut offset, "magic")?;
    if magic != PGM_MAGIC.as_bytes() {
        return Err(Error::HeaderParse(format!(
            "expected magic {}, found {:?}",
            PGM_MAGIC,
            String::from_utf8_lossy(magic)
        )));
    }

    let dims = next_line(bytes, &mut offset, "dimensions")?;
    let dims = std::str::from_utf8(dims)
        .map_err(|_| Error::HeaderParse("dimensions are not ASCII".to_string()))?;
    let (w, h) = dims
        .split_once(' ')
        .ok_or_else(|| Error::HeaderParse(format!("malformed dimensions {:?}", dims)))?;
    let width = parse_dimension(w)?;
    let height = parse_dimension(h)?;
    width
        .checked_mul(height)
        .ok_or_else(|| Error::HeaderParse(format!("{}x{} overflows", width, height)))?;

    let max_value = next_line(bytes, &mut offset, "maxval")?;
    if max_value != PGM_MAX_VALUE.to_string().as_bytes() {
        return Err(Error::HeaderParse(format!(
            "unsupported maxval {:?}",
            String::from_utf8_lossy(max_value)
        )));
    }

    Ok(PgmHeader {
        width,
        height,
        data_offset: offset,
    })
}

/// Parse the header and return it with the pixel payload, validating the
/// payload holds exactly `width * height` bytes.
pub fn decode(bytes: &[u8]) -> Result<(PgmHeader, &[u8])> {
    let header = parse_header(bytes)?;
    let pixels = &bytes[header.data_offset..];
    if pixels.len() != header.pixel_count() {
        return Err(Error::DimensionMismatch {
            expected: format!("{} bytes", header.pixel_count()),
            found: format!("{} bytes", pixels.len()),
        });
    }
    Ok((header, pixels))
}

fn next_line<'a>(bytes: &'a [u8], offset: &mut usize, what: &str) -> Result<&'a [u8]> {
    let rest = &bytes[*offset..];
    let end = rest
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| Error::HeaderParse(format!("missing {} line", what)))?;
    *offset += end + 1;
    Ok(&rest[..end])
}

fn parse_dimension(text: &str) -> Result<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::HeaderParse(format!("invalid dimension {:?}", text)));
    }
    match text.parse::<usize>() {
        Ok(0) => Err(Error::HeaderParse("zero dimension".to_string())),
        Ok(v) => Ok(v),
        Err(e) => Err(Error::HeaderParse(format!("invalid dimension {:?}: {}", text, e))),
    }
}
