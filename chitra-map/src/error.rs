//! Error types for ChitraMap

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Rendering pipeline errors
///
/// Validation errors are terminal for the grid being rendered; nothing is
/// retried internally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Grid payload is empty or its cell array does not match its dimensions
    #[error("Invalid grid data: {0}")]
    InvalidGridData(String),

    /// Cell buffer handed to the raster encoder does not match the dimensions
    #[error("Malformed grid: expected {expected} cells, got {actual}")]
    MalformedGrid {
        /// width * height
        expected: usize,
        /// Length of the cell buffer
        actual: usize,
    },

    /// Raster header is not exactly `P5\n<w> <h>\n255\n`
    #[error("Raster header parse error: {0}")]
    HeaderParse(String),

    /// Raster dimensions or payload size disagree with what was expected
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensions or byte count
        expected: String,
        /// Dimensions or byte count actually present
        found: String,
    },

    /// PNG encoding failed
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
