//! Error types for the raster crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error opening or creating a file.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TIFF decoding or encoding error.
    #[error("TIFF error on {path}: {source}")]
    Tiff {
        /// File being decoded or encoded.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: tiff::TiffError,
    },

    /// Unsupported sample layout in the TIFF file.
    #[error("Unsupported raster layout in {path}: {reason}")]
    UnsupportedLayout {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Pixel buffer does not match the declared dimensions.
    #[error("Pixel buffer of {len} values does not fit a {width}x{height} raster")]
    InvalidDimensions {
        /// Raster width in pixels.
        width: u32,
        /// Raster height in pixels.
        height: u32,
        /// Number of values supplied.
        len: usize,
    },

    /// Two rasters that must be stacked have different shapes.
    #[error("Raster {path} is {actual_width}x{actual_height}, expected {width}x{height}")]
    ShapeMismatch {
        /// Raster with the unexpected shape.
        path: PathBuf,
        /// Expected width.
        width: u32,
        /// Expected height.
        height: u32,
        /// Actual width.
        actual_width: u32,
        /// Actual height.
        actual_height: u32,
    },
}

impl RasterError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        RasterError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn tiff(path: &std::path::Path, source: tiff::TiffError) -> Self {
        RasterError::Tiff {
            path: path.to_path_buf(),
            source,
        }
    }
}
