//! Error types for gap-filling.

use demsynth_raster::RasterError;
use thiserror::Error;

/// Errors that can occur while merging and gap-filling rasters.
#[derive(Debug, Error)]
pub enum GapFillError {
    /// Gap-fill was called without any input raster.
    #[error("Gap-fill needs at least one input raster")]
    EmptyInput,

    /// Every cell of every input is nodata, so there is nothing to propagate.
    #[error("No valid pixel in any of the {inputs} input raster(s)")]
    NoValidData {
        /// Number of rasters that were merged.
        inputs: usize,
    },

    /// Median window size is not an odd number >= 1.
    #[error("Median window must be an odd size >= 1, got {0}")]
    InvalidWindow(usize),

    /// Reading or writing a raster failed.
    #[error(transparent)]
    Raster(#[from] RasterError),
}
