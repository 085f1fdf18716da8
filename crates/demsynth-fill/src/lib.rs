//! # demsynth-fill
//!
//! Merges the per-radius rasters of one DEM product into a single hole-free
//! raster.
//!
//! The algorithm runs in four fixed steps:
//! 1. **Merge**: the first raster is the accumulator; every later raster only
//!    fills cells that are still nodata (successive overwrite, not an average).
//! 2. **Nearest fill**: each remaining nodata cell takes the value of its
//!    nearest valid cell under an exact Euclidean distance transform.
//! 3. **Median**: a 5x5 median filter suppresses the seams left by steps 1-2.
//! 4. **Write**: the result is written on the first raster's grid with its
//!    nodata sentinel, even though no nodata cell remains.
//!
//! ## Example
//!
//! ```no_run
//! use demsynth_fill::gap_fill;
//!
//! let merged = gap_fill(
//!     &["odm_dem/dtm_r0.56.idw.tif", "odm_dem/dtm_r1.4142135623730951.idw.tif"],
//!     "odm_dem/dtm.tif",
//! )?;
//! println!("wrote {}", merged.display());
//! # Ok::<(), demsynth_fill::GapFillError>(())
//! ```

mod engine;
mod error;
mod median;
mod merge;
mod nearest;

pub use engine::{gap_fill, gap_fill_with, GapFillOptions, GapFillReport, MergeOrder};
pub use error::GapFillError;
pub use median::{median_filter, EdgeMode, DEFAULT_MEDIAN_SIZE};
pub use merge::merge_layer;
pub use nearest::{fill_nearest, nearest_valid};

/// Result type for gap-fill operations.
pub type Result<T> = std::result::Result<T, GapFillError>;
