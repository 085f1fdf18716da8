//! # demsynth-raster
//!
//! Single-band GeoTIFF raster I/O used by the DEM gap-fill engine.
//!
//! The crate covers exactly what gap-filling needs from a raster library:
//! - open a raster and read its first band, nodata sentinel and georeferencing
//! - create a new raster from an existing one as a template
//! - write the band and close the file
//!
//! Georeferencing tags (pixel scale, tie points, model transformation and the
//! GeoKey directory) are carried through verbatim, so a raster created from a
//! template lands on exactly the same grid as its source.
//!
//! ## Example
//!
//! ```no_run
//! use demsynth_raster::Raster;
//!
//! let dtm = Raster::from_file("odm_dem/dtm_r0.56.idw.tif")?;
//! let (width, height) = dtm.dimensions();
//! println!("{}x{} nodata={:?}", width, height, dtm.nodata());
//!
//! let smoothed = dtm.create_from(dtm.data().to_vec())?;
//! smoothed.write("odm_dem/dtm.tif")?;
//! # Ok::<(), demsynth_raster::RasterError>(())
//! ```

mod error;
mod geotiff;
mod raster;

pub use error::RasterError;
pub use geotiff::GeoTemplate;
pub use raster::{is_nodata, Raster, DEFAULT_NODATA};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
