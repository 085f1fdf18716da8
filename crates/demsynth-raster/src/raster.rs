//! In-memory single-band raster.

use crate::geotiff::{self, GeoTemplate};
use crate::{RasterError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Nodata sentinel assumed when a raster carries no GDAL_NODATA tag.
///
/// Matches the default used by PDAL's `writers.gdal`.
pub const DEFAULT_NODATA: f32 = -9999.0;

/// Whether `value` is the nodata sentinel `nodata`.
///
/// A NaN sentinel matches NaN cells; every other sentinel is compared exactly.
pub fn is_nodata(value: f32, nodata: f32) -> bool {
    if nodata.is_nan() {
        value.is_nan()
    } else {
        value == nodata
    }
}

/// A single-band float raster with its nodata sentinel and georeferencing.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Pixel values in row-major order (north to south, west to east).
    data: Vec<f32>,
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
    /// Nodata sentinel, if the source declared one.
    nodata: Option<f32>,
    /// Georeferencing copied to rasters created from this one.
    template: GeoTemplate,
    /// File this raster was read from or last written to.
    path: Option<PathBuf>,
}

impl Raster {
    /// Create an un-georeferenced raster from a row-major pixel buffer.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(RasterError::InvalidDimensions {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            nodata: None,
            template: GeoTemplate::default(),
            path: None,
        })
    }

    /// Create a raster with every cell set to `value`.
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            data: vec![value; width as usize * height as usize],
            width,
            height,
            nodata: None,
            template: GeoTemplate::default(),
            path: None,
        }
    }

    /// Open a GeoTIFF and read its first band.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RasterError::io(path, e))?;
        let decoded = geotiff::decode(BufReader::new(file), path)?;

        Ok(Self {
            data: decoded.data,
            width: decoded.width,
            height: decoded.height,
            nodata: decoded.nodata,
            template: decoded.template,
            path: Some(path.to_path_buf()),
        })
    }

    /// Set the nodata sentinel.
    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Set the georeferencing template.
    pub fn with_template(mut self, template: GeoTemplate) -> Self {
        self.template = template;
        self
    }

    /// Create a new raster on this raster's grid holding `data`.
    ///
    /// Dimensions, georeferencing and the nodata sentinel are inherited; the
    /// new raster is not associated with any file until it is written.
    pub fn create_from(&self, data: Vec<f32>) -> Result<Self> {
        let raster = Raster::new(self.width, self.height, data)?;
        Ok(Self {
            nodata: self.nodata,
            template: self.template.clone(),
            ..raster
        })
    }

    /// Write the raster as a single-band float32 GeoTIFF.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| RasterError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        geotiff::encode(
            &mut writer,
            path,
            (self.width, self.height),
            &self.data,
            self.nodata,
            &self.template,
        )?;
        writer.flush().map_err(|e| RasterError::io(path, e))?;
        Ok(())
    }

    /// Write the raster and remember the destination as its path.
    pub fn write_to<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.write(path.as_ref())?;
        self.path = Some(path.as_ref().to_path_buf());
        Ok(())
    }

    /// Pixel values in row-major order.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable pixel values in row-major order.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume the raster, returning its pixel buffer.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster has no cells.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Declared nodata sentinel.
    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    /// Declared nodata sentinel, or [`DEFAULT_NODATA`].
    pub fn nodata_or_default(&self) -> f32 {
        self.nodata.unwrap_or(DEFAULT_NODATA)
    }

    /// Georeferencing template.
    pub fn template(&self) -> &GeoTemplate {
        &self.template
    }

    /// File this raster was read from or written to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Value at `(row, col)`, or `None` outside the raster.
    pub fn get(&self, row: u32, col: u32) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(row as usize * self.width as usize + col as usize).copied()
    }

    /// Number of cells equal to the effective nodata sentinel.
    pub fn nodata_count(&self) -> usize {
        let nodata = self.nodata_or_default();
        self.data.iter().filter(|&&v| is_nodata(v, nodata)).count()
    }

    /// Fail unless `other` has exactly this raster's dimensions.
    pub fn ensure_same_shape(&self, other: &Raster) -> Result<()> {
        if other.dimensions() == self.dimensions() {
            return Ok(());
        }
        let (actual_width, actual_height) = other.dimensions();
        Err(RasterError::ShapeMismatch {
            path: other.path.clone().unwrap_or_default(),
            width: self.width,
            height: self.height,
            actual_width,
            actual_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_nodata() {
        assert!(is_nodata(-9999.0, -9999.0));
        assert!(!is_nodata(-9998.5, -9999.0));
        assert!(is_nodata(f32::NAN, f32::NAN));
        assert!(!is_nodata(0.0, f32::NAN));
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let result = Raster::new(3, 2, vec![0.0; 5]);
        assert!(matches!(
            result,
            Err(RasterError::InvalidDimensions { width: 3, height: 2, len: 5 })
        ));
    }

    #[test]
    fn test_create_from_inherits_grid() {
        let template = GeoTemplate::from_origin(10.0, 20.0, 0.5);
        let source = Raster::filled(4, 3, 1.0)
            .with_nodata(-1.0)
            .with_template(template.clone());

        let derived = source.create_from(vec![2.0; 12]).unwrap();
        assert_eq!(derived.dimensions(), (4, 3));
        assert_eq!(derived.nodata(), Some(-1.0));
        assert_eq!(derived.template(), &template);
        assert!(derived.path().is_none());
        assert!(source.create_from(vec![2.0; 11]).is_err());
    }

    #[test]
    fn test_get_and_nodata_count() {
        let raster = Raster::new(3, 2, vec![1.0, -9999.0, 3.0, 4.0, 5.0, -9999.0]).unwrap();
        assert_eq!(raster.get(0, 2), Some(3.0));
        assert_eq!(raster.get(1, 0), Some(4.0));
        assert_eq!(raster.get(2, 0), None);
        assert_eq!(raster.get(0, 3), None);
        // No declared sentinel: the PDAL default applies
        assert_eq!(raster.nodata_count(), 2);
    }

    #[test]
    fn test_ensure_same_shape() {
        let a = Raster::filled(4, 4, 0.0);
        let b = Raster::filled(4, 4, 1.0);
        let c = Raster::filled(5, 4, 1.0);
        assert!(a.ensure_same_shape(&b).is_ok());
        assert!(matches!(
            a.ensure_same_shape(&c),
            Err(RasterError::ShapeMismatch { actual_width: 5, .. })
        ));
    }
}
