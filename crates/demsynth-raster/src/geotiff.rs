//! GeoTIFF encoding and decoding on top of the `tiff` crate.

use crate::{RasterError, Result};
use std::io::{Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_DOUBLE_PARAMS: u16 = 34736;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_NODATA: u16 = 42113;

/// Resolve a numeric tag code to the decoder's own tag representation.
fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Georeferencing metadata copied verbatim between rasters.
///
/// A raster created from another one as a template receives exactly these
/// tags, so both sit on the same grid in the same coordinate system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoTemplate {
    /// ModelPixelScaleTag: `[scale_x, scale_y, scale_z]`.
    pub pixel_scale: Option<Vec<f64>>,
    /// ModelTiepointTag: one or more `[i, j, k, x, y, z]` tuples.
    pub tiepoints: Option<Vec<f64>>,
    /// ModelTransformationTag: 4x4 affine matrix, row-major.
    pub transformation: Option<Vec<f64>>,
    /// GeoKeyDirectoryTag.
    pub geo_keys: Option<Vec<u16>>,
    /// GeoDoubleParamsTag.
    pub geo_doubles: Option<Vec<f64>>,
    /// GeoAsciiParamsTag.
    pub geo_ascii: Option<String>,
}

impl GeoTemplate {
    /// Build a north-up template from an upper-left origin and a square cell size.
    ///
    /// Only the minimal GeoKey directory is written (projected model, pixel is
    /// area); the CRS itself is left undefined.
    pub fn from_origin(origin_x: f64, origin_y: f64, cell_size: f64) -> Self {
        Self {
            pixel_scale: Some(vec![cell_size, cell_size, 0.0]),
            tiepoints: Some(vec![0.0, 0.0, 0.0, origin_x, origin_y, 0.0]),
            transformation: None,
            geo_keys: Some(vec![
                1, 1, 0, 2, // version 1.1.0, 2 keys
                1024, 0, 1, 1, // GTModelTypeGeoKey = projected
                1025, 0, 1, 1, // GTRasterTypeGeoKey = pixel is area
            ]),
            geo_doubles: None,
            geo_ascii: None,
        }
    }

    /// Upper-left corner in model coordinates, if the template carries a tie point.
    pub fn origin(&self) -> Option<(f64, f64)> {
        let tie = self.tiepoints.as_ref()?;
        let scale = self.pixel_scale.as_ref()?;
        if tie.len() < 6 || scale.len() < 2 {
            return None;
        }
        Some((tie[3] - tie[0] * scale[0], tie[4] + tie[1] * scale[1]))
    }

    /// Whether any georeferencing tag is present.
    pub fn is_georeferenced(&self) -> bool {
        self.pixel_scale.is_some() || self.tiepoints.is_some() || self.transformation.is_some()
    }

    fn read<R: Read + Seek>(decoder: &mut Decoder<R>) -> Self {
        Self {
            pixel_scale: decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok(),
            tiepoints: decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok(),
            transformation: decoder.get_tag_f64_vec(tag(MODEL_TRANSFORMATION)).ok(),
            geo_keys: decoder.get_tag_u16_vec(tag(GEO_KEY_DIRECTORY)).ok(),
            geo_doubles: decoder.get_tag_f64_vec(tag(GEO_DOUBLE_PARAMS)).ok(),
            geo_ascii: decoder.get_tag_ascii_string(tag(GEO_ASCII_PARAMS)).ok(),
        }
    }
}

/// Contents of a decoded GeoTIFF (first band only).
#[derive(Debug)]
pub(crate) struct Decoded {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
    pub nodata: Option<f32>,
    pub template: GeoTemplate,
}

/// Decode the first band of a GeoTIFF.
pub(crate) fn decode<R: Read + Seek>(reader: R, path: &Path) -> Result<Decoded> {
    let err = |e| RasterError::tiff(path, e);

    let mut decoder = Decoder::new(reader).map_err(err)?;

    // Orthophoto-sized DEMs easily exceed the default decoding limits
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 2 * 1024 * 1024 * 1024; // 2 GB
    limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.ifd_value_size = 1024 * 1024 * 1024;
    decoder = decoder.with_limits(limits);

    let (width, height) = decoder.dimensions().map_err(err)?;
    let template = GeoTemplate::read(&mut decoder);
    let nodata = read_nodata(&mut decoder);
    let samples = decode_samples(decoder.read_image().map_err(err)?);
    let data = first_band(samples, width, height, path)?;

    Ok(Decoded {
        width,
        height,
        data,
        nodata,
        template,
    })
}

/// Encode a single float band with the given nodata sentinel and georeferencing.
pub(crate) fn encode<W: Write + Seek>(
    writer: W,
    path: &Path,
    (width, height): (u32, u32),
    data: &[f32],
    nodata: Option<f32>,
    template: &GeoTemplate,
) -> Result<()> {
    let err = |e| RasterError::tiff(path, e);

    let mut encoder = TiffEncoder::new(writer).map_err(err)?;
    let mut image = encoder
        .new_image::<Gray32Float>(width, height)
        .map_err(err)?;

    {
        let dir = image.encoder();
        if let Some(scale) = &template.pixel_scale {
            dir.write_tag(tag(MODEL_PIXEL_SCALE), scale.as_slice()).map_err(err)?;
        }
        if let Some(tie) = &template.tiepoints {
            dir.write_tag(tag(MODEL_TIEPOINT), tie.as_slice()).map_err(err)?;
        }
        if let Some(matrix) = &template.transformation {
            dir.write_tag(tag(MODEL_TRANSFORMATION), matrix.as_slice()).map_err(err)?;
        }
        if let Some(keys) = &template.geo_keys {
            dir.write_tag(tag(GEO_KEY_DIRECTORY), keys.as_slice()).map_err(err)?;
        }
        if let Some(doubles) = &template.geo_doubles {
            dir.write_tag(tag(GEO_DOUBLE_PARAMS), doubles.as_slice()).map_err(err)?;
        }
        if let Some(ascii) = &template.geo_ascii {
            dir.write_tag(tag(GEO_ASCII_PARAMS), ascii.as_str()).map_err(err)?;
        }
        if let Some(nodata) = nodata {
            let text = format_nodata(nodata);
            dir.write_tag(tag(GDAL_NODATA), text.as_str()).map_err(err)?;
        }
    }

    image.write_data(data).map_err(err)?;
    Ok(())
}

/// Read the GDAL_NODATA tag (ASCII, possibly NUL/space padded).
fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(tag(GDAL_NODATA))
        .ok()
        .and_then(|text| parse_nodata(&text))
}

fn parse_nodata(text: &str) -> Option<f32> {
    let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    trimmed.parse::<f32>().ok()
}

fn format_nodata(nodata: f32) -> String {
    if nodata.is_nan() {
        "nan".to_string()
    } else {
        nodata.to_string()
    }
}

fn decode_samples(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    }
}

/// Extract band 1 from a (possibly pixel-interleaved) sample buffer.
fn first_band(samples: Vec<f32>, width: u32, height: u32, path: &Path) -> Result<Vec<f32>> {
    let pixels = width as usize * height as usize;
    if pixels == 0 || samples.len() % pixels != 0 {
        return Err(RasterError::UnsupportedLayout {
            path: path.to_path_buf(),
            reason: format!(
                "{} samples for a {}x{} image",
                samples.len(),
                width,
                height
            ),
        });
    }

    let bands = samples.len() / pixels;
    if bands == 1 {
        return Ok(samples);
    }
    Ok(samples.into_iter().step_by(bands).collect())
}
