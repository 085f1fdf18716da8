//! Core value types shared by the job builder, scheduler and gap-fill glue.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// ASPRS class code for ground points.
pub const GROUND_CLASS: u8 = 2;

/// One output raster kind of a rasterization run (`idw`, `max`, `count`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RasterProduct(String);

impl RasterProduct {
    /// Create a product key.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The product key as written into file names.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RasterProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RasterProduct {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Interpolation radius of one rasterization run, in point-cloud units.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Radius(f64);

impl Radius {
    /// Create a radius; it must be finite and positive.
    pub fn new(value: f64) -> Result<Self, String> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(format!("radius must be a positive number, got {}", value))
        }
    }

    /// Radius value.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Radius {
    fn default() -> Self {
        Self(0.56)
    }
}

impl fmt::Display for Radius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Radius {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid radius '{}'", s))?;
        Radius::new(value)
    }
}

impl TryFrom<f64> for Radius {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Radius::new(value)
    }
}

impl From<Radius> for f64 {
    fn from(radius: Radius) -> Self {
        radius.0
    }
}

/// Point classification filter implied by a DEM type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationFilter {
    /// Keep points whose class is at most the given class.
    AtMost(u8),
    /// Keep only points of exactly the given class.
    Exactly(u8),
}

impl ClassificationFilter {
    /// PDAL `filters.range` limits expression.
    pub fn limits(self) -> String {
        match self {
            ClassificationFilter::AtMost(class) => format!("Classification[:{}]", class),
            ClassificationFilter::Exactly(class) => format!("Classification[{0}:{0}]", class),
        }
    }
}

/// Kind of elevation model to synthesise.
///
/// The type fixes which filters the rasterization pipeline applies; this
/// table is policy, not configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DemType {
    /// Surface model: everything up to and including ground.
    Dsm,
    /// Terrain model: ground points only.
    Dtm,
    /// Surface model for meshing: no noise or outlier filtering.
    MeshDsm,
    /// Caller-defined type with no implicit classification filter.
    Other(String),
}

impl DemType {
    /// Name used in output file names.
    pub fn as_str(&self) -> &str {
        match self {
            DemType::Dsm => "dsm",
            DemType::Dtm => "dtm",
            DemType::MeshDsm => "mesh_dsm",
            DemType::Other(name) => name,
        }
    }

    /// Classification filter implied by this type.
    pub fn classification_filter(&self) -> Option<ClassificationFilter> {
        match self {
            DemType::Dsm => Some(ClassificationFilter::AtMost(GROUND_CLASS)),
            DemType::Dtm => Some(ClassificationFilter::Exactly(GROUND_CLASS)),
            DemType::MeshDsm | DemType::Other(_) => None,
        }
    }

    /// Whether the optional outlier/elevation/angle/return filters apply.
    pub fn applies_noise_filters(&self) -> bool {
        !matches!(self, DemType::MeshDsm)
    }
}

impl fmt::Display for DemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DemType {
    fn from(name: &str) -> Self {
        match name {
            "dsm" => DemType::Dsm,
            "dtm" => DemType::Dtm,
            "mesh_dsm" => DemType::MeshDsm,
            other => DemType::Other(other.to_string()),
        }
    }
}

impl From<String> for DemType {
    fn from(name: String) -> Self {
        DemType::from(name.as_str())
    }
}

impl From<DemType> for String {
    fn from(dem_type: DemType) -> Self {
        dem_type.as_str().to_string()
    }
}

/// Files produced by one rasterization run, one per requested product.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusResult {
    radius: Radius,
    outputs: BTreeMap<RasterProduct, PathBuf>,
}

impl RadiusResult {
    /// Bundle the outputs of the run at `radius`.
    pub fn new(radius: Radius, outputs: BTreeMap<RasterProduct, PathBuf>) -> Self {
        Self { radius, outputs }
    }

    /// Radius of the run.
    pub fn radius(&self) -> Radius {
        self.radius
    }

    /// File holding `product`, if the run produced it.
    pub fn get(&self, product: &RasterProduct) -> Option<&Path> {
        self.outputs.get(product).map(PathBuf::as_path)
    }

    /// All product files.
    pub fn outputs(&self) -> &BTreeMap<RasterProduct, PathBuf> {
        &self.outputs
    }
}

/// Per-radius files of one product, in the order the radii were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSeries {
    product: RasterProduct,
    entries: Vec<(Radius, PathBuf)>,
}

impl ProductSeries {
    /// Create a series; `entries` must be non-empty.
    pub(crate) fn new(product: RasterProduct, entries: Vec<(Radius, PathBuf)>) -> Self {
        debug_assert!(!entries.is_empty(), "empty product series");
        Self { product, entries }
    }

    /// Product of the series.
    pub fn product(&self) -> &RasterProduct {
        &self.product
    }

    /// Number of radii.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the series holds no file.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Files in requested radius order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(_, path)| path.as_path())
    }

    /// Radii in requested order.
    pub fn radii(&self) -> impl Iterator<Item = Radius> + '_ {
        self.entries.iter().map(|(radius, _)| *radius)
    }

    /// File of the first requested radius.
    pub fn first(&self) -> &Path {
        &self.entries[0].1
    }

    /// Files ordered by ascending radius value, finest first.
    ///
    /// Equal radii keep their requested order.
    pub fn finest_first(&self) -> Vec<PathBuf> {
        let mut entries: Vec<&(Radius, PathBuf)> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.value().total_cmp(&b.0.value()));
        entries.into_iter().map(|(_, path)| path.clone()).collect()
    }
}
