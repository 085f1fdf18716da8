//! Request and tuning types for rasterization and classification.

use crate::error::PipelineError;
use crate::types::{DemType, Radius, RasterProduct};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default output grid resolution in point-cloud units.
pub const DEFAULT_RESOLUTION: f64 = 0.1;

/// Default product when none is requested.
pub const DEFAULT_PRODUCT: &str = "idw";

/// Filters and grid settings for one rasterization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RasterizeOptions {
    /// Keep every n-th point.
    #[serde(default)]
    pub decimation: Option<u32>,
    /// Statistical outlier multiplier.
    #[serde(default)]
    pub max_std_dev: Option<f64>,
    /// Upper Z bound.
    #[serde(default)]
    pub max_elevation: Option<f64>,
    /// Maximum absolute scan angle.
    #[serde(default)]
    pub max_angle: Option<f64>,
    /// Maximum number of returns.
    #[serde(default)]
    pub max_return_number: Option<u32>,
    /// Output grid resolution.
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    /// Run PDAL with verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_resolution() -> f64 {
    DEFAULT_RESOLUTION
}

impl Default for RasterizeOptions {
    fn default() -> Self {
        Self {
            decimation: None,
            max_std_dev: None,
            max_elevation: None,
            max_angle: None,
            max_return_number: None,
            resolution: DEFAULT_RESOLUTION,
            verbose: false,
        }
    }
}

/// Everything one radius run needs apart from the radius itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterJob {
    /// Point-cloud files to rasterize.
    pub source_files: Vec<PathBuf>,
    /// DEM type; fixes the filter policy.
    pub dem_type: DemType,
    /// Products written by every run.
    pub products: BTreeSet<RasterProduct>,
    /// Directory receiving all rasters.
    pub output_dir: PathBuf,
    /// Inserted after the radius in per-radius names and after the type in merged names.
    pub suffix: String,
    /// Filters and grid settings.
    pub options: RasterizeOptions,
}

impl RasterJob {
    /// Path prefix of the run at `radius`: `<dir>/<type>_r<radius><suffix>`.
    pub fn base_path(&self, radius: Radius) -> PathBuf {
        self.output_dir
            .join(format!("{}_r{}{}", self.dem_type, radius, self.suffix))
    }

    /// Output file of `product` for the run at `radius`.
    pub fn output_path(&self, radius: Radius, product: &RasterProduct) -> PathBuf {
        product_path(&self.base_path(radius), product)
    }

    /// Merged raster path.
    ///
    /// A single-product job merges into `<type><suffix>.tif`; with several
    /// products each merge gets `<type><suffix>.<product>.tif`.
    pub fn merged_path(&self, product: &RasterProduct) -> PathBuf {
        if self.products.len() > 1 {
            self.output_dir.join(format!(
                "{}{}.{}.tif",
                self.dem_type, self.suffix, product
            ))
        } else {
            self.output_dir
                .join(format!("{}{}.tif", self.dem_type, self.suffix))
        }
    }
}

/// Appends `.<product>.tif` to a base path without touching its dots.
pub(crate) fn product_path(base: &Path, product: &RasterProduct) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{}.tif", product));
    PathBuf::from(name)
}

/// A full multi-radius DEM request.
#[derive(Debug, Clone, PartialEq)]
pub struct DemRequest {
    /// Shared job description.
    pub job: RasterJob,
    /// Radii in requested order.
    pub radii: Vec<Radius>,
    /// Merge per-radius rasters; otherwise the first radius is returned as-is.
    pub gap_fill: bool,
    /// Worker cap; `None` uses one worker per CPU.
    pub max_workers: Option<usize>,
    /// Deadline for the whole radius batch.
    pub batch_timeout: Option<Duration>,
}

impl DemRequest {
    /// Request with one radius of 0.56, the `idw` product and gap-fill on.
    pub fn new(
        source_files: Vec<PathBuf>,
        dem_type: DemType,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            job: RasterJob {
                source_files,
                dem_type,
                products: BTreeSet::from([RasterProduct::from(DEFAULT_PRODUCT)]),
                output_dir: output_dir.into(),
                suffix: String::new(),
                options: RasterizeOptions::default(),
            },
            radii: vec![Radius::default()],
            gap_fill: true,
            max_workers: None,
            batch_timeout: None,
        }
    }

    pub fn with_radii(mut self, radii: Vec<Radius>) -> Self {
        self.radii = radii;
        self
    }

    pub fn with_products<I, P>(mut self, products: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<RasterProduct>,
    {
        self.job.products = products.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_gap_fill(mut self, gap_fill: bool) -> Self {
        self.gap_fill = gap_fill;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.job.suffix = suffix.into();
        self
    }

    pub fn with_options(mut self, options: RasterizeOptions) -> Self {
        self.job.options = options;
        self
    }

    pub fn with_max_workers(mut self, max_workers: Option<usize>) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    /// Reject requests that cannot produce a product map.
    pub fn validate(&self) -> Result<()> {
        if self.radii.is_empty() {
            return Err(PipelineError::InvalidRequest("no radius given".into()));
        }
        if self.job.products.is_empty() {
            return Err(PipelineError::InvalidRequest("no raster product given".into()));
        }
        if self.job.source_files.is_empty() {
            return Err(PipelineError::InvalidRequest("no source point cloud given".into()));
        }
        if !(self.job.options.resolution.is_finite() && self.job.options.resolution > 0.0) {
            return Err(PipelineError::InvalidRequest(format!(
                "resolution must be positive, got {}",
                self.job.options.resolution
            )));
        }
        let mut seen = BTreeSet::new();
        for radius in &self.radii {
            if !seen.insert(radius.to_string()) {
                return Err(PipelineError::InvalidRequest(format!(
                    "radius {} requested more than once",
                    radius
                )));
            }
        }
        if self.max_workers == Some(0) {
            return Err(PipelineError::InvalidRequest("max_workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// Ground classification algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyMethod {
    /// Progressive morphological filter.
    #[default]
    Pmf,
    /// Simple morphological filter.
    Smrf,
}

impl ClassifyMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassifyMethod::Pmf => "pmf",
            ClassifyMethod::Smrf => "smrf",
        }
    }
}

/// Ground classification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifyParams {
    #[serde(default)]
    pub method: ClassifyMethod,
    #[serde(default = "default_slope")]
    pub slope: f64,
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
    #[serde(default = "default_max_window_size")]
    pub max_window_size: f64,
    /// PMF only.
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    /// PMF only.
    #[serde(default)]
    pub approximate: bool,
    /// PMF only.
    #[serde(default = "default_initial_distance")]
    pub initial_distance: f64,
    #[serde(default)]
    pub verbose: bool,
}

fn default_slope() -> f64 {
    1.0
}

fn default_cell_size() -> f64 {
    3.0
}

fn default_max_window_size() -> f64 {
    10.0
}

fn default_max_distance() -> f64 {
    1.0
}

fn default_initial_distance() -> f64 {
    0.7
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            method: ClassifyMethod::default(),
            slope: default_slope(),
            cell_size: default_cell_size(),
            max_window_size: default_max_window_size(),
            max_distance: default_max_distance(),
            approximate: false,
            initial_distance: default_initial_distance(),
            verbose: false,
        }
    }
}
