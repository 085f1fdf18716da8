//! YAML job configuration.
//!
//! Every field is optional; command-line flags override what the file sets.
//!
//! ```yaml
//! dems:
//!   source_files: [odm_georeferenced_model.laz]
//!   dem_type: dtm
//!   radii: [0.56, 1.12, 2.24]
//!   products: [idw]
//!   output_dir: odm_dem
//!   max_workers: 4
//!   options:
//!     resolution: 0.05
//!     max_std_dev: 2.5
//! classify:
//!   method: smrf
//!   slope: 0.15
//! gap_fill:
//!   order: radius
//! ```

use crate::error::RunnerError;
use demsynth_fill::{EdgeMode, GapFillOptions, MergeOrder, DEFAULT_MEDIAN_SIZE};
use demsynth_pipeline::{
    ClassifyParams, DemRequest, DemType, Radius, RasterProduct, RasterizeOptions, DEFAULT_PRODUCT,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level job file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    #[serde(default)]
    pub dems: DemsConfig,
    #[serde(default)]
    pub classify: ClassifyParams,
    #[serde(default)]
    pub gap_fill: GapFillConfig,
}

/// DEM generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemsConfig {
    #[serde(default)]
    pub source_files: Vec<PathBuf>,
    #[serde(default = "default_dem_type")]
    pub dem_type: DemType,
    #[serde(default = "default_radii")]
    pub radii: Vec<Radius>,
    #[serde(default = "default_products")]
    pub products: Vec<RasterProduct>,
    #[serde(default = "default_true")]
    pub gap_fill: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub options: RasterizeOptions,
    #[serde(default)]
    pub max_workers: Option<usize>,
    /// Deadline for the whole radius batch, in seconds.
    #[serde(default)]
    pub batch_timeout_secs: Option<f64>,
}

fn default_dem_type() -> DemType {
    DemType::Dsm
}

fn default_radii() -> Vec<Radius> {
    vec![Radius::default()]
}

fn default_products() -> Vec<RasterProduct> {
    vec![RasterProduct::from(DEFAULT_PRODUCT)]
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DemsConfig {
    fn default() -> Self {
        Self {
            source_files: Vec::new(),
            dem_type: default_dem_type(),
            radii: default_radii(),
            products: default_products(),
            gap_fill: true,
            output_dir: default_output_dir(),
            suffix: String::new(),
            options: RasterizeOptions::default(),
            max_workers: None,
            batch_timeout_secs: None,
        }
    }
}

impl DemsConfig {
    /// Build the request handed to the scheduler.
    pub fn to_request(&self) -> Result<DemRequest, RunnerError> {
        let batch_timeout = self
            .batch_timeout_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    RunnerError::Config(format!("invalid batch timeout {}", secs))
                })
            })
            .transpose()?;

        let request = DemRequest::new(
            self.source_files.clone(),
            self.dem_type.clone(),
            self.output_dir.clone(),
        )
        .with_radii(self.radii.clone())
        .with_products(self.products.iter().cloned())
        .with_gap_fill(self.gap_fill)
        .with_suffix(self.suffix.clone())
        .with_options(self.options.clone())
        .with_max_workers(self.max_workers)
        .with_batch_timeout(batch_timeout);

        request.validate()?;
        Ok(request)
    }
}

/// Merge priority setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrderSetting {
    /// Finest radius first.
    #[default]
    Radius,
    /// File name order.
    Lexicographic,
}

/// Median edge handling setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeModeSetting {
    #[default]
    Reflect,
    Zero,
}

/// Gap-fill tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GapFillConfig {
    #[serde(default)]
    pub order: MergeOrderSetting,
    #[serde(default = "default_median_size")]
    pub median_size: usize,
    #[serde(default)]
    pub edge_mode: EdgeModeSetting,
}

fn default_median_size() -> usize {
    DEFAULT_MEDIAN_SIZE
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self {
            order: MergeOrderSetting::default(),
            median_size: DEFAULT_MEDIAN_SIZE,
            edge_mode: EdgeModeSetting::default(),
        }
    }
}

impl GapFillConfig {
    pub fn to_options(&self) -> GapFillOptions {
        GapFillOptions {
            order: match self.order {
                MergeOrderSetting::Radius => MergeOrder::Radius,
                MergeOrderSetting::Lexicographic => MergeOrder::Lexicographic,
            },
            median_size: self.median_size,
            edge_mode: match self.edge_mode {
                EdgeModeSetting::Reflect => EdgeMode::Reflect,
                EdgeModeSetting::Zero => EdgeMode::Zero,
            },
        }
    }
}

/// Load a job file.
pub fn load_config(path: &Path) -> Result<JobConfig, RunnerError> {
    let text = std::fs::read_to_string(path).map_err(|source| RunnerError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&text)
}

/// Parse a job file from YAML text.
pub fn load_config_from_str(text: &str) -> Result<JobConfig, RunnerError> {
    if text.trim().is_empty() {
        return Ok(JobConfig::default());
    }
    Ok(serde_yaml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use demsynth_pipeline::ClassifyMethod;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.dems.dem_type, DemType::Dsm);
        assert_eq!(config.dems.radii, vec![Radius::default()]);
        assert_eq!(config.dems.products, vec![RasterProduct::from("idw")]);
        assert!(config.dems.gap_fill);
        assert_eq!(config.gap_fill.to_options().order, MergeOrder::Radius);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
dems:
  source_files: [cloud.laz]
  dem_type: mesh_dsm
  radii: [0.5, 1.0]
  products: [idw, max]
  gap_fill: false
  output_dir: out
  suffix: _v2
  max_workers: 2
  batch_timeout_secs: 90
  options:
    resolution: 0.05
    decimation: 10
classify:
  method: smrf
  slope: 0.15
gap_fill:
  order: lexicographic
  median_size: 3
  edge_mode: zero
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.dems.dem_type, DemType::MeshDsm);
        assert_eq!(config.classify.method, ClassifyMethod::Smrf);
        assert_eq!(config.classify.cell_size, 3.0);

        let request = config.dems.to_request().unwrap();
        assert_eq!(request.radii.len(), 2);
        assert_eq!(request.job.products.len(), 2);
        assert!(!request.gap_fill);
        assert_eq!(request.job.options.decimation, Some(10));
        assert_eq!(request.job.options.resolution, 0.05);
        assert_eq!(request.max_workers, Some(2));
        assert_eq!(request.batch_timeout, Some(Duration::from_secs(90)));

        let options = config.gap_fill.to_options();
        assert_eq!(options.order, MergeOrder::Lexicographic);
        assert_eq!(options.median_size, 3);
        assert_eq!(options.edge_mode, EdgeMode::Zero);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = load_config_from_str("dems:\n  radius: 2\n").unwrap_err();
        assert!(matches!(err, RunnerError::ConfigParse(_)));
    }

    #[test]
    fn test_negative_radius_rejected() {
        assert!(load_config_from_str("dems:\n  radii: [-1]\n").is_err());
    }

    #[test]
    fn test_request_without_sources_is_invalid() {
        let err = DemsConfig::default().to_request().unwrap_err();
        assert!(matches!(err, RunnerError::Pipeline(_)));
    }
}
