//! PDAL pipeline descriptions and the executor that runs them.

use crate::config::{product_path, ClassifyMethod, ClassifyParams, RasterJob};
use crate::error::PipelineError;
use crate::types::Radius;
use crate::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Environment variable overriding the PDAL executable.
pub const PDAL_ENV: &str = "DEMSYNTH_PDAL";

/// An ordered list of PDAL stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PdalPipeline {
    pipeline: Vec<Value>,
}

impl PdalPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Value) {
        self.pipeline.push(stage);
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[Value] {
        &self.pipeline
    }

    /// Stage `type` names in execution order.
    pub fn stage_types(&self) -> Vec<&str> {
        self.pipeline
            .iter()
            .filter_map(|stage| stage.get("type").and_then(Value::as_str))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build the rasterization pipeline for one radius.
///
/// Stage order: readers, decimation, classification range, then (unless the
/// type skips noise filtering) outlier, elevation, scan-angle and return
/// filters, and finally one GDAL writer per product.
pub fn rasterize_pipeline(job: &RasterJob, radius: Radius) -> PdalPipeline {
    let options = &job.options;
    let mut pipeline = PdalPipeline::new();

    for file in &job.source_files {
        pipeline.push(json!({ "type": "readers.las", "filename": file.to_string_lossy() }));
    }

    if let Some(step) = options.decimation {
        pipeline.push(json!({ "type": "filters.decimation", "step": step }));
    }

    if let Some(filter) = job.dem_type.classification_filter() {
        pipeline.push(json!({ "type": "filters.range", "limits": filter.limits() }));
    }

    if job.dem_type.applies_noise_filters() {
        if let Some(multiplier) = options.max_std_dev {
            pipeline.push(json!({
                "type": "filters.outlier",
                "method": "statistical",
                "mean_k": 8,
                "multiplier": multiplier,
            }));
        }
        if let Some(max_z) = options.max_elevation {
            pipeline.push(json!({
                "type": "filters.range",
                "limits": format!("Z[:{}]", max_z),
            }));
        }
        if let Some(angle) = options.max_angle {
            pipeline.push(json!({
                "type": "filters.range",
                "limits": format!("ScanAngleRank[{}:{}]", -angle, angle),
            }));
        }
        if let Some(returns) = options.max_return_number {
            pipeline.push(json!({
                "type": "filters.range",
                "limits": format!("NumberOfReturns[:{}]", returns),
            }));
        }
    }

    let base = job.base_path(radius);
    for product in &job.products {
        pipeline.push(json!({
            "type": "writers.gdal",
            "filename": product_path(&base, product).to_string_lossy(),
            "output_type": product.as_str(),
            "resolution": options.resolution,
            "radius": radius.value(),
            "data_type": "float32",
        }));
    }

    pipeline
}

/// Build the ground classification pipeline writing `input` to `output`.
pub fn classify_pipeline(input: &Path, output: &Path, params: &ClassifyParams) -> PdalPipeline {
    let mut pipeline = PdalPipeline::new();
    pipeline.push(json!({ "type": "readers.las", "filename": input.to_string_lossy() }));

    match params.method {
        ClassifyMethod::Smrf => pipeline.push(json!({
            "type": "filters.smrf",
            "slope": params.slope,
            "cell": params.cell_size,
            "window": params.max_window_size,
        })),
        ClassifyMethod::Pmf => {
            let mut stage = json!({
                "type": "filters.pmf",
                "slope": params.slope,
                "cell_size": params.cell_size,
                "max_window_size": params.max_window_size,
                "max_distance": params.max_distance,
                "initial_distance": params.initial_distance,
            });
            if params.approximate {
                stage["approximate"] = Value::Bool(true);
            }
            pipeline.push(stage);
        }
    }

    let mut writer = json!({ "type": "writers.las", "filename": output.to_string_lossy() });
    let compressed = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("laz"));
    if compressed {
        writer["compression"] = Value::String("laszip".into());
    }
    pipeline.push(writer);
    pipeline
}

/// Runs a PDAL pipeline to completion.
pub trait PipelineExecutor: Send + Sync {
    /// Execute `pipeline`; an error means the pipeline did not complete.
    fn execute(&self, pipeline: &PdalPipeline, verbose: bool) -> Result<()>;
}

/// Executor shelling out to `pdal pipeline --stdin`.
#[derive(Debug, Clone)]
pub struct PdalCli {
    program: PathBuf,
}

impl PdalCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `$DEMSYNTH_PDAL`, falling back to `pdal` on the `PATH`.
    pub fn from_env() -> Self {
        match std::env::var_os(PDAL_ENV) {
            Some(program) if !program.is_empty() => Self::new(program),
            _ => Self::new("pdal"),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn failure(&self, reason: impl Into<String>) -> PipelineError {
        PipelineError::Executor {
            program: self.program.display().to_string(),
            reason: reason.into(),
        }
    }
}

impl Default for PdalCli {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PipelineExecutor for PdalCli {
    fn execute(&self, pipeline: &PdalPipeline, verbose: bool) -> Result<()> {
        let json = pipeline.to_json()?;
        let mut command = Command::new(&self.program);
        command.args(["pipeline", "--stdin"]);
        if verbose {
            command.args(["--verbose", "8"]);
            debug!(pipeline = %json, "Running PDAL pipeline");
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(format!("could not start: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(json.as_bytes()) {
                drop(stdin);
                // Reap the child so it does not linger as a zombie.
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.failure(format!("could not write pipeline: {}", e)));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| self.failure(format!("could not wait for exit: {}", e)))?;

        if verbose && !output.stdout.is_empty() {
            debug!("{}", String::from_utf8_lossy(&output.stdout).trim_end());
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(self.failure(format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}
