//! Builds and runs the rasterization job for a single radius.

use crate::config::RasterJob;
use crate::error::PipelineError;
use crate::pdal::{rasterize_pipeline, PipelineExecutor};
use crate::reporter::Reporter;
use crate::types::{Radius, RadiusResult, RasterProduct};
use crate::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Produces the per-product rasters of one radius.
///
/// Implementations must write every requested product or fail; the scheduler
/// never sees a partial result.
pub trait RadiusRasterizer: Send + Sync {
    fn rasterize(&self, job: &RasterJob, radius: Radius) -> Result<RadiusResult>;
}

/// Rasterizer backed by a PDAL pipeline.
pub struct PdalJobBuilder<E> {
    executor: E,
    reporter: Arc<dyn Reporter>,
}

impl<E: PipelineExecutor> PdalJobBuilder<E> {
    pub fn new(executor: E, reporter: Arc<dyn Reporter>) -> Self {
        Self { executor, reporter }
    }

    /// Run the pipeline for `radius` and verify every product file exists.
    pub fn build_and_run(&self, job: &RasterJob, radius: Radius) -> Result<RadiusResult> {
        if job.source_files.is_empty() {
            return Err(rasterization_error(job, radius, "no source point cloud"));
        }

        let start = Instant::now();
        let outputs: BTreeMap<RasterProduct, PathBuf> = job
            .products
            .iter()
            .map(|product| (product.clone(), job.output_path(radius, product)))
            .collect();
        let label = format!(
            "{} [{}]",
            job.base_path(radius).display(),
            job.products
                .iter()
                .map(RasterProduct::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.reporter.info(&format!(
            "Creating {} from {} files",
            label,
            job.source_files.len()
        ));

        let pipeline = rasterize_pipeline(job, radius);
        self.executor
            .execute(&pipeline, job.options.verbose)
            .map_err(|e| rasterization_error(job, radius, e.to_string()))?;

        let missing: Vec<String> = outputs
            .values()
            .filter(|path| !path.exists())
            .map(|path| path.display().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(rasterization_error(
                job,
                radius,
                format!("missing output file(s): {}", missing.join(", ")),
            ));
        }

        self.reporter
            .info(&format!("Completed {} in {:.2?}", label, start.elapsed()));
        Ok(RadiusResult::new(radius, outputs))
    }
}

impl<E: PipelineExecutor> RadiusRasterizer for PdalJobBuilder<E> {
    fn rasterize(&self, job: &RasterJob, radius: Radius) -> Result<RadiusResult> {
        self.build_and_run(job, radius)
    }
}

pub(crate) fn rasterization_error(
    job: &RasterJob,
    radius: Radius,
    reason: impl Into<String>,
) -> PipelineError {
    PipelineError::Rasterization {
        dem_type: job.dem_type.to_string(),
        radius: radius.to_string(),
        reason: reason.into(),
    }
}
