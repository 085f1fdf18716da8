//! Multi-radius DEM scheduling.
//!
//! One rasterization job runs per radius on a bounded worker pool. Results
//! are placed by radius index, so completion order never leaks into the
//! output. The first failing job fails the whole batch.

use crate::config::{DemRequest, RasterJob};
use crate::error::PipelineError;
use crate::job::{rasterization_error, PdalJobBuilder, RadiusRasterizer};
use crate::pdal::PipelineExecutor;
use crate::reporter::Reporter;
use crate::types::{ProductSeries, Radius, RadiusResult, RasterProduct};
use crate::Result;
use crossbeam_channel::RecvTimeoutError;
use demsynth_fill::{gap_fill_with, GapFillOptions, MergeOrder};
use demsynth_metrics::metric_defs::{DEM_BATCH_TIME, RASTERIZE_JOBS, RASTERIZE_JOB_TIME};
use demsynth_metrics::{metrics, DemLabels};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Runs radius jobs in parallel and merges their products.
pub struct RadiusScheduler {
    rasterizer: Arc<dyn RadiusRasterizer>,
    reporter: Arc<dyn Reporter>,
    gap_fill_options: GapFillOptions,
}

impl RadiusScheduler {
    /// Scheduler merging finest radius first.
    pub fn new(rasterizer: Arc<dyn RadiusRasterizer>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            rasterizer,
            reporter,
            gap_fill_options: GapFillOptions::default().with_order(MergeOrder::AsGiven),
        }
    }

    /// Scheduler running PDAL through `executor`.
    pub fn with_pdal<E>(executor: E, reporter: Arc<dyn Reporter>) -> Self
    where
        E: PipelineExecutor + 'static,
    {
        let builder = PdalJobBuilder::new(executor, Arc::clone(&reporter));
        Self::new(Arc::new(builder), reporter)
    }

    /// Override the gap-fill tunables.
    ///
    /// With [`MergeOrder::AsGiven`] or [`MergeOrder::Radius`] the radius
    /// rasters are merged by ascending radius value; with
    /// [`MergeOrder::Lexicographic`] by file name.
    pub fn with_gap_fill_options(mut self, options: GapFillOptions) -> Self {
        self.gap_fill_options = options;
        self
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Produce one raster per requested product.
    ///
    /// With gap-fill on, the radius rasters of each product are merged into
    /// [`RasterJob::merged_path`]; otherwise each product maps to the raster
    /// of the first requested radius and the other radius rasters stay on
    /// disk unused.
    pub fn create_dems(&self, request: &DemRequest) -> Result<BTreeMap<RasterProduct, PathBuf>> {
        let start = Instant::now();
        let series = self.run_radii(request)?;

        let mut outputs = BTreeMap::new();
        for (product, series) in series {
            let path = if request.gap_fill {
                let inputs = series.finest_first();
                let target = request.job.merged_path(&product);
                let report = gap_fill_with(inputs.as_slice(), &target, &self.gap_fill_options).map_err(
                    |source| PipelineError::GapFill {
                        product: product.to_string(),
                        source,
                    },
                )?;
                report.output
            } else {
                series.first().to_path_buf()
            };
            outputs.insert(product, path);
        }

        let elapsed = start.elapsed();
        let labels = DemLabels::new(request.job.dem_type.as_str()).to_labels();
        metrics::histogram!(DEM_BATCH_TIME.name, &labels).record(elapsed.as_secs_f64());
        self.reporter.info(&format!(
            "Completed {} for {} radii in {:.2?}",
            request.job.dem_type,
            request.radii.len(),
            elapsed
        ));
        Ok(outputs)
    }

    /// Run every radius job and regroup the outputs per product.
    ///
    /// Each series lists its files in the order the radii were requested.
    pub fn run_radii(&self, request: &DemRequest) -> Result<BTreeMap<RasterProduct, ProductSeries>> {
        request.validate()?;

        let job = Arc::new(request.job.clone());
        let radii = request.radii.clone();
        let results = match request.batch_timeout {
            None => run_batch(
                Arc::clone(&self.rasterizer),
                Arc::clone(&job),
                radii,
                request.max_workers,
            )?,
            Some(timeout) => {
                let start = Instant::now();
                let (tx, rx) = crossbeam_channel::bounded(1);
                let rasterizer = Arc::clone(&self.rasterizer);
                let batch_job = Arc::clone(&job);
                let max_workers = request.max_workers;
                std::thread::Builder::new()
                    .name("dem-batch".into())
                    .spawn(move || {
                        // Receiver may be gone after a timeout
                        let _ = tx.send(run_batch(rasterizer, batch_job, radii, max_workers));
                    })
                    .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;

                match rx.recv_timeout(timeout) {
                    Ok(results) => results?,
                    Err(RecvTimeoutError::Timeout) => {
                        self.reporter.warn(&format!(
                            "{} batch did not finish within {:.1?}",
                            job.dem_type, timeout
                        ));
                        return Err(PipelineError::Timeout {
                            elapsed: start.elapsed(),
                        });
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(PipelineError::WorkerPool(
                            "radius batch exited without a result".into(),
                        ))
                    }
                }
            }
        };

        regroup(&job, &request.radii, results)
    }
}

/// Run all radii on a dedicated pool, preserving radius order.
fn run_batch(
    rasterizer: Arc<dyn RadiusRasterizer>,
    job: Arc<RasterJob>,
    radii: Vec<Radius>,
    max_workers: Option<usize>,
) -> Result<Vec<RadiusResult>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.unwrap_or(0))
        .thread_name(|i| format!("dem-radius-{}", i))
        .build()
        .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;

    debug!(
        "Running {} radius job(s) on {} worker(s)",
        radii.len(),
        pool.current_num_threads()
    );

    pool.install(|| {
        radii
            .par_iter()
            .map(|&radius| run_one(rasterizer.as_ref(), &job, radius))
            .collect::<Result<Vec<_>>>()
    })
}

fn run_one(rasterizer: &dyn RadiusRasterizer, job: &RasterJob, radius: Radius) -> Result<RadiusResult> {
    let labels = DemLabels::new(job.dem_type.as_str()).with_radius(radius.to_string());
    let start = Instant::now();
    let result = rasterizer.rasterize(job, radius);

    metrics::histogram!(RASTERIZE_JOB_TIME.name, &labels.to_labels())
        .record(start.elapsed().as_secs_f64());
    let status = if result.is_ok() { "ok" } else { "failed" };
    metrics::counter!(RASTERIZE_JOBS.name, &labels.with_status(status)).increment(1);

    result
}

/// Turn per-radius results into per-product series indexed by radius slot.
fn regroup(
    job: &RasterJob,
    radii: &[Radius],
    results: Vec<RadiusResult>,
) -> Result<BTreeMap<RasterProduct, ProductSeries>> {
    if results.len() != radii.len() {
        return Err(PipelineError::WorkerPool(format!(
            "expected {} radius results, got {}",
            radii.len(),
            results.len()
        )));
    }

    let products: &BTreeSet<RasterProduct> = &job.products;
    let mut slots: BTreeMap<RasterProduct, Vec<(Radius, PathBuf)>> = products
        .iter()
        .map(|product| (product.clone(), Vec::with_capacity(radii.len())))
        .collect();

    for (&radius, result) in radii.iter().zip(&results) {
        for (product, column) in slots.iter_mut() {
            let path = result.get(product).ok_or_else(|| {
                rasterization_error(job, radius, format!("product '{}' was not produced", product))
            })?;
            column.push((radius, path.to_path_buf()));
        }
    }

    Ok(slots
        .into_iter()
        .map(|(product, entries)| {
            let series = ProductSeries::new(product.clone(), entries);
            (product, series)
        })
        .collect())
}
