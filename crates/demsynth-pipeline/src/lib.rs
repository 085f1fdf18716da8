//! # demsynth-pipeline
//!
//! Turns classified point clouds into elevation rasters.
//!
//! A [`DemRequest`] names the point clouds, the DEM type, a list of
//! interpolation radii and the raster products to write. The
//! [`RadiusScheduler`] runs one rasterization job per radius on a bounded
//! worker pool and, when gap-fill is on, merges the per-radius rasters of
//! each product with [`demsynth_fill`], finest radius first.
//!
//! Rasterization and classification go through PDAL: pipelines are built as
//! JSON ([`rasterize_pipeline`], [`classify_pipeline`]) and handed to a
//! [`PipelineExecutor`], by default [`PdalCli`].
//!
//! ## Example
//!
//! ```no_run
//! use demsynth_pipeline::{DemRequest, DemType, PdalCli, Radius, RadiusScheduler, TracingReporter};
//! use std::sync::Arc;
//!
//! let request = DemRequest::new(vec!["odm_georeferenced_model.laz".into()], DemType::Dtm, "odm_dem")
//!     .with_radii(vec![Radius::new(0.56)?, Radius::new(1.12)?])
//!     .with_products(["idw"]);
//!
//! let scheduler = RadiusScheduler::with_pdal(PdalCli::from_env(), Arc::new(TracingReporter));
//! let outputs = scheduler.create_dems(&request)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod classify;
mod config;
mod error;
mod job;
mod orchestrator;
mod pdal;
mod reporter;
mod scheduler;
mod types;

pub use classify::{GroundClassifier, PdalGroundClassifier};
pub use config::{
    ClassifyMethod, ClassifyParams, DemRequest, RasterJob, RasterizeOptions, DEFAULT_PRODUCT,
    DEFAULT_RESOLUTION,
};
pub use error::PipelineError;
pub use job::{PdalJobBuilder, RadiusRasterizer};
pub use orchestrator::DemOrchestrator;
pub use pdal::{
    classify_pipeline, rasterize_pipeline, PdalCli, PdalPipeline, PipelineExecutor, PDAL_ENV,
};
pub use reporter::{MemoryReporter, NullReporter, Reporter, TracingReporter};
pub use scheduler::RadiusScheduler;
pub use types::{
    ClassificationFilter, DemType, ProductSeries, Radius, RadiusResult, RasterProduct,
    GROUND_CLASS,
};

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
