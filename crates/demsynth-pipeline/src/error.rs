//! Error types for the DEM pipeline.

use demsynth_fill::GapFillError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while classifying, rasterizing or merging DEMs.
///
/// Every variant is fatal to the call that produced it; nothing is retried
/// and no partial product map is ever returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request cannot be run as given.
    #[error("Invalid DEM request: {0}")]
    InvalidRequest(String),

    /// Ground classification failed or produced no output.
    #[error("Ground classification of {file} failed: {reason}")]
    Classification {
        /// Point cloud being classified.
        file: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A radius rasterization run failed or left expected outputs missing.
    #[error("Rasterization of {dem_type} at radius {radius} failed: {reason}")]
    Rasterization {
        /// DEM type of the run.
        dem_type: String,
        /// Radius of the run.
        radius: String,
        /// What went wrong.
        reason: String,
    },

    /// Merging the radius rasters of one product failed.
    #[error("Gap-fill of product '{product}' failed: {source}")]
    GapFill {
        /// Product being merged.
        product: String,
        /// Underlying gap-fill error.
        #[source]
        source: GapFillError,
    },

    /// The PDAL executable could not be run or exited unsuccessfully.
    #[error("{program} failed: {reason}")]
    Executor {
        /// Program that was run.
        program: String,
        /// Exit status and stderr, or the spawn error.
        reason: String,
    },

    /// The whole radius batch exceeded its deadline.
    #[error("DEM batch timed out after {elapsed:.1?}")]
    Timeout {
        /// Time waited before giving up.
        elapsed: Duration,
    },

    /// The worker pool could not be created or lost its worker.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline description could not be serialised.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
