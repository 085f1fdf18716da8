//! Ground classification of point clouds.

use crate::config::ClassifyParams;
use crate::error::PipelineError;
use crate::pdal::{classify_pipeline, PipelineExecutor};
use crate::reporter::Reporter;
use crate::Result;
use demsynth_metrics::metric_defs::CLASSIFY_TIME;
use demsynth_metrics::metrics;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Marks ground points (class 2) of a point cloud in place.
pub trait GroundClassifier: Send + Sync {
    /// Classify `file`, returning the path of the classified cloud.
    fn classify(&self, file: &Path, params: &ClassifyParams) -> Result<PathBuf>;
}

/// Classifier backed by a PDAL pipeline.
///
/// The classified cloud is written next to the input and then renamed over
/// it, so a failed run leaves the input untouched.
pub struct PdalGroundClassifier<E> {
    executor: E,
    reporter: Arc<dyn Reporter>,
}

impl<E: PipelineExecutor> PdalGroundClassifier<E> {
    pub fn new(executor: E, reporter: Arc<dyn Reporter>) -> Self {
        Self { executor, reporter }
    }
}

impl<E: PipelineExecutor> GroundClassifier for PdalGroundClassifier<E> {
    fn classify(&self, file: &Path, params: &ClassifyParams) -> Result<PathBuf> {
        let failure = |reason: String| PipelineError::Classification {
            file: file.to_path_buf(),
            reason,
        };

        if !file.is_file() {
            return Err(failure("point cloud not found".into()));
        }

        let start = Instant::now();
        let staging = staging_path(file);
        let pipeline = classify_pipeline(file, &staging, params);

        if let Err(e) = self.executor.execute(&pipeline, params.verbose) {
            let _ = fs::remove_file(&staging);
            return Err(failure(e.to_string()));
        }
        if !staging.is_file() {
            return Err(failure(format!("no output written to {}", staging.display())));
        }
        fs::rename(&staging, file).map_err(|e| {
            let _ = fs::remove_file(&staging);
            failure(format!("could not replace input: {}", e))
        })?;

        let elapsed = start.elapsed();
        metrics::histogram!(CLASSIFY_TIME.name, "method" => params.method.as_str())
            .record(elapsed.as_secs_f64());
        self.reporter
            .info(&format!("Created {} in {:.2?}", file.display(), elapsed));
        Ok(file.to_path_buf())
    }
}

/// `<dir>/<stem>.ground-tmp.<ext>` next to `file`.
fn staging_path(file: &Path) -> PathBuf {
    let mut name = OsString::from(file.file_stem().unwrap_or(file.as_os_str()));
    name.push(".ground-tmp");
    if let Some(ext) = file.extension() {
        name.push(".");
        name.push(ext);
    }
    file.with_file_name(name)
}
