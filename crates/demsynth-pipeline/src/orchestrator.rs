//! Classification followed by multi-radius DEM generation.

use crate::classify::GroundClassifier;
use crate::config::{ClassifyParams, DemRequest};
use crate::scheduler::RadiusScheduler;
use crate::types::RasterProduct;
use crate::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Classifies the source point clouds, then generates the DEMs.
pub struct DemOrchestrator {
    classifier: Arc<dyn GroundClassifier>,
    scheduler: RadiusScheduler,
}

impl DemOrchestrator {
    pub fn new(classifier: Arc<dyn GroundClassifier>, scheduler: RadiusScheduler) -> Self {
        Self {
            classifier,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &RadiusScheduler {
        &self.scheduler
    }

    /// Classify every source file of `request` in place, then run
    /// [`RadiusScheduler::create_dems`].
    ///
    /// A classification failure stops the run before any rasterization.
    pub fn classify_then_generate(
        &self,
        classify: &ClassifyParams,
        request: &DemRequest,
    ) -> Result<BTreeMap<RasterProduct, PathBuf>> {
        let start = Instant::now();
        request.validate()?;

        for file in &request.job.source_files {
            self.classifier.classify(file, classify)?;
        }

        let outputs = self.scheduler.create_dems(request)?;
        self.scheduler.reporter().info(&format!(
            "Completed {} generation in {:.2?}",
            request.job.dem_type,
            start.elapsed()
        ));
        Ok(outputs)
    }
}
