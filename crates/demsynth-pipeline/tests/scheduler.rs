//! Radius scheduling against a fake rasterizer writing real GeoTIFFs.

use demsynth_fill::{GapFillError, GapFillOptions, MergeOrder};
use demsynth_pipeline::{
    ClassifyParams, DemOrchestrator, DemRequest, DemType, GroundClassifier, MemoryReporter,
    NullReporter, PipelineError, Radius, RadiusRasterizer, RadiusResult, RadiusScheduler,
    RasterJob, RasterProduct,
};
use demsynth_raster::{GeoTemplate, Raster};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const ND: f32 = -9999.0;
const W: u32 = 8;
const H: u32 = 6;
const HOLE: usize = 3 * W as usize + 4;

/// Writes one raster per product, filled with the radius value.
///
/// The smallest radius leaves a hole at `HOLE`. Jobs for earlier radii sleep
/// longer, so completion order is the reverse of request order.
#[derive(Default)]
struct FakeRasterizer {
    fail_radius: Option<f64>,
    all_nodata: bool,
    delay_ms: u64,
    running: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    completed: Mutex<Vec<String>>,
}

impl FakeRasterizer {
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl RadiusRasterizer for FakeRasterizer {
    fn rasterize(&self, job: &RasterJob, radius: Radius) -> demsynth_pipeline::Result<RadiusResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        // Larger radius, shorter job
        let delay = self.delay_ms / radius.value().max(1.0) as u64;
        thread::sleep(Duration::from_millis(delay));

        let outcome = if self.fail_radius == Some(radius.value()) {
            Err(PipelineError::Rasterization {
                dem_type: job.dem_type.to_string(),
                radius: radius.to_string(),
                reason: "pdal exited with status 1".into(),
            })
        } else {
            let mut outputs = BTreeMap::new();
            for product in &job.products {
                let value = if self.all_nodata { ND } else { radius.value() as f32 };
                let mut data = vec![value; (W * H) as usize];
                if radius.value() < 1.0 {
                    data[HOLE] = ND;
                }
                let path = job.output_path(radius, product);
                // The scratch dir may be gone once a timed-out test has returned
                let written = Raster::new(W, H, data)
                    .expect("Failed to build raster")
                    .with_nodata(ND)
                    .with_template(GeoTemplate::from_origin(500.0, 4000.0, 0.1))
                    .write(&path);
                if written.is_err() {
                    break;
                }
                outputs.insert(product.clone(), path);
            }
            if outputs.len() == job.products.len() {
                Ok(RadiusResult::new(radius, outputs))
            } else {
                Err(PipelineError::Rasterization {
                    dem_type: job.dem_type.to_string(),
                    radius: radius.to_string(),
                    reason: "could not write output".into(),
                })
            }
        };

        self.completed.lock().unwrap().push(radius.to_string());
        self.running.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

fn radii(values: &[f64]) -> Vec<Radius> {
    values.iter().map(|&v| Radius::new(v).unwrap()).collect()
}

fn request(dir: &Path, values: &[f64]) -> DemRequest {
    DemRequest::new(vec![dir.join("cloud.laz")], DemType::Dtm, dir).with_radii(radii(values))
}

fn scheduler(rasterizer: Arc<FakeRasterizer>) -> RadiusScheduler {
    RadiusScheduler::new(rasterizer, Arc::new(NullReporter))
}

fn unsmoothed(order: MergeOrder) -> GapFillOptions {
    GapFillOptions {
        median_size: 1,
        ..GapFillOptions::default().with_order(order)
    }
}

#[test]
fn test_without_gap_fill_first_radius_wins_regardless_of_completion() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Arc::new(FakeRasterizer {
        delay_ms: 200,
        ..FakeRasterizer::default()
    });
    let request = request(dir.path(), &[0.5, 2.0, 4.0])
        .with_gap_fill(false)
        .with_max_workers(Some(3));

    let outputs = scheduler(rasterizer.clone()).create_dems(&request).unwrap();

    assert_eq!(
        outputs[&RasterProduct::from("idw")],
        dir.path().join("dtm_r0.5.idw.tif")
    );
    let completed = rasterizer.completed.lock().unwrap();
    assert_eq!(completed.last().map(String::as_str), Some("0.5"));
    assert!(!dir.path().join("dtm.tif").exists());
}

#[test]
fn test_series_follow_request_order() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Arc::new(FakeRasterizer {
        delay_ms: 150,
        ..FakeRasterizer::default()
    });
    let request = request(dir.path(), &[0.5, 3.0, 1.5]);

    let series = scheduler(rasterizer).run_radii(&request).unwrap();

    let idw = &series[&RasterProduct::from("idw")];
    let names: Vec<String> = idw
        .paths()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["dtm_r0.5.idw.tif", "dtm_r3.idw.tif", "dtm_r1.5.idw.tif"]
    );
}

#[test]
fn test_gap_fill_merges_into_single_product_name() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Arc::new(FakeRasterizer::default());
    let request = request(dir.path(), &[0.5, 1.5]).with_suffix("_final");

    let outputs = scheduler(rasterizer)
        .with_gap_fill_options(unsmoothed(MergeOrder::AsGiven))
        .create_dems(&request)
        .unwrap();

    let merged_path = dir.path().join("dtm_final.tif");
    assert_eq!(outputs[&RasterProduct::from("idw")], merged_path);

    let merged = Raster::from_file(&merged_path).unwrap();
    assert_eq!(merged.nodata(), Some(ND));
    assert_eq!(merged.nodata_count(), 0);
    assert_eq!(merged.data()[HOLE], 1.5);
    assert_eq!(merged.data()[0], 0.5);
}

#[test]
fn test_merge_priority_is_numeric_radius() {
    let dir = tempfile::tempdir().unwrap();
    // "dtm_r10" sorts before "dtm_r2" by name
    let request = request(dir.path(), &[10.0, 2.0]);

    let outputs = scheduler(Arc::new(FakeRasterizer::default()))
        .create_dems(&request)
        .unwrap();
    let merged = Raster::from_file(&outputs[&RasterProduct::from("idw")]).unwrap();
    assert!(merged.data().iter().all(|&v| v == 2.0));

    let by_name = scheduler(Arc::new(FakeRasterizer::default()))
        .with_gap_fill_options(GapFillOptions::default())
        .create_dems(&request)
        .unwrap();
    let merged = Raster::from_file(&by_name[&RasterProduct::from("idw")]).unwrap();
    assert!(merged.data().iter().all(|&v| v == 10.0));
}

#[test]
fn test_every_requested_product_is_returned() {
    let dir = tempfile::tempdir().unwrap();
    let request = request(dir.path(), &[0.5, 1.0]).with_products(["idw", "max", "count"]);

    let outputs = scheduler(Arc::new(FakeRasterizer::default()))
        .create_dems(&request)
        .unwrap();

    let keys: BTreeSet<RasterProduct> = outputs.keys().cloned().collect();
    assert_eq!(keys, request.job.products);
    assert_eq!(
        outputs[&RasterProduct::from("max")],
        dir.path().join("dtm.max.tif")
    );
    for path in outputs.values() {
        assert!(path.is_file(), "{} missing", path.display());
    }
}

#[test]
fn test_failing_radius_fails_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Arc::new(FakeRasterizer {
        fail_radius: Some(2.0),
        ..FakeRasterizer::default()
    });
    let request = request(dir.path(), &[0.5, 2.0, 4.0]);

    let err = scheduler(rasterizer).create_dems(&request).unwrap_err();

    match err {
        PipelineError::Rasterization { radius, .. } => assert_eq!(radius, "2"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("dtm.tif").exists());
}

#[test]
fn test_max_workers_bounds_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Arc::new(FakeRasterizer {
        delay_ms: 30,
        ..FakeRasterizer::default()
    });
    let request = request(dir.path(), &[0.5, 1.0, 1.5, 2.0]).with_max_workers(Some(1));

    scheduler(rasterizer.clone()).create_dems(&request).unwrap();

    assert_eq!(rasterizer.peak(), 1);
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_batch_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Arc::new(FakeRasterizer {
        delay_ms: 2000,
        ..FakeRasterizer::default()
    });
    let request = request(dir.path(), &[0.5])
        .with_batch_timeout(Some(Duration::from_millis(50)));

    let err = scheduler(rasterizer).create_dems(&request).unwrap_err();

    match err {
        PipelineError::Timeout { elapsed } => assert!(elapsed >= Duration::from_millis(50)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_batch_within_timeout_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let request = request(dir.path(), &[0.5, 1.0])
        .with_batch_timeout(Some(Duration::from_secs(30)));

    let outputs = scheduler(Arc::new(FakeRasterizer::default()))
        .create_dems(&request)
        .unwrap();
    assert_eq!(outputs.len(), 1);
}

#[test]
fn test_empty_radii_rejected_before_any_job() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Arc::new(FakeRasterizer::default());
    let request = request(dir.path(), &[]);

    let err = scheduler(rasterizer.clone()).create_dems(&request).unwrap_err();

    assert!(matches!(err, PipelineError::InvalidRequest(_)));
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_all_nodata_stack_is_gap_fill_error() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Arc::new(FakeRasterizer {
        all_nodata: true,
        ..FakeRasterizer::default()
    });
    let request = request(dir.path(), &[0.5, 1.0]);

    let err = scheduler(rasterizer).create_dems(&request).unwrap_err();

    match err {
        PipelineError::GapFill { product, source } => {
            assert_eq!(product, "idw");
            assert!(matches!(source, GapFillError::NoValidData { inputs: 2 }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_scheduler_reports_completion() {
    let dir = tempfile::tempdir().unwrap();
    let reporter = Arc::new(MemoryReporter::new());
    let scheduler = RadiusScheduler::new(Arc::new(FakeRasterizer::default()), reporter.clone());

    scheduler
        .create_dems(&request(dir.path(), &[0.5, 1.0]))
        .unwrap();

    let messages = reporter.messages();
    assert!(messages
        .iter()
        .any(|m| m.starts_with("Completed dtm for 2 radii in")));
}

/// Records classified files; fails on request.
#[derive(Default)]
struct FakeClassifier {
    fail: bool,
    seen: Mutex<Vec<PathBuf>>,
}

impl GroundClassifier for FakeClassifier {
    fn classify(&self, file: &Path, _params: &ClassifyParams) -> demsynth_pipeline::Result<PathBuf> {
        if self.fail {
            return Err(PipelineError::Classification {
                file: file.to_path_buf(),
                reason: "pdal exited with status 1".into(),
            });
        }
        self.seen.lock().unwrap().push(file.to_path_buf());
        Ok(file.to_path_buf())
    }
}

#[test]
fn test_orchestrator_classifies_then_generates() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = Arc::new(FakeClassifier::default());
    let reporter = Arc::new(MemoryReporter::new());
    let orchestrator = DemOrchestrator::new(
        classifier.clone(),
        RadiusScheduler::new(Arc::new(FakeRasterizer::default()), reporter.clone()),
    );
    let request = request(dir.path(), &[0.5, 1.0]);

    let outputs = orchestrator
        .classify_then_generate(&ClassifyParams::default(), &request)
        .unwrap();

    assert_eq!(*classifier.seen.lock().unwrap(), request.job.source_files);
    assert_eq!(outputs[&RasterProduct::from("idw")], dir.path().join("dtm.tif"));
    assert!(reporter
        .messages()
        .last()
        .unwrap()
        .starts_with("Completed dtm generation in"));
}

#[test]
fn test_classification_failure_skips_rasterization() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Arc::new(FakeRasterizer::default());
    let orchestrator = DemOrchestrator::new(
        Arc::new(FakeClassifier {
            fail: true,
            ..FakeClassifier::default()
        }),
        scheduler(rasterizer.clone()),
    );

    let err = orchestrator
        .classify_then_generate(&ClassifyParams::default(), &request(dir.path(), &[0.5]))
        .unwrap_err();

    assert!(matches!(err, PipelineError::Classification { .. }));
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
}
