//! Metrics infrastructure for the DEM synthesis pipeline.
//!
//! Every metric the pipeline records is declared here as a const [`Metric`]
//! so names, units and label keys live in one place. The `metrics` crate is
//! re-exported; install any recorder (or none) in the binary.
//!
//! # Example
//!
//! ```rust
//! use demsynth_metrics::{metric_defs, metrics, DemLabels};
//!
//! let labels = DemLabels::new("dtm").with_radius("0.56");
//! metrics::counter!(metric_defs::RASTERIZE_JOBS.name, &labels.with_status("ok")).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use demsynth_metrics::metrics::Unit;
/// use demsynth_metrics::{Metric, MetricKind};
///
/// const FILLED: Metric = Metric::counter("demsynth.example.filled")
///     .with_description("Cells filled")
///     .with_unit(Unit::Count)
///     .with_labels(&["dem_type"]);
///
/// assert_eq!(FILLED.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "demsynth.gap_fill.time_s").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the pipeline.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Rasterization
    // ========================================================================

    /// Radius rasterization jobs, by outcome.
    ///
    /// Labels: dem_type, radius, status (`ok` | `failed`)
    pub const RASTERIZE_JOBS: Metric = Metric::counter("demsynth.rasterize.jobs")
        .with_description("Radius rasterization jobs run")
        .with_unit(Unit::Count)
        .with_labels(&["dem_type", "radius", "status"]);

    /// Wall time of a single radius rasterization job.
    ///
    /// Labels: dem_type, radius
    pub const RASTERIZE_JOB_TIME: Metric = Metric::histogram("demsynth.rasterize.job_time_s")
        .with_description("Wall time of one radius rasterization job")
        .with_unit(Unit::Seconds)
        .with_labels(&["dem_type", "radius"]);

    /// Wall time of a whole multi-radius DEM batch, gap-fill included.
    ///
    /// Labels: dem_type
    pub const DEM_BATCH_TIME: Metric = Metric::histogram("demsynth.dems.batch_time_s")
        .with_description("Wall time of a multi-radius DEM batch")
        .with_unit(Unit::Seconds)
        .with_labels(&["dem_type"]);

    // ========================================================================
    // Gap-fill
    // ========================================================================

    /// Wall time of one gap-fill merge.
    pub const GAP_FILL_TIME: Metric = Metric::histogram("demsynth.gap_fill.time_s")
        .with_description("Wall time of one gap-fill merge")
        .with_unit(Unit::Seconds);

    /// Cells filled from a coarser-radius raster during the stack merge.
    pub const GAP_FILL_MERGED_CELLS: Metric = Metric::counter("demsynth.gap_fill.merged_cells")
        .with_description("Cells filled from later rasters in the stack")
        .with_unit(Unit::Count);

    /// Cells filled by nearest-valid propagation.
    pub const GAP_FILL_NEAREST_CELLS: Metric = Metric::counter("demsynth.gap_fill.nearest_cells")
        .with_description("Cells filled by nearest-valid propagation")
        .with_unit(Unit::Count);

    // ========================================================================
    // Classification
    // ========================================================================

    /// Wall time of ground classification of one point cloud.
    ///
    /// Labels: method (`smrf` | `pmf`)
    pub const CLASSIFY_TIME: Metric = Metric::histogram("demsynth.classify.time_s")
        .with_description("Wall time of ground classification")
        .with_unit(Unit::Seconds)
        .with_labels(&["method"]);

    /// All metrics, for bulk registration.
    pub const ALL: &[&Metric] = &[
        &RASTERIZE_JOBS,
        &RASTERIZE_JOB_TIME,
        &DEM_BATCH_TIME,
        &GAP_FILL_TIME,
        &GAP_FILL_MERGED_CELLS,
        &GAP_FILL_NEAREST_CELLS,
        &CLASSIFY_TIME,
    ];
}

/// Labels identifying a DEM batch or one of its radius jobs.
#[derive(Debug, Clone)]
pub struct DemLabels {
    /// DEM type (dsm, dtm, mesh_dsm, ...).
    pub dem_type: String,
    /// Interpolation radius, if the metric is per radius.
    pub radius: Option<String>,
}

impl DemLabels {
    /// Labels for a whole DEM batch.
    pub fn new(dem_type: impl Into<String>) -> Self {
        Self {
            dem_type: dem_type.into(),
            radius: None,
        }
    }

    /// Narrows the labels to one radius.
    pub fn with_radius(mut self, radius: impl Into<String>) -> Self {
        self.radius = Some(radius.into());
        self
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![("dem_type", self.dem_type.clone())];
        if let Some(radius) = &self.radius {
            labels.push(("radius", radius.clone()));
        }
        labels
    }

    /// Labels plus a job outcome.
    pub fn with_status(&self, status: &str) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.push(("status", status.to_string()));
        labels
    }
}

/// Registers descriptions for every pipeline metric.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
