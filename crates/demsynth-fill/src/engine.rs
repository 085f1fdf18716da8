//! File-level gap-fill: read the stack, merge, fill, smooth, write.

use crate::median::{median_filter, EdgeMode, DEFAULT_MEDIAN_SIZE};
use crate::merge::merge_layer;
use crate::nearest::fill_nearest;
use crate::{GapFillError, Result};
use demsynth_metrics::{metric_defs, metrics};
use demsynth_raster::Raster;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Priority order of the input rasters during the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeOrder {
    /// Sort input paths byte-wise; the smallest path has priority.
    #[default]
    Lexicographic,
    /// Sort by the `_r<radius>` token of the file name, finest first.
    /// Names without a radius follow, byte-wise; equal radii tie-break
    /// byte-wise too.
    Radius,
    /// Keep the caller's order; the first path has priority.
    AsGiven,
}

/// Tunables for [`gap_fill_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapFillOptions {
    /// Merge priority of the inputs.
    pub order: MergeOrder,
    /// Median window edge length (odd).
    pub median_size: usize,
    /// Median sampling beyond the raster edge.
    pub edge_mode: EdgeMode,
}

impl Default for GapFillOptions {
    fn default() -> Self {
        Self {
            order: MergeOrder::Lexicographic,
            median_size: DEFAULT_MEDIAN_SIZE,
            edge_mode: EdgeMode::Reflect,
        }
    }
}

impl GapFillOptions {
    /// Same options with a different merge order.
    pub fn with_order(mut self, order: MergeOrder) -> Self {
        self.order = order;
        self
    }
}

/// What a gap-fill run did.
#[derive(Debug, Clone)]
pub struct GapFillReport {
    /// Merged raster written.
    pub output: PathBuf,
    /// Inputs in the priority order they were merged.
    pub inputs: Vec<PathBuf>,
    /// Cells filled from later inputs during the merge.
    pub merged_cells: usize,
    /// Cells filled by nearest-valid propagation.
    pub nearest_cells: usize,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

/// Gap-fill `inputs` into `output` with the default options.
///
/// Returns the path of the merged raster.
pub fn gap_fill<P: AsRef<Path>, Q: AsRef<Path>>(inputs: &[P], output: Q) -> Result<PathBuf> {
    gap_fill_with(inputs, output, &GapFillOptions::default()).map(|report| report.output)
}

/// Gap-fill `inputs` into `output`.
///
/// The first input in merge order supplies the accumulator, the nodata
/// sentinel and the grid of the output. Raster read/write failures are
/// returned unchanged as [`GapFillError::Raster`].
pub fn gap_fill_with<P: AsRef<Path>, Q: AsRef<Path>>(
    inputs: &[P],
    output: Q,
    options: &GapFillOptions,
) -> Result<GapFillReport> {
    let start = Instant::now();

    if inputs.is_empty() {
        return Err(GapFillError::EmptyInput);
    }
    if options.median_size % 2 == 0 {
        return Err(GapFillError::InvalidWindow(options.median_size));
    }

    let mut ordered: Vec<PathBuf> = inputs.iter().map(|p| p.as_ref().to_path_buf()).collect();
    match options.order {
        MergeOrder::Lexicographic => ordered.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str())),
        MergeOrder::Radius => ordered.sort_by(|a, b| {
            match (radius_of(a), radius_of(b)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| a.as_os_str().cmp(b.as_os_str()))
        }),
        MergeOrder::AsGiven => {}
    }

    info!("Starting gap-filling of {} raster(s) with nearest interpolation", ordered.len());

    let mut base = Raster::from_file(&ordered[0])?;
    let nodata = base.nodata_or_default();

    let mut merged_cells = 0;
    for path in &ordered[1..] {
        let layer = Raster::from_file(path)?;
        base.ensure_same_shape(&layer)?;
        let layer_nodata = layer.nodata().unwrap_or(nodata);
        let filled = merge_layer(base.data_mut(), nodata, layer.data(), layer_nodata);
        debug!("Filled {} cells from {}", filled, path.display());
        merged_cells += filled;
    }

    let (width, height) = base.dimensions();
    let (width, height) = (width as usize, height as usize);
    let nearest_cells = fill_nearest(base.data_mut(), width, height, nodata).ok_or(
        GapFillError::NoValidData {
            inputs: ordered.len(),
        },
    )?;
    debug!("Filled {} cells by nearest-valid propagation", nearest_cells);

    let filtered = median_filter(base.data(), width, height, options.median_size, options.edge_mode);

    let output = output.as_ref().to_path_buf();
    base.create_from(filtered)?.write(&output)?;

    let elapsed = start.elapsed();
    metrics::histogram!(metric_defs::GAP_FILL_TIME.name).record(elapsed.as_secs_f64());
    metrics::counter!(metric_defs::GAP_FILL_MERGED_CELLS.name).increment(merged_cells as u64);
    metrics::counter!(metric_defs::GAP_FILL_NEAREST_CELLS.name).increment(nearest_cells as u64);
    info!("Completed gap-filling to create {} in {:.2?}", output.display(), elapsed);

    Ok(GapFillReport {
        output,
        inputs: ordered,
        merged_cells,
        nearest_cells,
        elapsed,
    })
}

/// Radius encoded in a raster name such as `dtm_r0.56.idw.tif`.
fn radius_of(path: &Path) -> Option<f64> {
    let name = path.file_name()?.to_str()?;
    name.match_indices("_r").find_map(|(at, _)| {
        let token = &name[at + 2..];
        let end = token
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(token.len());
        token[..end].trim_end_matches('.').parse().ok()
    })
}
