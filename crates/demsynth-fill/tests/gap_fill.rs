//! End-to-end gap-fill tests on GeoTIFFs in a scratch directory.

use approx::assert_relative_eq;
use demsynth_fill::{gap_fill, gap_fill_with, GapFillError, GapFillOptions, MergeOrder};
use demsynth_raster::{GeoTemplate, Raster, RasterError};
use std::path::{Path, PathBuf};

const ND: f32 = -9999.0;
const W: u32 = 6;
const H: u32 = 5;

fn write_raster(dir: &Path, name: &str, data: Vec<f32>) -> PathBuf {
    let path = dir.join(name);
    Raster::new(W, H, data)
        .expect("Failed to build raster")
        .with_nodata(ND)
        .with_template(GeoTemplate::from_origin(300.0, 900.0, 0.5))
        .write(&path)
        .expect("Failed to write raster");
    path
}

fn idx(row: usize, col: usize) -> usize {
    row * W as usize + col
}

/// Options that skip smoothing, to observe the merge and nearest fill alone.
fn unsmoothed() -> GapFillOptions {
    GapFillOptions {
        median_size: 1,
        ..GapFillOptions::default()
    }
}

#[test]
fn test_hole_filled_from_second_raster() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut first = vec![10.0; (W * H) as usize];
    first[idx(2, 2)] = ND;
    let second: Vec<f32> = (0..W * H).map(|v| 100.0 + v as f32).collect();

    let r1 = write_raster(dir.path(), "dtm_r0.56.idw.tif", first);
    let r2 = write_raster(dir.path(), "dtm_r1.41.idw.tif", second.clone());
    let out = dir.path().join("dtm.tif");

    let report = gap_fill_with(&[&r1, &r2], &out, &unsmoothed()).expect("Gap-fill failed");
    assert_eq!(report.merged_cells, 1);
    assert_eq!(report.nearest_cells, 0);

    let merged = Raster::from_file(&out).expect("Failed to read output");
    for (i, &v) in merged.data().iter().enumerate() {
        if i == idx(2, 2) {
            assert_eq!(v, second[idx(2, 2)]);
        } else {
            assert_eq!(v, 10.0, "cell {} should come from the first raster", i);
        }
    }
}

#[test]
fn test_lexicographic_order_ignores_caller_order() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut first = vec![1.0; (W * H) as usize];
    first[idx(0, 0)] = ND;
    let r1 = write_raster(dir.path(), "a.tif", first);
    let r2 = write_raster(dir.path(), "b.tif", vec![2.0; (W * H) as usize]);
    let out = dir.path().join("out.tif");

    let report = gap_fill_with(&[&r2, &r1], &out, &unsmoothed()).expect("Gap-fill failed");
    assert_eq!(report.inputs, vec![r1.clone(), r2.clone()]);

    let merged = Raster::from_file(&out).expect("Failed to read output");
    assert_eq!(merged.get(0, 0), Some(2.0));
    assert_eq!(merged.get(3, 3), Some(1.0));

    // Caller order wins when asked to
    let options = unsmoothed().with_order(MergeOrder::AsGiven);
    let report = gap_fill_with(&[&r2, &r1], &out, &options).expect("Gap-fill failed");
    assert_eq!(report.inputs, vec![r2, r1]);
    let merged = Raster::from_file(&out).expect("Failed to read output");
    assert!(merged.data().iter().all(|&v| v == 2.0));
}

#[test]
fn test_radius_order_prefers_finest_whatever_the_caller_order() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut fine = vec![2.0; (W * H) as usize];
    fine[idx(1, 1)] = ND;
    let r2 = write_raster(dir.path(), "dtm_r2.idw.tif", fine);
    let r10 = write_raster(dir.path(), "dtm_r10.idw.tif", vec![10.0; (W * H) as usize]);
    let options = unsmoothed().with_order(MergeOrder::Radius);

    for (name, inputs) in [("fwd.tif", [&r2, &r10]), ("rev.tif", [&r10, &r2])] {
        let out = dir.path().join(name);
        let report = gap_fill_with(&inputs, &out, &options).expect("Gap-fill failed");
        assert_eq!(report.inputs, vec![r2.clone(), r10.clone()]);

        let merged = Raster::from_file(&out).expect("Failed to read output");
        assert_eq!(merged.get(0, 0), Some(2.0));
        assert_eq!(merged.get(1, 1), Some(10.0));
    }
}

#[test]
fn test_dense_flat_raster_is_unchanged() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_raster(dir.path(), "dsm_r0.56.max.tif", vec![123.25; (W * H) as usize]);
    let out = dir.path().join("dsm.tif");

    let written = gap_fill(&[&input], &out).expect("Gap-fill failed");
    assert_eq!(written, out);

    let source = Raster::from_file(&input).expect("Failed to read input");
    let merged = Raster::from_file(&out).expect("Failed to read output");
    assert_eq!(merged.data(), source.data());
}

#[test]
fn test_single_valid_pixel_spreads_everywhere() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut data = vec![ND; (W * H) as usize];
    data[idx(4, 1)] = 57.5;
    let input = write_raster(dir.path(), "sparse.tif", data);
    let out = dir.path().join("dense.tif");

    let report = gap_fill_with(&[&input], &out, &unsmoothed()).expect("Gap-fill failed");
    assert_eq!(report.nearest_cells, (W * H) as usize - 1);
    let merged = Raster::from_file(&out).expect("Failed to read output");
    assert!(merged.data().iter().all(|&v| v == 57.5));

    // Smoothing a constant raster keeps it constant
    gap_fill(&[&input], &out).expect("Gap-fill failed");
    let merged = Raster::from_file(&out).expect("Failed to read output");
    for &v in merged.data() {
        assert_relative_eq!(v, 57.5);
    }
}

#[test]
fn test_output_keeps_nodata_and_grid() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut data: Vec<f32> = (0..W * H).map(|v| v as f32).collect();
    data[idx(1, 1)] = ND;
    data[idx(3, 4)] = ND;
    let input = write_raster(dir.path(), "holes.tif", data);
    let out = dir.path().join("filled.tif");

    gap_fill(&[&input], &out).expect("Gap-fill failed");

    let merged = Raster::from_file(&out).expect("Failed to read output");
    assert_eq!(merged.nodata(), Some(ND));
    assert_eq!(merged.nodata_count(), 0);
    assert_eq!(merged.dimensions(), (W, H));
    assert_eq!(merged.template().origin(), Some((300.0, 900.0)));
}

#[test]
fn test_all_nodata_stack_fails() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let a = write_raster(dir.path(), "a.tif", vec![ND; (W * H) as usize]);
    let b = write_raster(dir.path(), "b.tif", vec![ND; (W * H) as usize]);

    let result = gap_fill(&[&a, &b], dir.path().join("out.tif"));
    assert!(matches!(result, Err(GapFillError::NoValidData { inputs: 2 })));
}

#[test]
fn test_shape_mismatch_propagates() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let a = write_raster(dir.path(), "a.tif", vec![ND; (W * H) as usize]);
    let b = dir.path().join("b.tif");
    Raster::filled(W + 1, H, 1.0)
        .with_nodata(ND)
        .write(&b)
        .expect("Failed to write raster");

    let result = gap_fill(&[&a, &b], dir.path().join("out.tif"));
    assert!(matches!(
        result,
        Err(GapFillError::Raster(RasterError::ShapeMismatch { .. }))
    ));
}

#[test]
fn test_missing_input_propagates() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let result = gap_fill(&[dir.path().join("absent.tif")], dir.path().join("out.tif"));
    assert!(matches!(result, Err(GapFillError::Raster(RasterError::Io { .. }))));
}
