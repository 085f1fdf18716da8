//! GeoTIFF write/read tests against real files in a scratch directory.

use approx::assert_relative_eq;
use demsynth_raster::{GeoTemplate, Raster, RasterError};

#[test]
fn test_written_raster_keeps_grid_and_nodata() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("dtm_r0.56.idw.tif");

    let template = GeoTemplate::from_origin(576_000.0, 4_412_000.0, 0.1);
    let data: Vec<f32> = (0..30).map(|i| 100.0 + i as f32 * 0.25).collect();
    let mut raster = Raster::new(6, 5, data.clone())
        .expect("Failed to build raster")
        .with_nodata(-9999.0)
        .with_template(template.clone());
    raster.write_to(&path).expect("Failed to write raster");
    assert_eq!(raster.path(), Some(path.as_path()));

    let loaded = Raster::from_file(&path).expect("Failed to read raster");
    assert_eq!(loaded.dimensions(), (6, 5));
    assert_eq!(loaded.nodata(), Some(-9999.0));
    assert_eq!(loaded.template().pixel_scale, template.pixel_scale);
    assert_eq!(loaded.template().tiepoints, template.tiepoints);
    assert_eq!(loaded.template().geo_keys, template.geo_keys);
    for (a, b) in loaded.data().iter().zip(&data) {
        assert_relative_eq!(*a, *b);
    }
}

#[test]
fn test_create_from_template_written_to_new_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let source_path = dir.path().join("source.tif");
    let output_path = dir.path().join("derived.tif");

    let source = Raster::filled(3, 3, 7.0)
        .with_nodata(-32767.0)
        .with_template(GeoTemplate::from_origin(1.0, 2.0, 3.0));
    source.write(&source_path).expect("Failed to write source");

    let reopened = Raster::from_file(&source_path).expect("Failed to read source");
    let derived = reopened
        .create_from(vec![1.0; 9])
        .expect("Failed to create from template");
    derived.write(&output_path).expect("Failed to write derived");

    let loaded = Raster::from_file(&output_path).expect("Failed to read derived");
    assert_eq!(loaded.nodata(), Some(-32767.0));
    assert_eq!(loaded.template().origin(), Some((1.0, 2.0)));
    assert!(loaded.data().iter().all(|&v| v == 1.0));
}

#[test]
fn test_missing_file_reports_path() {
    let err = Raster::from_file("/nonexistent/dsm_r0.56.max.tif").unwrap_err();
    match err {
        RasterError::Io { path, .. } => {
            assert!(path.ends_with("dsm_r0.56.max.tif"));
        }
        other => panic!("Expected Io error, got {:?}", other),
    }
}
