//! Priority merge of a raster stack.

use demsynth_raster::is_nodata;

/// Fill the accumulator's nodata cells from `layer`, leaving valid cells untouched.
///
/// Cells that are nodata in `layer` itself (under `layer_nodata`) are skipped,
/// so a layer declaring a different sentinel never leaks it into the
/// accumulator. Returns the number of cells that became valid.
///
/// # Panics
/// Panics if the two buffers differ in length; callers check shapes first.
pub fn merge_layer(acc: &mut [f32], nodata: f32, layer: &[f32], layer_nodata: f32) -> usize {
    assert_eq!(acc.len(), layer.len(), "merge_layer: buffer length mismatch");

    let mut filled = 0;
    for (cell, &value) in acc.iter_mut().zip(layer) {
        if is_nodata(*cell, nodata) && !is_nodata(value, layer_nodata) {
            *cell = value;
            filled += 1;
        }
    }
    filled
}
