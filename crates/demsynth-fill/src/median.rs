//! Square-window median filter.

/// Window size used by the gap-fill engine.
pub const DEFAULT_MEDIAN_SIZE: usize = 5;

/// How the median window samples beyond the raster edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeMode {
    /// Mirror the raster about its edge (`d c b a | a b c d`).
    #[default]
    Reflect,
    /// Treat cells outside the raster as zero.
    Zero,
}

/// Mirror index `i` into `0..n` (half-sample symmetric).
fn reflect(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * n as isize;
    let wrapped = i.rem_euclid(period);
    if wrapped >= n as isize {
        (period - 1 - wrapped) as usize
    } else {
        wrapped as usize
    }
}

/// Median of a `size` x `size` window centred on every cell.
///
/// `size` must be odd; a size of 1 returns the input unchanged.
///
/// # Panics
/// Panics if `data.len() != width * height` or `size` is even.
pub fn median_filter(data: &[f32], width: usize, height: usize, size: usize, edge: EdgeMode) -> Vec<f32> {
    assert_eq!(data.len(), width * height, "median_filter: buffer size mismatch");
    assert!(size % 2 == 1, "median_filter: window size must be odd");
    if size == 1 {
        return data.to_vec();
    }

    let radius = (size / 2) as isize;
    let middle = size * size / 2;
    let mut window = Vec::with_capacity(size * size);
    let mut out = vec![0.0f32; data.len()];

    for y in 0..height as isize {
        for x in 0..width as isize {
            window.clear();
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let (sy, sx) = (y + dy, x + dx);
                    let value = match edge {
                        EdgeMode::Reflect => data[reflect(sy, height) * width + reflect(sx, width)],
                        EdgeMode::Zero => {
                            if sy < 0 || sx < 0 || sy >= height as isize || sx >= width as isize {
                                0.0
                            } else {
                                data[sy as usize * width + sx as usize]
                            }
                        }
                    };
                    window.push(value);
                }
            }
            let (_, median, _) = window.select_nth_unstable_by(middle, f32::total_cmp);
            out[y as usize * width + x as usize] = *median;
        }
    }

    out
}
