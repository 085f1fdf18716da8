//! Nearest-valid-cell propagation via an exact Euclidean distance transform.
//!
//! Uses the separable lower-envelope-of-parabolas transform of Felzenszwalb
//! and Huttenlocher, tracking the argmin of each 1-D pass so that every cell
//! learns the coordinates of its nearest feature, not just the distance.

use demsynth_raster::is_nodata;

/// Lower envelope of the parabolas `(q - p)^2 + f[p]` over the finite sites `p`.
#[derive(Debug, Default)]
struct Envelope {
    /// Sites whose parabola is part of the envelope, left to right.
    sites: Vec<usize>,
    /// Left boundary of each site's segment.
    bounds: Vec<f64>,
}

impl Envelope {
    /// Squared distance and nearest site for every position of `f`.
    ///
    /// Infinite entries of `f` are not sites. With no site at all every
    /// output is `INFINITY` / `usize::MAX`.
    fn transform(&mut self, f: &[f64], dist: &mut [f64], arg: &mut [usize]) {
        self.sites.clear();
        self.bounds.clear();

        for q in (0..f.len()).filter(|&q| f[q].is_finite()) {
            let mut s = f64::NEG_INFINITY;
            while let (Some(&p), Some(&bound)) = (self.sites.last(), self.bounds.last()) {
                s = intersection(f, p, q);
                if s <= bound {
                    self.sites.pop();
                    self.bounds.pop();
                } else {
                    break;
                }
            }
            if self.sites.is_empty() {
                s = f64::NEG_INFINITY;
            }
            self.sites.push(q);
            self.bounds.push(s);
        }

        if self.sites.is_empty() {
            dist.fill(f64::INFINITY);
            arg.fill(usize::MAX);
            return;
        }

        let mut k = 0;
        for q in 0..f.len() {
            while k + 1 < self.sites.len() && self.bounds[k + 1] < q as f64 {
                k += 1;
            }
            let p = self.sites[k];
            let offset = q as f64 - p as f64;
            dist[q] = offset * offset + f[p];
            arg[q] = p;
        }
    }
}

/// Position where the parabolas rooted at `p` and `q` (`p < q`) intersect.
fn intersection(f: &[f64], p: usize, q: usize) -> f64 {
    let (pf, qf) = (p as f64, q as f64);
    ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
}

/// For every cell, the flat index of the nearest cell where `invalid` is false.
///
/// Valid cells map to themselves. Returns `None` when no cell is valid.
///
/// # Panics
/// Panics if `invalid.len() != width * height`.
pub fn nearest_valid(invalid: &[bool], width: usize, height: usize) -> Option<Vec<usize>> {
    assert_eq!(invalid.len(), width * height, "nearest_valid: mask size mismatch");
    if invalid.iter().all(|&b| b) {
        return None;
    }

    let mut envelope = Envelope::default();
    let longest = width.max(height);
    let mut f = vec![0.0; longest];
    let mut dist = vec![0.0; longest];
    let mut arg = vec![0usize; longest];

    // Pass 1: down each column, nearest valid row in that column
    let mut column_dist = vec![f64::INFINITY; width * height];
    let mut column_row = vec![usize::MAX; width * height];
    for x in 0..width {
        for y in 0..height {
            f[y] = if invalid[y * width + x] { f64::INFINITY } else { 0.0 };
        }
        envelope.transform(&f[..height], &mut dist[..height], &mut arg[..height]);
        for y in 0..height {
            column_dist[y * width + x] = dist[y];
            column_row[y * width + x] = arg[y];
        }
    }

    // Pass 2: along each row, combining the column distances
    let mut nearest = vec![0usize; width * height];
    for y in 0..height {
        let row = y * width;
        envelope.transform(
            &column_dist[row..row + width],
            &mut dist[..width],
            &mut arg[..width],
        );
        for x in 0..width {
            let source_col = arg[x];
            let source_row = column_row[row + source_col];
            nearest[row + x] = source_row * width + source_col;
        }
    }

    Some(nearest)
}

/// Replace every nodata cell with the value of its nearest valid cell.
///
/// Returns the number of cells filled, or `None` if the raster has nodata
/// cells but not a single valid one.
pub fn fill_nearest(data: &mut [f32], width: usize, height: usize, nodata: f32) -> Option<usize> {
    let invalid: Vec<bool> = data.iter().map(|&v| is_nodata(v, nodata)).collect();
    let holes = invalid.iter().filter(|&&b| b).count();
    if holes == 0 {
        return Some(0);
    }

    let nearest = nearest_valid(&invalid, width, height)?;
    for (idx, &hole) in invalid.iter().enumerate() {
        if hole {
            data[idx] = data[nearest[idx]];
        }
    }
    Some(holes)
}
