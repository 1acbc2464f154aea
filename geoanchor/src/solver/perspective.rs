//! Direct homography estimation.
//!
//! Both solvers work on Hartley-normalized coordinates (centroid at the
//! origin, mean distance √2) and denormalize the result.

use nalgebra::{DMatrix, SVD};

use super::{Homography, PixelPoint};

/// Pivot magnitude below which the 8×8 system counts as singular.
const PIVOT_EPS: f64 = 1e-10;

/// Exact transform through four pairs.
///
/// Solves the 8×8 system obtained by fixing `h22 = 1` with Gaussian
/// elimination and partial pivoting. Returns `None` when three or more
/// points are collinear on either side.
pub(super) fn four_point(src: &[PixelPoint], dst: &[PixelPoint]) -> Option<Homography> {
    debug_assert_eq!(src.len(), 4);
    debug_assert_eq!(dst.len(), 4);

    let (src_n, src_t) = normalize_points(src)?;
    let (dst_n, dst_t) = normalize_points(dst)?;

    // Augmented 8×9 system [A | b]
    let mut a = [[0.0f64; 9]; 8];
    for i in 0..4 {
        let (x, y) = src_n[i];
        let (u, v) = dst_n[i];

        a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u, u];
        a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v, v];
    }

    for col in 0..8 {
        let (max_row, max_val) = (col..8)
            .map(|row| (row, a[row][col].abs()))
            .fold((col, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if max_val < PIVOT_EPS {
            return None;
        }
        if max_row != col {
            a.swap(col, max_row);
        }

        let pivot = a[col][col];
        for row in (col + 1)..8 {
            let factor = a[row][col] / pivot;
            for c in col..9 {
                a[row][c] -= factor * a[col][c];
            }
        }
    }

    let mut h = [0.0f64; 9];
    h[8] = 1.0;
    for row in (0..8).rev() {
        let mut sum = a[row][8];
        for c in (row + 1)..8 {
            sum -= a[row][c] * h[c];
        }
        h[row] = sum / a[row][row];
    }

    denormalize(h, &src_t, &dst_t)
}

/// Least-squares transform over any number (≥ 4) of pairs.
///
/// Minimises the algebraic DLT error: the solution is the right singular
/// vector of the smallest singular value of `AᵀA`.
pub(super) fn least_squares(src: &[PixelPoint], dst: &[PixelPoint]) -> Option<Homography> {
    if src.len() < 4 || src.len() != dst.len() {
        return None;
    }

    let (src_n, src_t) = normalize_points(src)?;
    let (dst_n, dst_t) = normalize_points(dst)?;

    let mut ata = [[0.0f64; 9]; 9];
    for (&(x, y), &(u, v)) in src_n.iter().zip(&dst_n) {
        let row1 = [-x, -y, -1.0, 0.0, 0.0, 0.0, x * u, y * u, u];
        let row2 = [0.0, 0.0, 0.0, -x, -y, -1.0, x * v, y * v, v];

        for j in 0..9 {
            for k in 0..9 {
                ata[j][k] += row1[j] * row1[k] + row2[j] * row2[k];
            }
        }
    }

    let data: Vec<f64> = ata.iter().flatten().copied().collect();
    let svd = SVD::new(DMatrix::from_row_slice(9, 9, &data), false, true);
    let v_t = svd.v_t?;
    let smallest = svd.singular_values.imin();

    let mut h = [0.0f64; 9];
    for (slot, &val) in h.iter_mut().zip(v_t.row(smallest).iter()) {
        *slot = val;
    }

    denormalize(h, &src_t, &dst_t)
}

/// Centers points on their centroid and scales the mean distance to √2.
///
/// Returns `None` if all points coincide.
fn normalize_points(points: &[PixelPoint]) -> Option<(Vec<PixelPoint>, Homography)> {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = points
        .iter()
        .map(|&(x, y)| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist.is_nan() || mean_dist <= 1e-10 {
        return None;
    }

    let scale = std::f64::consts::SQRT_2 / mean_dist;
    let normalized = points
        .iter()
        .map(|&(x, y)| ((x - cx) * scale, (y - cy) * scale))
        .collect();

    let t = Homography::from_rows([
        [scale, 0.0, -cx * scale],
        [0.0, scale, -cy * scale],
        [0.0, 0.0, 1.0],
    ]);
    Some((normalized, t))
}

/// `H = T_dst⁻¹ · H_n · T_src`, scaled so `h22 = 1`.
fn denormalize(h: [f64; 9], src_t: &Homography, dst_t: &Homography) -> Option<Homography> {
    let h_n = Homography::from_rows([[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], h[8]]]);
    let dst_inv = dst_t.inverse()?;
    let result = dst_inv.compose(&h_n).compose(src_t).normalized();

    if result.is_finite() && result.inverse().is_some() {
        Some(result)
    } else {
        None
    }
}
