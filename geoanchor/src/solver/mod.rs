//! Correspondence solver
//!
//! Estimates the projective transform taking source-image pixels to mosaic
//! pixels from user-picked point pairs.
//!
//! - Exactly 4 pairs: the unique perspective transform through them.
//! - More than 4 pairs: RANSAC with a 5 px inlier threshold, refined by a
//!   normalized least-squares DLT over the inliers.
//!
//! # Example
//!
//! ```
//! use geoanchor::solver::solve_transform;
//!
//! let src = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)];
//! let dst = [(10.0, 20.0), (210.0, 20.0), (210.0, 220.0), (10.0, 220.0)];
//!
//! let h = solve_transform(&src, &dst).unwrap();
//! let (x, y) = h.project(50.0, 50.0);
//! assert!((x - 110.0).abs() < 1e-9 && (y - 120.0).abs() < 1e-9);
//! ```

mod perspective;
mod ransac;

pub use ransac::{RansacConfig, DEFAULT_INLIER_THRESHOLD};

use thiserror::Error;

/// Minimum number of point pairs for a projective transform.
pub const MIN_POINTS: usize = 4;

/// Relative tolerance below which a determinant counts as zero.
const SINGULAR_EPS: f64 = 1e-12;

/// A point in pixel coordinates.
pub type PixelPoint = (f64, f64);

/// Errors from transform estimation and inversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The two point lists have different lengths.
    #[error("Point count mismatch: {source_points} source vs {mosaic_points} mosaic points")]
    CountMismatch {
        source_points: usize,
        mosaic_points: usize,
    },

    /// Fewer than four pairs were supplied.
    #[error("Need at least 4 point pairs, got {0}")]
    InsufficientPoints(usize),

    /// A coordinate is NaN or infinite.
    #[error("Point pair {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },

    /// The points do not determine a transform (e.g. three are collinear),
    /// or the transform is not invertible.
    #[error("Degenerate point configuration or singular transform")]
    Degenerate,

    /// No model with at least four inliers was found.
    #[error("No consensus transform found for {points} point pairs")]
    NoConsensus { points: usize },
}

/// A 3×3 projective transform on homogeneous 2D coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    data: [[f64; 3]; 3],
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            data: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Creates a transform from row-major entries.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self { data: rows }
    }

    /// Row-major entries.
    pub fn as_rows(&self) -> [[f64; 3]; 3] {
        self.data
    }

    /// Maps a point through the transform.
    ///
    /// Points mapped to infinity come back as non-finite values.
    #[inline]
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let h = &self.data;
        let xx = h[0][0] * x + h[0][1] * y + h[0][2];
        let yy = h[1][0] * x + h[1][1] * y + h[1][2];
        let zz = h[2][0] * x + h[2][1] * y + h[2][2];
        (xx / zz, yy / zz)
    }

    /// The inverse transform, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let m = &self.data;
        let det = self.determinant();

        let scale = m.iter().flatten().fold(0.0f64, |acc, v| acc.max(v.abs()));
        if !det.is_finite() || scale == 0.0 || det.abs() <= SINGULAR_EPS * scale.powi(3) {
            return None;
        }

        let inv_det = 1.0 / det;
        let mut inv = [[0.0f64; 3]; 3];

        inv[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
        inv[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
        inv[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
        inv[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
        inv[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
        inv[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
        inv[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
        inv[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
        inv[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;

        Some(Self { data: inv }.normalized())
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.data;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// `self ∘ other`: applies `other` first.
    pub fn compose(&self, other: &Homography) -> Self {
        let mut out = [[0.0f64; 3]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.data[r][k] * other.data[k][c]).sum();
            }
        }
        Self { data: out }
    }

    /// Scales the matrix so the bottom-right entry is 1, when it is nonzero.
    pub fn normalized(&self) -> Self {
        let h22 = self.data[2][2];
        if h22.abs() < f64::EPSILON || !h22.is_finite() {
            return *self;
        }
        let mut data = self.data;
        for v in data.iter_mut().flatten() {
            *v /= h22;
        }
        Self { data }
    }

    /// Reprojection distance of a pair under this transform.
    pub fn reprojection_error(&self, src: PixelPoint, dst: PixelPoint) -> f64 {
        let (x, y) = self.project(src.0, src.1);
        let err = ((x - dst.0).powi(2) + (y - dst.1).powi(2)).sqrt();
        if err.is_finite() {
            err
        } else {
            f64::INFINITY
        }
    }

    fn is_finite(&self) -> bool {
        self.data.iter().flatten().all(|v| v.is_finite())
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

/// Which estimation strategy produced a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStrategy {
    /// Exact perspective transform through four pairs
    Exact,
    /// RANSAC followed by least-squares refinement
    Ransac,
}

/// A transform together with fit diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub homography: Homography,
    pub strategy: SolveStrategy,
    /// `true` for pairs within the inlier threshold
    pub inliers: Vec<bool>,
    /// Per-pair reprojection error in mosaic pixels
    pub residuals: Vec<f64>,
    /// Root-mean-square reprojection error over the inliers
    pub rms_error: f64,
    /// RANSAC iterations run (zero for the exact solve)
    pub iterations: usize,
}

impl SolveReport {
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&inlier| inlier).count()
    }
}

/// Estimates the transform mapping `src` pixels onto `dst` pixels.
///
/// # Errors
///
/// Checked in order: `CountMismatch`, `InsufficientPoints`,
/// `NonFinitePoint`. Then `Degenerate` (four pairs) or `NoConsensus`
/// (more than four) if estimation fails.
pub fn solve_transform(
    src: &[PixelPoint],
    dst: &[PixelPoint],
) -> Result<Homography, GeometryError> {
    solve_transform_with(src, dst, &RansacConfig::default())
}

/// Like [`solve_transform`] with explicit RANSAC settings.
pub fn solve_transform_with(
    src: &[PixelPoint],
    dst: &[PixelPoint],
    config: &RansacConfig,
) -> Result<Homography, GeometryError> {
    solve_transform_detailed(src, dst, config).map(|report| report.homography)
}

/// Like [`solve_transform_with`], also returning fit diagnostics.
pub fn solve_transform_detailed(
    src: &[PixelPoint],
    dst: &[PixelPoint],
    config: &RansacConfig,
) -> Result<SolveReport, GeometryError> {
    validate(src, dst)?;

    let (homography, strategy, iterations) = if src.len() == MIN_POINTS {
        let h = perspective::four_point(src, dst).ok_or(GeometryError::Degenerate)?;
        (h, SolveStrategy::Exact, 0)
    } else {
        let fit = ransac::estimate(src, dst, config)?;
        (fit.homography, SolveStrategy::Ransac, fit.iterations)
    };

    let threshold = match strategy {
        SolveStrategy::Exact => f64::INFINITY,
        SolveStrategy::Ransac => config.inlier_threshold,
    };
    let residuals: Vec<f64> = src
        .iter()
        .zip(dst)
        .map(|(&s, &d)| homography.reprojection_error(s, d))
        .collect();
    let inliers: Vec<bool> = residuals.iter().map(|&r| r <= threshold).collect();

    let (sum_sq, count) = residuals
        .iter()
        .zip(&inliers)
        .filter(|(_, &inlier)| inlier)
        .fold((0.0, 0usize), |(sum, n), (r, _)| (sum + r * r, n + 1));
    let rms_error = if count > 0 {
        (sum_sq / count as f64).sqrt()
    } else {
        0.0
    };

    let report = SolveReport {
        homography,
        strategy,
        inliers,
        residuals,
        rms_error,
        iterations,
    };

    tracing::debug!(
        points = src.len(),
        inliers = report.inlier_count(),
        rms_error = report.rms_error,
        strategy = ?report.strategy,
        "Solved transform"
    );

    Ok(report)
}

fn validate(src: &[PixelPoint], dst: &[PixelPoint]) -> Result<(), GeometryError> {
    if src.len() != dst.len() {
        return Err(GeometryError::CountMismatch {
            source_points: src.len(),
            mosaic_points: dst.len(),
        });
    }
    if src.len() < MIN_POINTS {
        return Err(GeometryError::InsufficientPoints(src.len()));
    }
    let finite = |p: &PixelPoint| p.0.is_finite() && p.1.is_finite();
    if let Some(index) = src.iter().zip(dst).position(|(s, d)| !(finite(s) && finite(d))) {
        return Err(GeometryError::NonFinitePoint { index });
    }
    Ok(())
}
