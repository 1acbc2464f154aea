//! RANSAC homography estimation.
//!
//! 1. Sample four pairs and fit the exact transform through them
//! 2. Count pairs whose reprojection error is within the threshold
//! 3. Keep the model with the most inliers
//! 4. Refit by least squares on the inliers
//!
//! When every 4-subset fits in the iteration budget, all of them are scored
//! instead of sampled. Equal inlier counts are broken by the least distorted
//! model, then by lower error: with five pairs and one outlier, the fit
//! through the outlier also explains four pairs exactly.

use std::cmp::Ordering;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::perspective;
use super::{GeometryError, Homography, PixelPoint, MIN_POINTS};

/// Inlier distance threshold in mosaic pixels.
pub const DEFAULT_INLIER_THRESHOLD: f64 = 5.0;

/// Lower bound for the adaptive iteration count when sampling randomly.
const MIN_SAMPLED_ITERATIONS: usize = 200;

/// RANSAC configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacConfig {
    /// Inlier distance threshold in pixels.
    pub inlier_threshold: f64,
    /// Maximum iterations.
    pub max_iterations: usize,
    /// Target confidence for early termination.
    pub confidence: f64,
    /// Random seed; the same seed and input always give the same result.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            inlier_threshold: DEFAULT_INLIER_THRESHOLD,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 0,
        }
    }
}

impl RansacConfig {
    pub fn with_inlier_threshold(mut self, threshold: f64) -> Self {
        self.inlier_threshold = threshold;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A RANSAC fit.
#[derive(Debug, Clone)]
pub(super) struct RansacFit {
    pub homography: Homography,
    pub iterations: usize,
}

/// Runs RANSAC over the pairs. Inputs are already validated.
pub(super) fn estimate(
    src: &[PixelPoint],
    dst: &[PixelPoint],
    config: &RansacConfig,
) -> Result<RansacFit, GeometryError> {
    let n = src.len();
    let no_consensus = GeometryError::NoConsensus { points: n };

    let subsets = subset_count(n, MIN_POINTS);
    let exhaustive = subsets <= config.max_iterations;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut subset: Vec<usize> = (0..MIN_POINTS).collect();
    let mut sample = Vec::with_capacity(MIN_POINTS);
    let mut sample_src = Vec::with_capacity(MIN_POINTS);
    let mut sample_dst = Vec::with_capacity(MIN_POINTS);

    let mut best: Option<(Homography, Score)> = None;
    let mut max_iterations = if exhaustive {
        subsets
    } else {
        config.max_iterations
    };
    let floor = config.max_iterations.min(MIN_SAMPLED_ITERATIONS);
    let mut iterations = 0;

    while iterations < max_iterations {
        if exhaustive {
            if iterations > 0 && !next_subset(&mut subset, n) {
                break;
            }
            sample.clone_from(&subset);
        } else {
            random_sample_into(&mut rng, n, MIN_POINTS, &mut sample);
        }
        iterations += 1;

        sample_src.clear();
        sample_dst.clear();
        for &i in &sample {
            sample_src.push(src[i]);
            sample_dst.push(dst[i]);
        }

        let Some(candidate) = perspective::four_point(&sample_src, &sample_dst) else {
            continue;
        };

        let score = Score::of(&candidate, src, dst, config.inlier_threshold);
        if best.as_ref().map_or(true, |(_, b)| score.beats(b)) {
            let ratio = score.inliers as f64 / n as f64;
            best = Some((candidate, score));

            if !exhaustive {
                let needed = adaptive_iterations(ratio, MIN_POINTS, config.confidence);
                max_iterations = max_iterations.min(needed.max(floor));
            }
        }
    }

    let (model, score) = best.ok_or(no_consensus.clone())?;
    if score.inliers < MIN_POINTS {
        return Err(no_consensus);
    }

    let inlier_mask = inlier_mask(&model, src, dst, config.inlier_threshold);
    let (inlier_src, inlier_dst): (Vec<PixelPoint>, Vec<PixelPoint>) = src
        .iter()
        .zip(dst)
        .zip(&inlier_mask)
        .filter(|(_, &inlier)| inlier)
        .map(|((&s, &d), _)| (s, d))
        .unzip();

    // Keep the minimal model if refitting loses inliers
    let homography = match perspective::least_squares(&inlier_src, &inlier_dst) {
        Some(refined)
            if Score::of(&refined, src, dst, config.inlier_threshold).inliers
                >= score.inliers =>
        {
            refined
        }
        _ => model,
    };

    tracing::trace!(
        iterations,
        inliers = score.inliers,
        points = n,
        "RANSAC finished"
    );

    Ok(RansacFit {
        homography,
        iterations,
    })
}

/// Inlier count, distortion and summed squared error of the inliers.
#[derive(Debug, Clone, Copy)]
struct Score {
    inliers: usize,
    distortion: f64,
    error: f64,
}

impl Score {
    fn of(h: &Homography, src: &[PixelPoint], dst: &[PixelPoint], threshold: f64) -> Self {
        let mut score = Score {
            inliers: 0,
            distortion: distortion(h, src),
            error: 0.0,
        };
        for (&s, &d) in src.iter().zip(dst) {
            let err = h.reprojection_error(s, d);
            if err <= threshold {
                score.inliers += 1;
                score.error += err * err;
            }
        }
        score
    }

    fn beats(&self, other: &Score) -> bool {
        match self.inliers.cmp(&other.inliers) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match self.distortion.partial_cmp(&other.distortion) {
                Some(Ordering::Less) => true,
                Some(Ordering::Greater) => false,
                _ => self.error < other.error,
            },
        }
    }
}

/// Ratio of the largest to the smallest local area scale of `h` over
/// `points`; infinite when the transform folds between them.
///
/// The local area scale of a homography at `p` is `det(H) / w(p)^3`.
fn distortion(h: &Homography, points: &[PixelPoint]) -> f64 {
    let det = h.determinant();
    let rows = h.as_rows();

    let mut smallest = f64::INFINITY;
    let mut largest = 0.0f64;
    let mut sign = 0.0f64;
    for &(x, y) in points {
        let w = rows[2][0] * x + rows[2][1] * y + rows[2][2];
        let scale = det / (w * w * w);
        if !scale.is_finite() || scale == 0.0 {
            return f64::INFINITY;
        }
        if sign == 0.0 {
            sign = scale.signum();
        } else if scale.signum() != sign {
            return f64::INFINITY;
        }
        smallest = smallest.min(scale.abs());
        largest = largest.max(scale.abs());
    }

    if points.is_empty() {
        1.0
    } else {
        largest / smallest
    }
}

fn inlier_mask(h: &Homography, src: &[PixelPoint], dst: &[PixelPoint], threshold: f64) -> Vec<bool> {
    src.iter()
        .zip(dst)
        .map(|(&s, &d)| h.reprojection_error(s, d) <= threshold)
        .collect()
}

/// Number of `k`-subsets of `n` items, saturating at `usize::MAX`.
fn subset_count(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let mut count: u128 = 1;
    for i in 0..k {
        count = count * (n - i) as u128 / (i + 1) as u128;
        if count > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    count as usize
}

/// Advances `indices` to the next subset of `0..n` in lexicographic order.
///
/// Returns `false` once the last subset has been visited.
fn next_subset(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();
    for i in (0..k).rev() {
        if indices[i] < n - k + i {
            indices[i] += 1;
            for j in i + 1..k {
                indices[j] = indices[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

/// Randomly samples `k` distinct indices from `0..n` into `buffer`.
fn random_sample_into<R: Rng>(rng: &mut R, n: usize, k: usize, buffer: &mut Vec<usize>) {
    debug_assert!(k <= n, "Cannot sample {} indices from {}", k, n);
    buffer.clear();

    if k <= n / 2 {
        // Floyd's algorithm
        for j in (n - k)..n {
            let t = rng.random_range(0..=j);
            if buffer.contains(&t) {
                buffer.push(j);
            } else {
                buffer.push(t);
            }
        }
    } else {
        buffer.extend(0..n);
        buffer.shuffle(rng);
        buffer.truncate(k);
    }
}

/// Iterations needed to draw an all-inlier sample with the given confidence.
fn adaptive_iterations(inlier_ratio: f64, sample_size: usize, confidence: f64) -> usize {
    if inlier_ratio <= 0.0 {
        return usize::MAX;
    }
    if inlier_ratio >= 1.0 {
        return 1;
    }

    let w_n = inlier_ratio.powi(sample_size as i32);
    let log_outlier = (1.0 - w_n).ln();
    if log_outlier >= 0.0 {
        return usize::MAX;
    }

    let iterations = ((1.0 - confidence).ln() / log_outlier).ceil();
    if iterations.is_finite() && iterations >= 0.0 {
        iterations as usize
    } else {
        usize::MAX
    }
}
