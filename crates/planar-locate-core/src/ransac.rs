//! Robust homography estimation by random-sample consensus.
//!
//! Minimal 4-point hypotheses are drawn from a seeded generator, so identical
//! input and parameters always produce identical output. Whether a fit is
//! *confident* is a separate question answered by [`InlierPolicy`].

use log::debug;
use nalgebra::Point2;
use rand::prelude::IndexedRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    estimate_homography, homography_from_4pt, Homography, HomographyError, PointCorrespondence,
};

const MIN_SAMPLES: usize = 4;

/// Parameters of the RANSAC loop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Upper bound on sampled hypotheses.
    pub max_iters: usize,
    /// Maximum transfer error, in target pixels, for a correspondence to count as an inlier.
    pub reprojection_threshold: f64,
    /// Probability of drawing at least one all-inlier sample; drives early termination.
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            reprojection_threshold: 5.0,
            confidence: 0.995,
            seed: 1_234_567,
        }
    }
}

/// Acceptance rule for a RANSAC fit: enough inliers in absolute terms and
/// relative to the number of correspondences.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlierPolicy {
    pub min_inliers: usize,
    pub min_inlier_ratio: f64,
}

impl Default for InlierPolicy {
    fn default() -> Self {
        Self {
            min_inliers: 10,
            min_inlier_ratio: 0.3,
        }
    }
}

impl InlierPolicy {
    pub fn accepts(&self, inliers: usize, total: usize) -> bool {
        inliers >= self.min_inliers && inliers as f64 >= self.min_inlier_ratio * total as f64
    }
}

/// Best hypothesis found by [`estimate_homography_ransac`].
#[derive(Clone, Debug, PartialEq)]
pub struct HomographyFit {
    pub homography: Homography,
    /// Indices into the input correspondences, ascending.
    pub inliers: Vec<usize>,
    pub iterations: usize,
}

impl HomographyFit {
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }
}

fn collinear(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> bool {
    let (abx, aby) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let (acx, acy) = ((c.x - a.x) as f64, (c.y - a.y) as f64);
    let norm = abx.hypot(aby) * acx.hypot(acy);
    if norm < 1e-12 {
        return true;
    }
    // |sin| of the angle at `a`
    (abx * acy - aby * acx).abs() / norm < 1e-6
}

fn any_three_collinear(pts: &[Point2<f32>; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES
        .iter()
        .any(|t| collinear(pts[t[0]], pts[t[1]], pts[t[2]]))
}

// Number of iterations needed to hit `confidence` given the current inlier ratio.
fn required_iterations(confidence: f64, inlier_ratio: f64, max_iters: usize) -> usize {
    if !(0.0..1.0).contains(&confidence) || inlier_ratio <= 0.0 {
        return max_iters;
    }
    let denom = (1.0 - inlier_ratio.powi(MIN_SAMPLES as i32)).max(1e-12).ln();
    if denom >= 0.0 {
        return max_iters;
    }
    let n = ((1.0 - confidence).ln() / denom).ceil();
    if n.is_finite() && n >= 0.0 {
        (n as usize).clamp(1, max_iters)
    } else {
        max_iters
    }
}

fn collect_inliers(
    h: &Homography,
    correspondences: &[PointCorrespondence],
    threshold_sq: f64,
    out: &mut Vec<usize>,
) {
    out.clear();
    out.extend(
        correspondences
            .iter()
            .enumerate()
            .filter(|(_, c)| h.transfer_error_sq(c.source, c.target) <= threshold_sq)
            .map(|(i, _)| i),
    );
}

/// Fit `target ~ H * source` robustly.
///
/// The best 4-point hypothesis is re-estimated on all of its inliers; the
/// least-squares refit replaces it only when it stays well conditioned and
/// keeps at least as many inliers.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(n = correspondences.len()))
)]
pub fn estimate_homography_ransac(
    correspondences: &[PointCorrespondence],
    params: &RansacParams,
) -> Result<HomographyFit, HomographyError> {
    let n = correspondences.len();
    if n < MIN_SAMPLES {
        return Err(HomographyError::TooFewCorrespondences { got: n });
    }

    let threshold_sq = params.reprojection_threshold * params.reprojection_threshold;
    let all_indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(params.seed);

    let max_iters = params.max_iters.max(1);
    let mut budget = max_iters;
    let mut iterations = 0usize;

    let mut best: Option<(Homography, Vec<usize>)> = None;
    let mut scratch = Vec::with_capacity(n);

    while iterations < budget {
        iterations += 1;

        let mut src = [Point2::origin(); MIN_SAMPLES];
        let mut dst = [Point2::origin(); MIN_SAMPLES];
        for (k, &idx) in all_indices
            .choose_multiple(&mut rng, MIN_SAMPLES)
            .enumerate()
        {
            src[k] = correspondences[idx].source;
            dst[k] = correspondences[idx].target;
        }

        if any_three_collinear(&src) || any_three_collinear(&dst) {
            continue;
        }
        let Ok(h) = homography_from_4pt(&src, &dst) else {
            continue;
        };

        collect_inliers(&h, correspondences, threshold_sq, &mut scratch);
        let best_count = best.as_ref().map_or(0, |(_, inl)| inl.len());
        if scratch.len() > best_count {
            let ratio = scratch.len() as f64 / n as f64;
            budget = required_iterations(params.confidence, ratio, max_iters).max(iterations);
            best = Some((h, scratch.clone()));
        }
    }

    let Some((h, inliers)) = best else {
        debug!("ransac: no non-degenerate hypothesis in {iterations} iterations");
        return Err(HomographyError::Degenerate);
    };

    let (homography, inliers) = refine_on_inliers(correspondences, h, inliers, threshold_sq);
    debug!(
        "ransac: {} / {} inliers after {} iterations",
        inliers.len(),
        n,
        iterations
    );

    Ok(HomographyFit {
        homography,
        inliers,
        iterations,
    })
}

fn refine_on_inliers(
    correspondences: &[PointCorrespondence],
    h: Homography,
    inliers: Vec<usize>,
    threshold_sq: f64,
) -> (Homography, Vec<usize>) {
    if inliers.len() <= MIN_SAMPLES {
        return (h, inliers);
    }

    let (src, dst): (Vec<_>, Vec<_>) = inliers
        .iter()
        .map(|&i| (correspondences[i].source, correspondences[i].target))
        .unzip();

    match estimate_homography(&src, &dst) {
        Ok(refit) => {
            let mut refit_inliers = Vec::with_capacity(correspondences.len());
            collect_inliers(&refit, correspondences, threshold_sq, &mut refit_inliers);
            if refit_inliers.len() >= inliers.len() {
                (refit, refit_inliers)
            } else {
                (h, inliers)
            }
        }
        Err(err) => {
            debug!("ransac: inlier refit rejected ({err}), keeping minimal-sample model");
            (h, inliers)
        }
    }
}
