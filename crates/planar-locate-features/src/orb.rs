use log::debug;
use nalgebra::Point2;
use planar_locate_core::GrayImageView;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::brief::{intensity_centroid_angle, BriefPattern};
use crate::fast::{detect_corners, sort_by_response};
use crate::pyramid::{build_pyramid, smooth};
use crate::{FeatureExtractor, Features, Keypoint};

/// Parameters of [`OrbExtractor`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbParams {
    /// Upper bound on keypoints over all levels.
    pub max_features: usize,
    /// Ratio between consecutive pyramid levels, > 1.
    pub scale_factor: f32,
    pub levels: usize,
    /// Keypoints closer than this to a level's border are dropped.
    pub edge_threshold: usize,
    /// Diameter of the orientation/descriptor patch at level 0.
    pub patch_size: usize,
    /// FAST intensity threshold.
    pub fast_threshold: u8,
}

impl Default for OrbParams {
    fn default() -> Self {
        Self {
            max_features: 1000,
            scale_factor: 1.2,
            levels: 8,
            edge_threshold: 31,
            patch_size: 31,
            fast_threshold: 20,
        }
    }
}

/// Oriented FAST keypoints with steered BRIEF descriptors over a scale pyramid.
#[derive(Clone, Debug)]
pub struct OrbExtractor {
    params: OrbParams,
    pattern: BriefPattern,
}

impl Default for OrbExtractor {
    fn default() -> Self {
        Self::new(OrbParams::default())
    }
}

impl OrbExtractor {
    pub fn new(params: OrbParams) -> Self {
        Self {
            params,
            pattern: BriefPattern::new(),
        }
    }

    pub fn params(&self) -> &OrbParams {
        &self.params
    }

    // Geometric share of `max_features` per level, finer levels first.
    fn features_per_level(&self, levels: usize) -> Vec<usize> {
        let p = &self.params;
        let f = 1.0 / p.scale_factor.max(1.0 + f32::EPSILON);
        let mut out = Vec::with_capacity(levels);
        let mut desired = p.max_features as f32 * (1.0 - f) / (1.0 - f.powi(levels as i32));
        let mut assigned = 0usize;
        for level in 0..levels {
            let n = if level + 1 == levels {
                p.max_features.saturating_sub(assigned)
            } else {
                (desired.round() as usize).min(p.max_features - assigned)
            };
            assigned += n;
            out.push(n);
            desired *= f;
        }
        out
    }
}

impl FeatureExtractor for OrbExtractor {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(width = image.width, height = image.height))
    )]
    fn detect_and_describe(&self, image: &GrayImageView<'_>) -> Features {
        let p = &self.params;
        let half_patch = (p.patch_size / 2).max(1);
        let border = p
            .edge_threshold
            .max(half_patch + 1)
            .max(BriefPattern::reach() + 2);
        let pyramid = build_pyramid(image, p.levels.max(1), p.scale_factor, 2 * border + 1);
        let quota = self.features_per_level(pyramid.len());

        let mut features = Features::default();
        for (octave, (level, &n)) in pyramid.iter().zip(&quota).enumerate() {
            if n == 0 {
                continue;
            }
            let view = level.image.view();
            let mut corners = detect_corners(&view, p.fast_threshold, border);
            sort_by_response(&mut corners);
            corners.truncate(n);
            if corners.is_empty() {
                continue;
            }

            let smoothed = smooth(&view);
            let smoothed = smoothed.view();
            for c in &corners {
                let angle = intensity_centroid_angle(&view, c.x, c.y, half_patch as isize);
                let descriptor = self.pattern.describe(&smoothed, c.x, c.y, angle);
                features.keypoints.push(Keypoint {
                    position: Point2::new(c.x as f32 * level.scale, c.y as f32 * level.scale),
                    angle,
                    response: c.response,
                    octave: octave as u8,
                    size: p.patch_size as f32 * level.scale,
                });
                features.descriptors.push(descriptor);
            }
        }

        debug!(
            "orb: {} keypoints over {} levels ({}x{})",
            features.len(),
            pyramid.len(),
            image.width,
            image.height
        );
        features
    }
}
