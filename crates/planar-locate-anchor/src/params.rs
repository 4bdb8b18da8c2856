use planar_locate_core::{GeometryLimits, InlierPolicy, RansacParams};
use planar_locate_features::OrbParams;
use serde::{Deserialize, Serialize};

/// Configuration for [`crate::AnchorMatcher`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorMatchParams {
    /// Lowe ratio: keep a match only when `best < ratio_threshold * second_best`.
    pub ratio_threshold: f32,
    /// Matches surviving the ratio test needed before estimating a homography.
    pub min_matches: usize,
    /// Keypoints each image must yield.
    pub min_keypoints: usize,
    pub ransac: RansacParams,
    pub inliers: InlierPolicy,
    pub geometry: GeometryLimits,
    /// Settings of the built-in ORB extractor; unused with a custom oracle.
    pub orb: OrbParams,
}

impl Default for AnchorMatchParams {
    fn default() -> Self {
        Self {
            ratio_threshold: 0.75,
            min_matches: 10,
            min_keypoints: 4,
            ransac: RansacParams::default(),
            inliers: InlierPolicy::default(),
            geometry: GeometryLimits::default(),
            orb: OrbParams::default(),
        }
    }
}
