use log::debug;
use nalgebra::Point2;
use planar_locate_core::{
    estimate_homography_ransac, Detection, GeometryValidator, GrayImageView, PointCorrespondence,
    Quadrilateral, RejectReason,
};
use planar_locate_features::{
    BruteForceMatcher, DescriptorMatcher, FeatureExtractor, Features, OrbExtractor,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{AnchorMatch, AnchorMatchParams};

/// Finds a reference image inside a scene.
///
/// Generic over the feature oracle; [`AnchorMatcher::new`] uses the built-in
/// ORB extractor and brute-force Hamming matcher.
pub struct AnchorMatcher<E = OrbExtractor, M = BruteForceMatcher> {
    params: AnchorMatchParams,
    extractor: E,
    matcher: M,
    validator: GeometryValidator,
}

impl AnchorMatcher {
    pub fn new(params: AnchorMatchParams) -> Self {
        Self::with_oracle(params, OrbExtractor::new(params.orb), BruteForceMatcher)
    }
}

impl Default for AnchorMatcher {
    fn default() -> Self {
        Self::new(AnchorMatchParams::default())
    }
}

impl<E: FeatureExtractor, M: DescriptorMatcher> AnchorMatcher<E, M> {
    pub fn with_oracle(params: AnchorMatchParams, extractor: E, matcher: M) -> Self {
        Self {
            params,
            extractor,
            matcher,
            validator: GeometryValidator::new(params.geometry),
        }
    }

    #[inline]
    pub fn params(&self) -> &AnchorMatchParams {
        &self.params
    }

    /// Locate `anchor` inside `scene`.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip_all,
            fields(
                anchor_w = anchor.width,
                anchor_h = anchor.height,
                scene_w = scene.width,
                scene_h = scene.height
            )
        )
    )]
    pub fn find_anchor(
        &self,
        anchor: &GrayImageView<'_>,
        scene: &GrayImageView<'_>,
    ) -> Detection<AnchorMatch> {
        let anchor_features = self.extractor.detect_and_describe(anchor);
        let scene_features = self.extractor.detect_and_describe(scene);
        if !self.has_enough_keypoints(&anchor_features) || !self.has_enough_keypoints(&scene_features)
        {
            debug!(
                "anchor: too few keypoints (anchor {}, scene {})",
                anchor_features.len(),
                scene_features.len()
            );
            return Detection::not_found(RejectReason::TooFewKeypoints, 0);
        }

        let correspondences = self.ratio_test_matches(&anchor_features, &scene_features);
        let match_count = correspondences.len();
        if match_count < self.params.min_matches {
            debug!(
                "anchor: {match_count} ratio-test matches, need {}",
                self.params.min_matches
            );
            return Detection::not_found(RejectReason::TooFewMatches, match_count);
        }

        self.locate(&correspondences, anchor.width as f32, anchor.height as f32)
    }

    /// Locate the anchor from externally computed matches, `source` in anchor
    /// pixels and `target` in scene pixels.
    ///
    /// Fewer than four correspondences are rejected with their count echoed.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, correspondences), fields(n = correspondences.len()))
    )]
    pub fn find_anchor_from_correspondences(
        &self,
        correspondences: &[PointCorrespondence],
        anchor_width: f32,
        anchor_height: f32,
    ) -> Detection<AnchorMatch> {
        if correspondences.len() < 4 {
            return Detection::not_found(RejectReason::TooFewMatches, correspondences.len());
        }
        self.locate(correspondences, anchor_width, anchor_height)
    }

    fn has_enough_keypoints(&self, f: &Features) -> bool {
        f.len() >= self.params.min_keypoints.max(1) && !f.descriptors.is_empty()
    }

    fn ratio_test_matches(&self, anchor: &Features, scene: &Features) -> Vec<PointCorrespondence> {
        let ratio = self.params.ratio_threshold;
        self.matcher
            .knn_match(&anchor.descriptors, &scene.descriptors, 2)
            .into_iter()
            .filter_map(|knn| match knn.as_slice() {
                [best, second] if (best.distance as f32) < ratio * second.distance as f32 => {
                    let source = anchor.keypoints.get(best.query_idx)?.position;
                    let target = scene.keypoints.get(best.train_idx)?.position;
                    Some(PointCorrespondence::new(source, target))
                }
                _ => None,
            })
            .collect()
    }

    fn locate(
        &self,
        correspondences: &[PointCorrespondence],
        width: f32,
        height: f32,
    ) -> Detection<AnchorMatch> {
        let match_count = correspondences.len();

        let fit = match estimate_homography_ransac(correspondences, &self.params.ransac) {
            Ok(fit) => fit,
            Err(err) => {
                debug!("anchor: homography estimation failed: {err}");
                return Detection::not_found(RejectReason::HomographyFailed, match_count);
            }
        };
        let inlier_count = fit.inlier_count();
        if !self.params.inliers.accepts(inlier_count, match_count) {
            debug!("anchor: low confidence, {inlier_count} inliers of {match_count}");
            return Detection::not_found(RejectReason::LowConfidence, match_count);
        }

        let h = fit.homography;
        let reference = [
            Point2::new(0.0, 0.0),
            Point2::new(width, 0.0),
            Point2::new(width, height),
            Point2::new(0.0, height),
        ];
        let mut corners = [Point2::origin(); 4];
        for (dst, src) in corners.iter_mut().zip(reference) {
            match h.try_apply(src) {
                Some(p) => *dst = p,
                None => {
                    debug!("anchor: corner {src:?} maps to infinity");
                    return Detection::not_found(RejectReason::HomographyFailed, match_count);
                }
            }
        }
        let quad = Quadrilateral::new(corners);

        if let Err(rejection) = self.validator.check(&quad, width / height) {
            debug!("anchor: {rejection}");
            return Detection::not_found(rejection.into(), match_count);
        }

        let [top, _, _, left] = quad.edge_lengths();
        Detection::Found(AnchorMatch {
            homography: h,
            corners: quad,
            center: quad.center(),
            rotation: quad.top_edge_angle(),
            scale: (top / width + left / height) * 0.5,
            inlier_count,
            match_count,
        })
    }
}
