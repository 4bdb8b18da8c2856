use approx::assert_abs_diff_eq;
use nalgebra::Point2;
use planar_locate_anchor::{AnchorMatchParams, AnchorMatcher};
use planar_locate_core::{Detection, GrayImage, GrayImageView, PointCorrespondence, RejectReason};
use planar_locate_features::{
    Descriptor, DescriptorMatch, DescriptorMatcher, FeatureExtractor, Features, Keypoint,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn blocks_image(width: usize, height: usize, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = GrayImage::new(width, height);
    img.data.fill(128);
    for _ in 0..90 {
        let w = rng.random_range(8..40);
        let h = rng.random_range(8..40);
        let x0 = rng.random_range(0..width - w);
        let y0 = rng.random_range(0..height - h);
        let v: u8 = rng.random_range(0..=255);
        for y in y0..y0 + h {
            img.data[y * width + x0..y * width + x0 + w].fill(v);
        }
    }
    img
}

fn grid(cols: usize, rows: usize, w: f32, h: f32) -> Vec<Point2<f32>> {
    let mut pts = Vec::with_capacity(cols * rows);
    for r in 0..rows {
        for c in 0..cols {
            let x = w * (c as f32 + 0.5) / cols as f32;
            let y = h * (r as f32 + 0.5) / rows as f32;
            pts.push(Point2::new(x, y));
        }
    }
    pts
}

fn correspondences(
    src: &[Point2<f32>],
    map: impl Fn(Point2<f32>) -> Point2<f32>,
) -> Vec<PointCorrespondence> {
    src.iter()
        .map(|&p| PointCorrespondence::new(p, map(p)))
        .collect()
}

#[test]
fn identical_images_give_identity_pose() {
    let img = blocks_image(240, 180, 11);
    let view = img.view();
    let matcher = AnchorMatcher::default();

    let found = matcher
        .find_anchor(&view, &view)
        .found()
        .expect("anchor found in itself");

    assert_abs_diff_eq!(found.scale, 1.0, epsilon = 0.02);
    assert_abs_diff_eq!(found.rotation, 0.0, epsilon = 0.02);
    assert_abs_diff_eq!(found.center.x, 120.0, epsilon = 1.0);
    assert_abs_diff_eq!(found.center.y, 90.0, epsilon = 1.0);
    assert!(found.match_count >= 10);
    assert!(found.inlier_count as f32 >= 0.8 * found.match_count as f32);
}

#[test]
fn solid_anchor_has_no_keypoints() {
    let solid = vec![90u8; 160 * 120];
    let anchor = GrayImageView::new(160, 120, &solid).unwrap();
    let scene_img = blocks_image(240, 180, 3);

    let result = AnchorMatcher::default().find_anchor(&anchor, &scene_img.view());

    let rejection = result.rejection().expect("rejected");
    assert_eq!(rejection.reason, RejectReason::TooFewKeypoints);
    assert_eq!(rejection.match_count, 0);
}

#[test]
fn rotated_and_scaled_view_from_points() {
    // (x, y) -> 2 * (-y, x) + (400, 50): quarter turn clockwise on screen, doubled.
    let src = grid(6, 4, 200.0, 100.0);
    let corr = correspondences(&src, |p| Point2::new(400.0 - 2.0 * p.y, 50.0 + 2.0 * p.x));

    let found = AnchorMatcher::default()
        .find_anchor_from_correspondences(&corr, 200.0, 100.0)
        .found()
        .expect("found");

    assert_abs_diff_eq!(found.rotation, std::f32::consts::FRAC_PI_2, epsilon = 1e-3);
    assert_abs_diff_eq!(found.scale, 2.0, epsilon = 1e-3);
    assert_abs_diff_eq!(found.center.x, 300.0, epsilon = 1e-2);
    assert_abs_diff_eq!(found.center.y, 250.0, epsilon = 1e-2);
    assert_eq!(found.inlier_count, 24);
    assert_eq!(found.match_count, 24);

    let tl = found.corners.corners[0];
    assert_abs_diff_eq!(tl.x, 400.0, epsilon = 1e-2);
    assert_abs_diff_eq!(tl.y, 50.0, epsilon = 1e-2);
}

#[test]
fn fewer_than_four_points_echo_count() {
    let src = grid(3, 1, 100.0, 100.0);
    let corr = correspondences(&src, |p| p);
    let result = AnchorMatcher::default().find_anchor_from_correspondences(&corr, 100.0, 100.0);
    let rejection = result.rejection().copied().expect("rejected");
    assert_eq!(rejection.reason, RejectReason::TooFewMatches);
    assert_eq!(rejection.match_count, 3);
}

#[test]
fn small_consistent_set_is_low_confidence() {
    let src = grid(4, 2, 100.0, 100.0);
    let corr = correspondences(&src, |p| Point2::new(p.x + 10.0, p.y + 20.0));
    let result = AnchorMatcher::default().find_anchor_from_correspondences(&corr, 100.0, 100.0);
    let rejection = result.rejection().copied().expect("rejected");
    assert_eq!(rejection.reason, RejectReason::LowConfidence);
    assert_eq!(rejection.match_count, 8);
}

#[test]
fn stretched_view_is_rejected_as_distorted() {
    let src = grid(5, 4, 100.0, 100.0);
    let corr = correspondences(&src, |p| Point2::new(5.0 * p.x, p.y));
    let result = AnchorMatcher::default().find_anchor_from_correspondences(&corr, 100.0, 100.0);
    assert_eq!(
        result.rejection().map(|r| r.reason),
        Some(RejectReason::AspectDistortion)
    );
}

/// Oracle returning canned features: anchor points on a grid, scene points
/// translated by (15, 25).
struct CannedExtractor {
    points: Vec<Point2<f32>>,
}

impl FeatureExtractor for CannedExtractor {
    fn detect_and_describe(&self, image: &GrayImageView<'_>) -> Features {
        let offset = if image.width == 100 { 0.0 } else { 1.0 };
        let keypoints = self
            .points
            .iter()
            .map(|p| Keypoint {
                position: Point2::new(p.x + 15.0 * offset, p.y + 25.0 * offset),
                angle: 0.0,
                response: 1.0,
                octave: 0,
                size: 31.0,
            })
            .collect::<Vec<_>>();
        let descriptors = (0..keypoints.len())
            .map(|i| [i as u8; 32])
            .collect::<Vec<Descriptor>>();
        Features {
            keypoints,
            descriptors,
        }
    }
}

/// Query `i` matches train `i`; only the first `distinctive` queries pass
/// the ratio test.
struct CannedMatcher {
    distinctive: usize,
}

impl DescriptorMatcher for CannedMatcher {
    fn knn_match(
        &self,
        query: &[Descriptor],
        _train: &[Descriptor],
        k: usize,
    ) -> Vec<Vec<DescriptorMatch>> {
        assert_eq!(k, 2);
        (0..query.len())
            .map(|i| {
                let second = if i < self.distinctive { 20 } else { 12 };
                vec![
                    DescriptorMatch {
                        query_idx: i,
                        train_idx: i,
                        distance: 10,
                    },
                    DescriptorMatch {
                        query_idx: i,
                        train_idx: (i + 1) % query.len(),
                        distance: second,
                    },
                ]
            })
            .collect()
    }
}

fn canned_images() -> (Vec<u8>, Vec<u8>) {
    (vec![0u8; 100 * 100], vec![0u8; 200 * 200])
}

#[test]
fn ratio_test_keeps_distinctive_matches_only() {
    let (a, s) = canned_images();
    let anchor = GrayImageView::new(100, 100, &a).unwrap();
    let scene = GrayImageView::new(200, 200, &s).unwrap();
    let matcher = AnchorMatcher::with_oracle(
        AnchorMatchParams::default(),
        CannedExtractor {
            points: grid(5, 4, 100.0, 100.0),
        },
        CannedMatcher { distinctive: 12 },
    );

    let found = matcher.find_anchor(&anchor, &scene).found().expect("found");
    assert_eq!(found.match_count, 12);
    assert_eq!(found.inlier_count, 12);
    assert_abs_diff_eq!(found.center.x, 65.0, epsilon = 1e-2);
    assert_abs_diff_eq!(found.center.y, 75.0, epsilon = 1e-2);
    assert_abs_diff_eq!(found.scale, 1.0, epsilon = 1e-3);
}

#[test]
fn too_few_ratio_matches_reports_count() {
    let (a, s) = canned_images();
    let anchor = GrayImageView::new(100, 100, &a).unwrap();
    let scene = GrayImageView::new(200, 200, &s).unwrap();
    let matcher = AnchorMatcher::with_oracle(
        AnchorMatchParams::default(),
        CannedExtractor {
            points: grid(5, 4, 100.0, 100.0),
        },
        CannedMatcher { distinctive: 9 },
    );

    let result = matcher.find_anchor(&anchor, &scene);
    assert!(matches!(
        result,
        Detection::NotFound(r) if r.reason == RejectReason::TooFewMatches && r.match_count == 9
    ));
}

#[test]
fn params_deserialize_with_defaults() {
    let params: AnchorMatchParams =
        serde_json::from_str(r#"{ "ratio_threshold": 0.8, "ransac": { "seed": 7 } }"#).unwrap();
    assert_eq!(params.ratio_threshold, 0.8);
    assert_eq!(params.ransac.seed, 7);
    assert_eq!(params.min_matches, 10);
    assert_eq!(params.ransac.max_iters, 2000);
}
