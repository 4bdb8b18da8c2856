use approx::assert_abs_diff_eq;
use nalgebra::{Matrix3, Point2, Point3, Vector3};
use planar_locate_core::{
    estimate_homography, estimate_homography_ransac, solve_planar_pose, CameraIntrinsics,
    CameraPose, GeometryValidator, Homography, HomographyError, InlierPolicy,
    PointCorrespondence, Quadrilateral, RansacParams,
};

fn perspective() -> Homography {
    Homography::new(Matrix3::new(
        0.7, -0.2, 210.0, //
        0.25, 0.8, 90.0, //
        0.0005, 0.0003, 1.0,
    ))
}

#[test]
fn projected_reference_rectangle_passes_validation() {
    let h = perspective();
    let (w, hgt) = (320.0_f32, 240.0_f32);

    let corr: Vec<PointCorrespondence> = (0..60)
        .map(|i| {
            let p = Point2::new((i % 10) as f32 * 31.0 + 4.0, (i / 10) as f32 * 37.0 + 9.0);
            PointCorrespondence::new(p, h.apply(p))
        })
        .collect();

    let fit = estimate_homography_ransac(&corr, &RansacParams::default()).expect("fit");
    assert!(InlierPolicy::default().accepts(fit.inlier_count(), corr.len()));

    let corners = [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(w, hgt),
        Point2::new(0.0, hgt),
    ]
    .map(|p| fit.homography.apply(p));
    let quad = Quadrilateral::new(corners);
    assert!(GeometryValidator::default().validate(&quad, w / hgt));
}

#[test]
fn round_trip_through_inverse() {
    let h = perspective();
    let inv = h.inverse().expect("invertible");
    for i in 0..25 {
        let p = Point2::new(i as f32 * 13.0 - 40.0, 200.0 - i as f32 * 9.0);
        let back = inv.apply(h.apply(p));
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-2);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-2);
    }
}

#[test]
fn fewer_than_four_points_echo_count() {
    for n in 0..4 {
        let pts = vec![Point2::new(1.0_f32, 2.0); n];
        assert_eq!(
            estimate_homography(&pts, &pts),
            Err(HomographyError::TooFewCorrespondences { got: n })
        );
        let corr = vec![PointCorrespondence::new(Point2::origin(), Point2::origin()); n];
        assert_eq!(
            estimate_homography_ransac(&corr, &RansacParams::default()),
            Err(HomographyError::TooFewCorrespondences { got: n })
        );
    }
}

#[test]
fn pose_reprojects_image_corners() {
    let k = CameraIntrinsics::from_focal(1000.0, 400.0, 300.0);
    let object = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(297.0, 0.0, 0.0),
        Point3::new(297.0, 210.0, 0.0),
        Point3::new(0.0, 210.0, 0.0),
    ];
    let truth = CameraPose::new(
        Vector3::new(-0.2, 0.15, 0.05),
        Vector3::new(-140.0, -100.0, 900.0),
    );
    // Exact projections disturbed by a fraction of a pixel.
    let image: Vec<Point2<f64>> = object
        .iter()
        .enumerate()
        .map(|(i, o)| {
            let p = truth.project(&k, o).expect("in front of camera");
            let jitter = if i % 2 == 0 { 0.3 } else { -0.3 };
            Point2::new(p.x + jitter, p.y - jitter)
        })
        .collect();
    let pose = solve_planar_pose(&object, &image, &k).expect("pose");
    for (o, i) in object.iter().zip(&image) {
        let p = pose.project(&k, o).expect("in front of camera");
        assert_abs_diff_eq!(p.x, i.x, epsilon = 1.0);
        assert_abs_diff_eq!(p.y, i.y, epsilon = 1.0);
    }
    assert!(pose.translation.z > 0.0);
}
