use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Planar projective transform, `dst ~ H * src`, normalized so `H[2,2] = 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HomographyError {
    #[error("need at least 4 correspondences, got {got}")]
    TooFewCorrespondences { got: usize },
    #[error("source and target point counts differ ({src} vs {dst})")]
    MismatchedLengths { src: usize, dst: usize },
    #[error("degenerate point configuration")]
    Degenerate,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    /// Build from 9 coefficients in row-major order.
    pub fn from_row_major(values: [f64; 9]) -> Self {
        Self::new(Matrix3::from_row_slice(&values))
    }

    /// Coefficients in row-major order, as exchanged over the C boundary.
    pub fn to_row_major(&self) -> [f64; 9] {
        let h = &self.h;
        [
            h[(0, 0)],
            h[(0, 1)],
            h[(0, 2)],
            h[(1, 0)],
            h[(1, 1)],
            h[(1, 2)],
            h[(2, 0)],
            h[(2, 1)],
            h[(2, 2)],
        ]
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    /// Map a point and return `None` when it lands on the line at infinity.
    #[inline]
    pub fn try_apply(&self, p: Point2<f32>) -> Option<Point2<f32>> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        if v[2].abs() < 1e-12 {
            return None;
        }
        let q = Point2::new((v[0] / v[2]) as f32, (v[1] / v[2]) as f32);
        (q.x.is_finite() && q.y.is_finite()).then_some(q)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// All entries finite and the matrix not singular.
    pub fn is_well_conditioned(&self) -> bool {
        self.h.iter().all(|v| v.is_finite()) && self.h.determinant().abs() > f64::EPSILON
    }

    /// Squared one-way transfer error `|H * src - dst|^2`, infinite when `src` maps to infinity.
    #[inline]
    pub fn transfer_error_sq(&self, src: Point2<f32>, dst: Point2<f32>) -> f64 {
        let v = self.h * Vector3::new(src.x as f64, src.y as f64, 1.0);
        if v[2].abs() < 1e-12 {
            return f64::INFINITY;
        }
        let dx = v[0] / v[2] - dst.x as f64;
        let dy = v[1] / v[2] - dst.y as f64;
        dx * dx + dy * dy
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

// Translate to the centroid and scale so the mean distance is sqrt(2).
fn normalize_points(pts: &[Point2<f32>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len() as f64;
    let (sx, sy) = pts
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = pts
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / n;

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn normalize_homography(h: Matrix3<f64>) -> Result<Matrix3<f64>, HomographyError> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || !s.is_finite() {
        return Err(HomographyError::Degenerate);
    }
    Ok(h / s)
}

fn denormalize_homography(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Result<Matrix3<f64>, HomographyError> {
    let t_dst_inv = t_dst.try_inverse().ok_or(HomographyError::Degenerate)?;
    normalize_homography(t_dst_inv * hn * t_src)
}

/// Direct linear estimate of `H` with `dst ~ H * src`.
///
/// Exactly four pairs are solved as an 8x8 linear system; more pairs are
/// solved in the least-squares sense through the SVD of the normalized DLT
/// matrix.
pub fn estimate_homography(
    src: &[Point2<f32>],
    dst: &[Point2<f32>],
) -> Result<Homography, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::MismatchedLengths {
            src: src.len(),
            dst: dst.len(),
        });
    }
    if src.len() < 4 {
        return Err(HomographyError::TooFewCorrespondences { got: src.len() });
    }

    if let (Ok(s4), Ok(d4)) = (
        <&[Point2<f32>; 4]>::try_from(src),
        <&[Point2<f32>; 4]>::try_from(dst),
    ) {
        return homography_from_4pt(s4, d4);
    }

    let (s, ts) = normalize_points(src);
    let (d, td) = normalize_points(dst);

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let (x, y) = (s[k].x, s[k].y);
        let (u, v) = (d[k].x, d[k].y);

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Null vector of A: last row of V^T.
    let svd = a.svd(false, true);
    let vt = svd.v_t.ok_or(HomographyError::Degenerate)?;
    let h = vt.row(vt.nrows() - 1);
    let hn = Matrix3::<f64>::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    let out = Homography::new(denormalize_homography(hn, ts, td)?);
    if out.is_well_conditioned() {
        Ok(out)
    } else {
        Err(HomographyError::Degenerate)
    }
}

/// Exact homography through four correspondences, with `h33 = 1`.
///
/// Corner order must be consistent between `src` and `dst`.
pub fn homography_from_4pt(
    src: &[Point2<f32>; 4],
    dst: &[Point2<f32>; 4],
) -> Result<Homography, HomographyError> {
    // h11 x + h12 y + h13 - u h31 x - u h32 y = u
    // h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let (src_n, t_src) = normalize_points(src);
    let (dst_n, t_dst) = normalize_points(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = r0 + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b).ok_or(HomographyError::Degenerate)?;
    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    let out = Homography::new(denormalize_homography(hn, t_src, t_dst)?);
    if out.is_well_conditioned() {
        Ok(out)
    } else {
        Err(HomographyError::Degenerate)
    }
}

/// Warp into a `out_w x out_h` plane: each output pixel center is mapped into
/// `src` through `h_img_from_plane` and sampled bilinearly.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_img_from_plane: &Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::new(out_w, out_h);
    for y in 0..out_h {
        let row = &mut out.data[y * out_w..(y + 1) * out_w];
        for (x, px) in row.iter_mut().enumerate() {
            let pr = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            *px = match h_img_from_plane.try_apply(pr) {
                Some(pi) => sample_bilinear_u8(src, pi.x - 0.5, pi.y - 0.5),
                None => 0,
            };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn skewed() -> Homography {
        Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ))
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = Homography::new(Matrix3::new(
            1.2, 0.1, 5.0, //
            -0.05, 0.9, 3.0, //
            0.001, 0.0005, 1.0,
        ));
        let inv = h.inverse().expect("invertible");

        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(50.0_f32, -20.0),
            Point2::new(320.0_f32, 200.0),
        ] {
            assert_close(inv.apply(h.apply(p)), p, 1e-3);
        }
    }

    #[test]
    fn row_major_layout_matches_matrix_rows() {
        let h = skewed();
        let flat = h.to_row_major();
        assert_eq!(flat[2], 120.0);
        assert_eq!(flat[5], 80.0);
        assert_eq!(flat[6], 0.0009);
        assert_eq!(Homography::from_row_major(flat), h);
    }

    #[test]
    fn four_point_specialization_recovers_h() {
        let ground_truth = skewed();
        let rect = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(180.0_f32, 0.0),
            Point2::new(180.0_f32, 130.0),
            Point2::new(0.0_f32, 130.0),
        ];
        let dst = rect.map(|p| ground_truth.apply(p));

        let recovered = homography_from_4pt(&rect, &dst).expect("recoverable");
        assert!((recovered.h[(2, 2)] - 1.0).abs() < 1e-12);

        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(60.0, 40.0),
            Point2::new(150.0, 120.0),
        ] {
            assert_close(recovered.apply(p), ground_truth.apply(p), 1e-3);
        }
    }

    #[test]
    fn dlt_handles_overdetermined_case() {
        let ground_truth = Homography::new(Matrix3::new(
            1.0, 0.2, 12.0, //
            -0.1, 0.9, 6.0, //
            0.0006, 0.0004, 1.0,
        ));

        let src: Vec<Point2<f32>> = (0..3)
            .flat_map(|y| (0..3).map(move |x| Point2::new(x as f32 * 40.0, y as f32 * 50.0)))
            .collect();
        let dst: Vec<Point2<f32>> = src.iter().map(|&p| ground_truth.apply(p)).collect();

        let estimated = estimate_homography(&src, &dst).expect("estimate");
        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(60.0, 40.0),
            Point2::new(80.0, 100.0),
        ] {
            assert_close(estimated.apply(p), ground_truth.apply(p), 1e-3);
        }
    }

    #[test]
    fn mismatched_input_lengths_fail() {
        let src = [Point2::new(0.0_f32, 0.0); 4];
        let dst = [Point2::new(1.0_f32, 1.0); 3];
        assert_eq!(
            estimate_homography(&src, &dst),
            Err(HomographyError::MismatchedLengths { src: 4, dst: 3 })
        );
    }

    #[test]
    fn three_points_are_too_few() {
        let pts = [Point2::new(0.0_f32, 0.0); 3];
        assert_eq!(
            estimate_homography(&pts, &pts),
            Err(HomographyError::TooFewCorrespondences { got: 3 })
        );
    }

    #[test]
    fn collapsed_points_are_degenerate() {
        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let dst = [Point2::new(5.0_f32, 5.0); 4];
        assert!(homography_from_4pt(&src, &dst).is_err());
    }

    #[test]
    fn warp_with_identity_copies_image() {
        let data: Vec<u8> = (0..16).map(|v| v * 10).collect();
        let img = GrayImage {
            width: 4,
            height: 4,
            data,
        };
        let out = warp_perspective_gray(&img.view(), &Homography::identity(), 4, 4);
        assert_eq!(out, img);
    }
}
