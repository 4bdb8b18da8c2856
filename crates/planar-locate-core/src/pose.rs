//! Camera pose of a planar target (object points on `Z = 0`).
//!
//! The pose is initialized by decomposing the plane-to-image homography with
//! `K^-1` and then refined by Levenberg-Marquardt on pixel reprojection error.
//! Lens distortion is assumed to be zero.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use log::debug;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn, Matrix3, Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::estimate_homography;

/// Pinhole intrinsics in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Square pixels with a single focal length.
    pub fn from_focal(f: f64, cx: f64, cy: f64) -> Self {
        Self::new(f, f, cx, cy)
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.fx > 0.0
            && self.fy > 0.0
            && self.cx.is_finite()
            && self.cy.is_finite()
    }

    /// Project a camera-frame point; `None` when it is not in front of the camera.
    pub fn project(&self, pc: &Point3<f64>) -> Option<Point2<f64>> {
        if pc.z <= 1e-12 {
            return None;
        }
        Some(Point2::new(
            self.fx * pc.x / pc.z + self.cx,
            self.fy * pc.y / pc.z + self.cy,
        ))
    }
}

/// Object-to-camera transform as a Rodrigues rotation vector and a translation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
}

impl CameraPose {
    pub fn new(rotation: Vector3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_rotation(r: &Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self::new(r.scaled_axis(), translation)
    }

    pub fn rotation_matrix(&self) -> Rotation3<f64> {
        Rotation3::new(self.rotation)
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation_matrix().transform_point(p) + self.translation
    }

    /// Pixel projection of an object point.
    pub fn project(&self, k: &CameraIntrinsics, p: &Point3<f64>) -> Option<Point2<f64>> {
        k.project(&self.transform_point(p))
    }

}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("need at least 4 point pairs, got {got}")]
    TooFewPoints { got: usize },
    #[error("object and image point counts differ ({object} vs {image})")]
    MismatchedLengths { object: usize, image: usize },
    #[error("object points must lie on the Z = 0 plane")]
    NonPlanarObject,
    #[error("degenerate point configuration")]
    DegenerateConfiguration,
    #[error("invalid camera intrinsics")]
    InvalidIntrinsics,
    #[error("pose refinement did not converge")]
    NotConverged,
}

/// Patience of the solver, in multiples of `parameters + 1` evaluations.
const MAX_LM_ITERS: usize = 100;

/// Root-mean-square pixel reprojection error; infinite if a point falls behind the camera.
pub fn reprojection_rms(
    pose: &CameraPose,
    k: &CameraIntrinsics,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
) -> f64 {
    let cost = residuals(pose, k, object, image).map_or(f64::INFINITY, |r| r.norm_squared());
    (cost / object.len().max(1) as f64).sqrt()
}

/// Solve the pose placing planar `object` points (Z = 0) at pixel positions `image`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(object, image), fields(n = object.len()))
)]
pub fn solve_planar_pose(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    intrinsics: &CameraIntrinsics,
) -> Result<CameraPose, PoseError> {
    if object.len() != image.len() {
        return Err(PoseError::MismatchedLengths {
            object: object.len(),
            image: image.len(),
        });
    }
    if object.len() < 4 {
        return Err(PoseError::TooFewPoints { got: object.len() });
    }
    if !intrinsics.is_valid() {
        return Err(PoseError::InvalidIntrinsics);
    }
    let extent = object
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(1.0_f64, f64::max);
    if object.iter().any(|p| p.z.abs() > 1e-9 * extent) {
        return Err(PoseError::NonPlanarObject);
    }
    if max_triangle_area(object) <= 1e-9 * extent * extent {
        return Err(PoseError::DegenerateConfiguration);
    }

    let initial = initial_pose(object, image, intrinsics)?;
    refine_pose(initial, object, image, intrinsics)
}

fn max_triangle_area(object: &[Point3<f64>]) -> f64 {
    let n = object.len();
    let mut best = 0.0_f64;
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let (a, b, c) = (object[i], object[j], object[k]);
                let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
                best = best.max(cross.abs() * 0.5);
            }
        }
    }
    best
}

// H = K [r1 r2 t] up to scale.
fn initial_pose(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    intrinsics: &CameraIntrinsics,
) -> Result<CameraPose, PoseError> {
    let src: Vec<Point2<f32>> = object
        .iter()
        .map(|p| Point2::new(p.x as f32, p.y as f32))
        .collect();
    let dst: Vec<Point2<f32>> = image
        .iter()
        .map(|p| Point2::new(p.x as f32, p.y as f32))
        .collect();
    let h = estimate_homography(&src, &dst)
        .map_err(|_| PoseError::DegenerateConfiguration)?
        .h;

    let k_inv = intrinsics
        .matrix()
        .try_inverse()
        .ok_or(PoseError::InvalidIntrinsics)?;

    let k_inv_h1 = k_inv * h.column(0);
    let k_inv_h2 = k_inv * h.column(1);
    let k_inv_h3 = k_inv * h.column(2);

    let denom = (k_inv_h1.norm() + k_inv_h2.norm()) * 0.5;
    if denom <= 1e-12 {
        return Err(PoseError::DegenerateConfiguration);
    }
    let lambda = 1.0 / denom;

    let mut r1 = lambda * k_inv_h1;
    let mut r2 = lambda * k_inv_h2;
    let mut t = lambda * k_inv_h3;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return Err(PoseError::DegenerateConfiguration);
    }

    let r = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = r.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::DegenerateConfiguration);
    };
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let rotation = Rotation3::from_matrix_unchecked(r_orth);
    Ok(CameraPose::from_rotation(&rotation, t))
}

fn residuals(
    pose: &CameraPose,
    k: &CameraIntrinsics,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
) -> Option<DVector<f64>> {
    let mut r = DVector::zeros(2 * object.len());
    for (i, (po, pi)) in object.iter().zip(image).enumerate() {
        let proj = pose.project(k, po)?;
        r[2 * i] = proj.x - pi.x;
        r[2 * i + 1] = proj.y - pi.y;
    }
    Some(r)
}

/// Pixel reprojection residuals over the six pose parameters
/// `[rx, ry, rz, tx, ty, tz]`.
struct ReprojectionProblem<'a> {
    object: &'a [Point3<f64>],
    image: &'a [Point2<f64>],
    k: &'a CameraIntrinsics,
    params: DVector<f64>,
}

impl ReprojectionProblem<'_> {
    fn pose_at(p: &DVector<f64>) -> CameraPose {
        CameraPose::new(
            Vector3::new(p[0], p[1], p[2]),
            Vector3::new(p[3], p[4], p[5]),
        )
    }
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for ReprojectionProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        residuals(&Self::pose_at(&self.params), self.k, self.object, self.image)
    }

    // Central differences; a point crossing behind the camera aborts the step.
    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let mut j = DMatrix::zeros(2 * self.object.len(), self.params.len());
        for col in 0..self.params.len() {
            let step = 1e-6 * self.params[col].abs().max(1.0);
            let mut plus = self.params.clone();
            let mut minus = self.params.clone();
            plus[col] += step;
            minus[col] -= step;
            let rp = residuals(&Self::pose_at(&plus), self.k, self.object, self.image)?;
            let rm = residuals(&Self::pose_at(&minus), self.k, self.object, self.image)?;
            j.set_column(col, &((rp - rm) / (2.0 * step)));
        }
        Some(j)
    }
}

fn refine_pose(
    initial: CameraPose,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    k: &CameraIntrinsics,
) -> Result<CameraPose, PoseError> {
    if residuals(&initial, k, object, image).is_none() {
        debug!("pose: initial estimate projects points behind the camera");
        return Err(PoseError::NotConverged);
    }
    let (r, t) = (initial.rotation, initial.translation);
    let problem = ReprojectionProblem {
        object,
        image,
        k,
        params: DVector::from_column_slice(&[r.x, r.y, r.z, t.x, t.y, t.z]),
    };

    let (problem, report) = LevenbergMarquardt::new()
        .with_patience(MAX_LM_ITERS)
        .minimize(problem);
    debug!(
        "pose: {:?} after {} evaluations, cost {:.3e}",
        report.termination, report.number_of_evaluations, report.objective_function
    );

    // Tolerance and patience stops still leave the best pose found.
    let usable = report.termination.was_successful()
        || matches!(
            report.termination,
            TerminationReason::LostPatience | TerminationReason::NoImprovementPossible(_)
        );
    let pose = ReprojectionProblem::pose_at(&problem.params);
    if usable
        && report.objective_function.is_finite()
        && problem.params.iter().all(|v| v.is_finite())
    {
        Ok(pose)
    } else {
        Err(PoseError::NotConverged)
    }
}
