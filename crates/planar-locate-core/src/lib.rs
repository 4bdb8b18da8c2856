//! Geometry shared by the planar localisation pipelines.
//!
//! Homography estimation (direct linear transform and RANSAC), the
//! quadrilateral plausibility checks, planar pose solving and the
//! `Detection` result type. Nothing here depends on a feature detector or an
//! image codec.

mod detection;
mod homography;
mod image;
mod io;
mod logger;
mod pose;
mod quad;
mod ransac;

pub use detection::{Detection, PointCorrespondence, RejectReason, Rejection};
pub use homography::{
    estimate_homography, homography_from_4pt, warp_perspective_gray, Homography, HomographyError,
};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use io::{load_json, write_json, JsonIoError};
pub use pose::{reprojection_rms, solve_planar_pose, CameraIntrinsics, CameraPose, PoseError};
pub use quad::{
    is_convex, order_clockwise, turn_cross_products, GeometryLimits, GeometryValidator,
    QuadRejection, Quadrilateral,
};
pub use ransac::{estimate_homography_ransac, HomographyFit, InlierPolicy, RansacParams};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
