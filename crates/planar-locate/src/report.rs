//! Flat, fixed-size result records with integer status codes.
//!
//! These mirror the C layouts exposed by `planar-locate-ffi` and are what the
//! CLI prints as JSON.

use serde::{Deserialize, Serialize};

use crate::anchor::AnchorMatch;
use crate::core::Detection;
use crate::detect::{DetectError, ImageRole};
use crate::paper::PaperDetection;

/// Outcome code shared by every entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Status {
    Found = 1,
    NotFound = 0,
    InvalidInput = -1,
    AnchorDecodeFailed = -2,
    SceneDecodeFailed = -3,
}

impl Status {
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Status for a failed anchor/scene call; only decode failures get their own code.
    pub fn for_match_error(err: &DetectError) -> Self {
        match err {
            DetectError::Decode {
                role: ImageRole::Anchor,
                ..
            } => Status::AnchorDecodeFailed,
            DetectError::Decode {
                role: ImageRole::Scene,
                ..
            } => Status::SceneDecodeFailed,
            _ => Status::InvalidInput,
        }
    }
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Anchor-in-scene result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HomographyReport {
    pub center_x: f32,
    pub center_y: f32,
    /// Radians, clockwise-positive on screen.
    pub rotation: f32,
    pub scale: f32,
    /// Row-major anchor-to-scene homography.
    pub homography: [f64; 9],
    /// `[x0, y0, .., x3, y3]`, TL, TR, BR, BL of the anchor.
    pub corners: [f32; 8],
    /// Inliers on success, ratio-test survivors (or input pairs) otherwise.
    pub num_matches: i32,
    pub status: i32,
}

impl HomographyReport {
    pub fn from_detection(det: &Detection<AnchorMatch>) -> Self {
        match det {
            Detection::Found(m) => Self {
                center_x: m.center.x,
                center_y: m.center.y,
                rotation: m.rotation,
                scale: m.scale,
                homography: m.homography.to_row_major(),
                corners: m.corners.to_flat(),
                num_matches: saturating_i32(m.inlier_count),
                status: Status::Found.code(),
            },
            Detection::NotFound(r) => Self {
                num_matches: saturating_i32(r.match_count),
                status: Status::NotFound.code(),
                ..Self::default()
            },
        }
    }

    pub fn from_error(err: &DetectError) -> Self {
        Self {
            status: Status::for_match_error(err).code(),
            ..Self::default()
        }
    }

    pub fn from_outcome(outcome: &Result<Detection<AnchorMatch>, DetectError>) -> Self {
        match outcome {
            Ok(det) => Self::from_detection(det),
            Err(err) => Self::from_error(err),
        }
    }
}

/// Paper detection result; `rvec`/`tvec` stay zero without a pose.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperReport {
    pub corners: [f32; 8],
    pub center_x: f32,
    pub center_y: f32,
    /// Row-major canonical-millimetre-to-image homography.
    pub homography: [f64; 9],
    pub rvec: [f64; 3],
    pub tvec: [f64; 3],
    pub area: f32,
    pub perimeter: f32,
    pub aspect_ratio: f32,
    pub status: i32,
}

impl PaperReport {
    pub fn from_detection(det: &Detection<PaperDetection>) -> Self {
        let Detection::Found(p) = det else {
            return Self::default();
        };
        let (rvec, tvec) = p.pose.as_ref().map_or(([0.0; 3], [0.0; 3]), |pose| {
            (
                [pose.rotation.x, pose.rotation.y, pose.rotation.z],
                [pose.translation.x, pose.translation.y, pose.translation.z],
            )
        });
        Self {
            corners: p.corners.to_flat(),
            center_x: p.center.x,
            center_y: p.center.y,
            homography: p.homography.to_row_major(),
            rvec,
            tvec,
            area: p.area,
            perimeter: p.perimeter,
            aspect_ratio: p.aspect_ratio,
            status: Status::Found.code(),
        }
    }

    /// Any paper input error, decode failures included, is `InvalidInput`.
    pub fn from_error(_err: &DetectError) -> Self {
        Self {
            status: Status::InvalidInput.code(),
            ..Self::default()
        }
    }

    pub fn from_outcome(outcome: &Result<Detection<PaperDetection>, DetectError>) -> Self {
        match outcome {
            Ok(det) => Self::from_detection(det),
            Err(err) => Self::from_error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RejectReason;

    #[test]
    fn decode_failures_map_by_role() {
        let decode = |role| DetectError::Decode {
            role,
            source: image::ImageError::IoError(std::io::Error::other("bad")),
        };
        assert_eq!(Status::for_match_error(&decode(ImageRole::Anchor)).code(), -2);
        assert_eq!(Status::for_match_error(&decode(ImageRole::Scene)).code(), -3);
        assert_eq!(
            Status::for_match_error(&DetectError::EmptyBuffer {
                role: ImageRole::Scene
            })
            .code(),
            -1
        );
        assert_eq!(PaperReport::from_error(&decode(ImageRole::Image)).status, -1);
    }

    #[test]
    fn rejection_keeps_match_count() {
        let det: Detection<AnchorMatch> = Detection::not_found(RejectReason::LowConfidence, 17);
        let report = HomographyReport::from_detection(&det);
        assert_eq!(report.status, 0);
        assert_eq!(report.num_matches, 17);
        assert_eq!(report.homography, [0.0; 9]);
    }
}
