use nalgebra::Point2;
use planar_locate_core::{Homography, Quadrilateral};
use serde::{Deserialize, Serialize};

/// Where the anchor sits in the scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorMatch {
    /// Anchor pixel coordinates to scene pixel coordinates.
    pub homography: Homography,
    /// Anchor image corners in the scene, TL, TR, BR, BL of the anchor.
    pub corners: Quadrilateral,
    pub center: Point2<f32>,
    /// Angle of the anchor's top edge in the scene, radians, clockwise-positive on screen.
    pub rotation: f32,
    /// Mean of the top-edge and left-edge scale factors.
    pub scale: f32,
    pub inlier_count: usize,
    /// Correspondences fed to RANSAC.
    pub match_count: usize,
}
