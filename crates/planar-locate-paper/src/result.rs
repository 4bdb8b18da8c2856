use nalgebra::Point2;
use planar_locate_core::{CameraPose, Homography, Quadrilateral};
use serde::{Deserialize, Serialize};

/// A detected sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaperDetection {
    /// Image-space corners ordered TL, TR, BR, BL.
    pub corners: Quadrilateral,
    pub center: Point2<f32>,
    /// Canonical sheet (millimetres, origin at TL) to image pixels.
    pub homography: Homography,
    /// Sheet-to-camera pose, present when a focal length was configured and the solve succeeded.
    pub pose: Option<CameraPose>,
    /// Area enclosed by the traced contour, in pixels.
    pub area: f32,
    /// Sum of the quadrilateral's edge lengths.
    pub perimeter: f32,
    /// Short side over long side, from averaged opposite edges.
    pub aspect_ratio: f32,
    /// Width and height of the canonical rectangle, swapped for landscape views.
    pub canonical_size_mm: (f32, f32),
}
