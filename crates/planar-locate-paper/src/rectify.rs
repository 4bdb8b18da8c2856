use image::GrayImage;
use nalgebra::Matrix3;
use planar_locate_core::{warp_perspective_gray, GrayImageView, Homography};

use crate::PaperDetection;

/// Upper bound on rectified output pixels.
const MAX_OUTPUT_PIXELS: usize = 64 * 1024 * 1024;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RectifyError {
    #[error("px_per_mm must be positive and finite, got {0}")]
    InvalidScale(f32),
    #[error("rectified image would be {width}x{height} pixels")]
    BadOutputSize { width: usize, height: usize },
}

/// Warp the detected sheet into a fronto-parallel image at `px_per_mm`.
///
/// Output pixel `(u, v)` shows the sheet point `((u + 0.5) / px_per_mm,
/// (v + 0.5) / px_per_mm)` millimetres from its top-left corner.
pub fn rectify_paper(
    image: &GrayImage,
    detection: &PaperDetection,
    px_per_mm: f32,
) -> Result<GrayImage, RectifyError> {
    if !(px_per_mm.is_finite() && px_per_mm > 0.0) {
        return Err(RectifyError::InvalidScale(px_per_mm));
    }
    let (sheet_w, sheet_h) = detection.canonical_size_mm;
    let width = (sheet_w * px_per_mm).round() as usize;
    let height = (sheet_h * px_per_mm).round() as usize;
    if width == 0 || height == 0 || width.saturating_mul(height) > MAX_OUTPUT_PIXELS {
        return Err(RectifyError::BadOutputSize { width, height });
    }

    let inv = 1.0 / px_per_mm as f64;
    let mm_from_px = Matrix3::new(inv, 0.0, 0.0, 0.0, inv, 0.0, 0.0, 0.0, 1.0);
    let img_from_out = Homography::new(detection.homography.h * mm_from_px);

    let src = GrayImageView {
        width: image.width() as usize,
        height: image.height() as usize,
        data: image.as_raw(),
    };
    let warped = warp_perspective_gray(&src, &img_from_out, width, height);
    GrayImage::from_raw(width as u32, height as u32, warped.data)
        .ok_or(RectifyError::BadOutputSize { width, height })
}
