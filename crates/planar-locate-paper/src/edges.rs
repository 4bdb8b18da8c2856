use image::GrayImage;
use imageproc::{distance_transform::Norm, edges::canny, filter::gaussian_blur_f32, morphology};

use crate::PaperDetectionConfig;

/// Smoothed, Canny-thresholded and 3x3-dilated edge map.
pub(crate) fn edge_map(gray: &GrayImage, cfg: &PaperDetectionConfig) -> GrayImage {
    let (low, high) = cfg.hysteresis();
    let edges = match cfg.blur_sigma() {
        Some(sigma) => canny(&gaussian_blur_f32(gray, sigma), low, high),
        None => canny(gray, low, high),
    };
    // Close single-pixel gaps so a sheet outline forms one connected border.
    morphology::dilate(&edges, Norm::LInf, 1)
}
