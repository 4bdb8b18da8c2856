use planar_locate_core::{load_json, JsonIoError};
use serde::{Deserialize, Serialize};
use std::path::Path;

const A4_WIDTH_MM: f32 = 210.0;
const A4_HEIGHT_MM: f32 = 297.0;

/// Tuning of [`crate::PaperDetector`].
///
/// `Default` is an A4 sheet with pose estimation disabled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperDetectionConfig {
    /// Canny hysteresis thresholds; swapped when given out of order.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Odd Gaussian kernel size; 0 or 1 disables smoothing.
    pub blur_kernel_size: u32,
    /// Accepted contour area as a fraction of the image area.
    pub min_area_ratio: f32,
    pub max_area_ratio: f32,
    /// Short side over long side of the sheet; 0 disables the aspect check.
    pub expected_aspect_ratio: f32,
    /// Allowed relative deviation from `expected_aspect_ratio`.
    pub aspect_tolerance: f32,
    pub paper_width_mm: f32,
    pub paper_height_mm: f32,
    /// Focal length in pixels; 0 skips pose estimation.
    pub focal_length_px: f32,
    /// Principal point; 0 means the image center.
    pub principal_point_x: f32,
    pub principal_point_y: f32,
}

impl Default for PaperDetectionConfig {
    fn default() -> Self {
        Self::a4()
    }
}

impl PaperDetectionConfig {
    pub fn a4() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            blur_kernel_size: 5,
            min_area_ratio: 0.05,
            max_area_ratio: 0.95,
            expected_aspect_ratio: A4_WIDTH_MM / A4_HEIGHT_MM,
            aspect_tolerance: 0.3,
            paper_width_mm: A4_WIDTH_MM,
            paper_height_mm: A4_HEIGHT_MM,
            focal_length_px: 0.0,
            principal_point_x: 0.0,
            principal_point_y: 0.0,
        }
    }

    /// Load from a JSON file; missing fields keep their A4 defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JsonIoError> {
        load_json(path)
    }

    /// Gaussian sigma for the configured kernel, `None` when smoothing is off.
    pub fn blur_sigma(&self) -> Option<f32> {
        let k = self.blur_kernel_size;
        if k < 3 || k % 2 == 0 {
            return None;
        }
        Some(0.3 * ((k - 1) as f32 * 0.5 - 1.0) + 0.8)
    }

    /// `(low, high)` Canny thresholds in ascending order.
    pub fn hysteresis(&self) -> (f32, f32) {
        if self.canny_low <= self.canny_high {
            (self.canny_low, self.canny_high)
        } else {
            (self.canny_high, self.canny_low)
        }
    }

    /// Physical sheet size in portrait order, non-positive values replaced by A4.
    pub fn sheet_size_mm(&self) -> (f32, f32) {
        let w = if self.paper_width_mm > 0.0 {
            self.paper_width_mm
        } else {
            A4_WIDTH_MM
        };
        let h = if self.paper_height_mm > 0.0 {
            self.paper_height_mm
        } else {
            A4_HEIGHT_MM
        };
        (w, h)
    }

    pub fn estimates_pose(&self) -> bool {
        self.focal_length_px > 0.0 && self.focal_length_px.is_finite()
    }
}
