//! Paper sheet detection.
//!
//! The image is smoothed, Canny edges are dilated into closed outlines, and
//! every top-level outline that simplifies to a convex quadrilateral of
//! plausible size and aspect becomes a candidate. The highest scoring one is
//! mapped from a canonical millimetre rectangle by an exact four-point
//! homography, and with a focal length configured a planar camera pose is
//! solved as well.

mod config;
mod contour;
mod detector;
mod edges;
mod rectify;
mod result;

pub use config::PaperDetectionConfig;
pub use detector::PaperDetector;
pub use rectify::{rectify_paper, RectifyError};
pub use result::PaperDetection;
