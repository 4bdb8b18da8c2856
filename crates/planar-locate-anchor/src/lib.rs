//! Anchor matching: find a known planar image inside a scene.
//!
//! Keypoints from both images go through a k=2 nearest-neighbour search and
//! Lowe's ratio test, the surviving pairs feed a seeded RANSAC homography,
//! and the projected anchor outline must pass the convexity and aspect
//! checks before a match is reported.
//!
//! ```no_run
//! use planar_locate_anchor::{AnchorMatchParams, AnchorMatcher};
//! use planar_locate_core::{Detection, GrayImageView};
//!
//! # let (anchor_px, scene_px) = (vec![0u8; 64 * 64], vec![0u8; 128 * 128]);
//! let anchor = GrayImageView::new(64, 64, &anchor_px).unwrap();
//! let scene = GrayImageView::new(128, 128, &scene_px).unwrap();
//! let matcher = AnchorMatcher::new(AnchorMatchParams::default());
//! if let Detection::Found(m) = matcher.find_anchor(&anchor, &scene) {
//!     println!("center {:?}, scale {}", m.center, m.scale);
//! }
//! ```

mod detector;
mod params;
mod result;

pub use detector::AnchorMatcher;
pub use params::AnchorMatchParams;
pub use result::AnchorMatch;
