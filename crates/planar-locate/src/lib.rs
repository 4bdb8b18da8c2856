//! Facade for the `planar-locate-*` workspace.
//!
//! Two pipelines share one geometry core:
//! - anchor matching finds a known planar image (a poster, a page, a logo)
//!   inside a scene and reports its homography, center, rotation and scale;
//! - paper detection finds the most sheet-like quadrilateral in an image and
//!   reports its canonical homography and, given a focal length, camera pose.
//!
//! ## Quickstart
//!
//! ```no_run
//! use planar_locate::detect;
//! use planar_locate::report::PaperReport;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("desk.jpg")?;
//! let outcome = detect::detect_paper_encoded(&bytes, &detect::default_paper_config());
//! let report = PaperReport::from_outcome(&outcome);
//! println!("status {}, corners {:?}", report.status, report.corners);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `planar_locate::core`: homography, RANSAC, quadrilateral checks, pose.
//! - `planar_locate::features`: feature oracle traits and the ORB extractor.
//! - `planar_locate::anchor`: anchor matching.
//! - `planar_locate::paper`: paper detection and rectification.
//! - `planar_locate::detect`: encoded/raw/point-array entry points.
//! - `planar_locate::report`: flat reports with integer status codes.

pub use planar_locate_anchor as anchor;
pub use planar_locate_core as core;
pub use planar_locate_features as features;
pub use planar_locate_paper as paper;

pub use planar_locate_anchor::{AnchorMatch, AnchorMatchParams, AnchorMatcher};
pub use planar_locate_core::{Detection, RejectReason, Rejection};
pub use planar_locate_paper::{PaperDetection, PaperDetectionConfig, PaperDetector};

pub mod detect;
pub mod report;
