use image::GrayImage;
use imageproc::{geometry::contour_area, point::Point};
use log::{debug, warn};
use nalgebra::{Point2, Point3};
use planar_locate_core::{
    homography_from_4pt, is_convex, order_clockwise, solve_planar_pose, CameraIntrinsics,
    CameraPose, Detection, Quadrilateral, RejectReason,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    contour::{approximate_polygon, external_contours},
    edges::edge_map,
    PaperDetection, PaperDetectionConfig,
};

/// Douglas-Peucker tolerance as a fraction of the contour perimeter.
const APPROX_EPSILON_FRAC: f64 = 0.035;
/// Shortest accepted quadrilateral edge as a fraction of the smaller image side.
const MIN_EDGE_FRAC: f32 = 0.05;

/// Candidate quadrilateral that survived the area, shape and aspect filters.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    quad: Quadrilateral,
    area: f32,
    score: f32,
}

/// Finds the most paper-like quadrilateral in a grayscale image.
#[derive(Clone, Debug, Default)]
pub struct PaperDetector {
    config: PaperDetectionConfig,
}

impl PaperDetector {
    pub fn new(config: PaperDetectionConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &PaperDetectionConfig {
        &self.config
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = gray.width(), height = gray.height()))
    )]
    pub fn detect(&self, gray: &GrayImage) -> Detection<PaperDetection> {
        let (w, h) = gray.dimensions();
        if w == 0 || h == 0 {
            return Detection::not_found(RejectReason::NoQuadrilateral, 0);
        }

        let edges = edge_map(gray, &self.config);
        let contours = external_contours(&edges);
        debug!("paper: {} external contours", contours.len());

        let Some(best) = self.best_candidate(&contours, w, h) else {
            debug!("paper: no quadrilateral candidate");
            return Detection::not_found(RejectReason::NoQuadrilateral, 0);
        };

        let quad = best.quad;
        let [top, right, bottom, left] = quad.edge_lengths();
        let width = (top + bottom) * 0.5;
        let height = (left + right) * 0.5;

        let (mut sheet_w, mut sheet_h) = self.config.sheet_size_mm();
        if width > height {
            std::mem::swap(&mut sheet_w, &mut sheet_h);
        }
        let canonical = [
            Point2::new(0.0, 0.0),
            Point2::new(sheet_w, 0.0),
            Point2::new(sheet_w, sheet_h),
            Point2::new(0.0, sheet_h),
        ];
        let homography = match homography_from_4pt(&canonical, &quad.corners) {
            Ok(h) => h,
            Err(err) => {
                debug!("paper: canonical homography failed: {err}");
                return Detection::not_found(RejectReason::HomographyFailed, 0);
            }
        };

        let pose = if self.config.estimates_pose() {
            self.solve_pose(&canonical, &quad, w, h)
        } else {
            None
        };

        Detection::Found(PaperDetection {
            corners: quad,
            center: quad.center(),
            homography,
            pose,
            area: best.area,
            perimeter: quad.perimeter(),
            aspect_ratio: width.min(height) / width.max(height),
            canonical_size_mm: (sheet_w, sheet_h),
        })
    }

    fn best_candidate(&self, contours: &[Vec<Point<i32>>], w: u32, h: u32) -> Option<Candidate> {
        let cfg = &self.config;
        let image_area = w as f32 * h as f32;
        let min_area = image_area * cfg.min_area_ratio;
        let max_area = image_area * cfg.max_area_ratio;
        let min_edge = w.min(h) as f32 * MIN_EDGE_FRAC;

        let mut best: Option<Candidate> = None;
        for contour in contours {
            let area = contour_area(contour) as f32;
            if area < min_area || area > max_area {
                continue;
            }
            let approx = approximate_polygon(contour, APPROX_EPSILON_FRAC);
            let [a, b, c, d] = approx.as_slice() else {
                continue;
            };
            let corners = order_clockwise([a, b, c, d].map(|p| Point2::new(p.x as f32, p.y as f32)));
            if !is_convex(&corners) {
                continue;
            }
            let quad = Quadrilateral::new(corners);
            let edges = quad.edge_lengths();
            if edges.iter().any(|&e| e < min_edge) {
                continue;
            }

            let width = (edges[0] + edges[2]) * 0.5;
            let height = (edges[1] + edges[3]) * 0.5;
            let aspect = width.min(height) / width.max(height);
            let mut aspect_score = 1.0;
            if cfg.expected_aspect_ratio > 0.0 {
                let diff = (aspect - cfg.expected_aspect_ratio).abs() / cfg.expected_aspect_ratio;
                if diff > cfg.aspect_tolerance {
                    continue;
                }
                aspect_score = 1.0 - diff;
            }

            // Absolute area: bigger sheets win regardless of image size.
            let score = area * aspect_score;
            if best.is_none_or(|b| score > b.score) {
                best = Some(Candidate { quad, area, score });
            }
        }
        best
    }

    fn solve_pose(
        &self,
        canonical: &[Point2<f32>; 4],
        quad: &Quadrilateral,
        w: u32,
        h: u32,
    ) -> Option<CameraPose> {
        let cfg = &self.config;
        let cx = if cfg.principal_point_x > 0.0 {
            cfg.principal_point_x as f64
        } else {
            w as f64 * 0.5
        };
        let cy = if cfg.principal_point_y > 0.0 {
            cfg.principal_point_y as f64
        } else {
            h as f64 * 0.5
        };
        let k = CameraIntrinsics::from_focal(cfg.focal_length_px as f64, cx, cy);
        let object = canonical.map(|p| Point3::new(p.x as f64, p.y as f64, 0.0));
        let image = quad.corners.map(|p| Point2::new(p.x as f64, p.y as f64));

        match solve_planar_pose(&object, &image, &k) {
            Ok(pose) => Some(pose),
            Err(err) => {
                warn!("paper: pose estimation failed: {err}");
                None
            }
        }
    }
}
