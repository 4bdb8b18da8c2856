//! Quadrilateral geometry and plausibility checks.
//!
//! Image coordinates have Y pointing down. In that frame the canonical order
//! TL, TR, BR, BL runs visually clockwise and every turn of a convex quad in
//! that order has a strictly positive cross product.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::RejectReason;

/// Four corners ordered TL, TR, BR, BL.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub corners: [Point2<f32>; 4],
}

impl Quadrilateral {
    pub fn new(corners: [Point2<f32>; 4]) -> Self {
        Self { corners }
    }

    /// Build from arbitrary-order points by applying [`order_clockwise`].
    pub fn from_unordered(points: [Point2<f32>; 4]) -> Self {
        Self::new(order_clockwise(points))
    }

    pub fn center(&self) -> Point2<f32> {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2::new(sx / 4.0, sy / 4.0)
    }

    /// Edge lengths as `[top, right, bottom, left]`.
    pub fn edge_lengths(&self) -> [f32; 4] {
        let c = &self.corners;
        [
            (c[1] - c[0]).norm(),
            (c[2] - c[1]).norm(),
            (c[3] - c[2]).norm(),
            (c[0] - c[3]).norm(),
        ]
    }

    pub fn perimeter(&self) -> f32 {
        self.edge_lengths().iter().sum()
    }

    /// Unsigned shoelace area.
    pub fn area(&self) -> f32 {
        let c = &self.corners;
        let twice: f32 = (0..4)
            .map(|i| {
                let (a, b) = (c[i], c[(i + 1) % 4]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice.abs() * 0.5
    }

    /// Observed width-to-height ratio, `top / left`.
    pub fn aspect_ratio(&self) -> f32 {
        let [top, _, _, left] = self.edge_lengths();
        top / left
    }

    /// Angle of the top edge, `atan2(dy, dx)`; positive is clockwise on screen.
    pub fn top_edge_angle(&self) -> f32 {
        let d = self.corners[1] - self.corners[0];
        d.y.atan2(d.x)
    }

    pub fn is_convex(&self) -> bool {
        is_convex(&self.corners)
    }

    pub fn to_flat(&self) -> [f32; 8] {
        let mut out = [0.0; 8];
        for (i, p) in self.corners.iter().enumerate() {
            out[2 * i] = p.x;
            out[2 * i + 1] = p.y;
        }
        out
    }
}

/// Cross products of consecutive edges at each vertex, cyclic.
pub fn turn_cross_products(pts: &[Point2<f32>; 4]) -> [f64; 4] {
    let mut out = [0.0; 4];
    for (i, cross) in out.iter_mut().enumerate() {
        let a = pts[i];
        let b = pts[(i + 1) % 4];
        let c = pts[(i + 2) % 4];
        let (e0x, e0y) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
        let (e1x, e1y) = ((c.x - b.x) as f64, (c.y - b.y) as f64);
        *cross = e0x * e1y - e0y * e1x;
    }
    out
}

/// Strict convexity: all four turns share one sign. A zero turn rejects.
pub fn is_convex(pts: &[Point2<f32>; 4]) -> bool {
    let turns = turn_cross_products(pts);
    turns.iter().all(|&c| c > 0.0) || turns.iter().all(|&c| c < 0.0)
}

/// Canonical TL, TR, BR, BL order.
///
/// TL minimizes `x + y`, TR minimizes `y - x`, BR maximizes `x + y` and BL
/// maximizes `y - x`.
pub fn order_clockwise(pts: [Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let sum = |p: &Point2<f32>| p.x + p.y;
    let diff = |p: &Point2<f32>| p.y - p.x;

    let pick = |key: &dyn Fn(&Point2<f32>) -> f32, want_max: bool| -> Point2<f32> {
        let mut best = pts[0];
        for p in &pts[1..] {
            let better = if want_max {
                key(p) > key(&best)
            } else {
                key(p) < key(&best)
            };
            if better {
                best = *p;
            }
        }
        best
    };

    [
        pick(&sum, false),
        pick(&diff, false),
        pick(&sum, true),
        pick(&diff, true),
    ]
}

/// Bounds on `observed_aspect / reference_aspect` for a plausible view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryLimits {
    pub min_aspect_distortion: f32,
    pub max_aspect_distortion: f32,
}

impl Default for GeometryLimits {
    fn default() -> Self {
        Self {
            min_aspect_distortion: 0.3,
            max_aspect_distortion: 3.0,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum QuadRejection {
    #[error("quadrilateral is not convex")]
    NonConvex,
    #[error("aspect distortion {distortion} outside plausible range")]
    AspectDistortion { distortion: f32 },
}

impl From<QuadRejection> for RejectReason {
    fn from(r: QuadRejection) -> Self {
        match r {
            QuadRejection::NonConvex => RejectReason::NonConvex,
            QuadRejection::AspectDistortion { .. } => RejectReason::AspectDistortion,
        }
    }
}

/// Convexity and aspect plausibility of a projected reference rectangle.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeometryValidator {
    limits: GeometryLimits,
}

impl GeometryValidator {
    pub fn new(limits: GeometryLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &GeometryLimits {
        &self.limits
    }

    /// Check `quad` against a reference width/height ratio.
    pub fn check(&self, quad: &Quadrilateral, reference_aspect: f32) -> Result<(), QuadRejection> {
        if !quad.is_convex() {
            return Err(QuadRejection::NonConvex);
        }
        let distortion = quad.aspect_ratio() / reference_aspect;
        let ok = distortion.is_finite()
            && distortion >= self.limits.min_aspect_distortion
            && distortion <= self.limits.max_aspect_distortion;
        if ok {
            Ok(())
        } else {
            Err(QuadRejection::AspectDistortion { distortion })
        }
    }

    pub fn validate(&self, quad: &Quadrilateral, reference_aspect: f32) -> bool {
        self.check(quad, reference_aspect).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Quadrilateral {
        Quadrilateral::new([
            Point2::new(x, y),
            Point2::new(x + w, y),
            Point2::new(x + w, y + h),
            Point2::new(x, y + h),
        ])
    }

    #[test]
    fn clockwise_in_y_down_frame_has_positive_turns() {
        let q = rect(10.0, 20.0, 40.0, 30.0);
        assert!(turn_cross_products(&q.corners).iter().all(|&c| c > 0.0));
        let mut reversed = q.corners;
        reversed.reverse();
        assert!(turn_cross_products(&reversed).iter().all(|&c| c < 0.0));
        assert!(is_convex(&reversed));
    }

    #[test]
    fn ordering_is_idempotent() {
        let q = rect(5.0, 7.0, 100.0, 60.0);
        assert_eq!(order_clockwise(q.corners), q.corners);
        assert_eq!(order_clockwise(order_clockwise(q.corners)), q.corners);
    }

    #[test]
    fn ordering_sorts_shuffled_perspective_quad() {
        let tl = Point2::new(12.0_f32, 15.0);
        let tr = Point2::new(180.0, 30.0);
        let br = Point2::new(170.0, 220.0);
        let bl = Point2::new(20.0, 200.0);
        assert_eq!(order_clockwise([br, tl, bl, tr]), [tl, tr, br, bl]);
        assert_eq!(Quadrilateral::from_unordered([bl, br, tr, tl]).corners, [tl, tr, br, bl]);
    }

    #[test]
    fn reflex_vertex_is_rejected() {
        let dart = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(30.0, 30.0),
            Point2::new(0.0, 100.0),
        ];
        assert!(!is_convex(&dart));
    }

    #[test]
    fn self_intersecting_and_collapsed_are_rejected() {
        let bow_tie = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(100.0, 100.0),
            Point2::new(100.0, 0.0),
            Point2::new(0.0, 100.0),
        ];
        assert!(!is_convex(&bow_tie));
        let flat = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(50.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(0.0, 100.0),
        ];
        assert!(!is_convex(&flat));
    }

    #[test]
    fn metrics_of_axis_aligned_rectangle() {
        let q = rect(0.0, 0.0, 40.0, 20.0);
        assert_eq!(q.edge_lengths(), [40.0, 20.0, 40.0, 20.0]);
        assert_eq!(q.perimeter(), 120.0);
        assert_eq!(q.area(), 800.0);
        assert_eq!(q.aspect_ratio(), 2.0);
        assert_eq!(q.center(), Point2::new(20.0, 10.0));
        assert_eq!(q.top_edge_angle(), 0.0);
    }

    #[test]
    fn aspect_filter_bounds() {
        let v = GeometryValidator::default();
        let q = rect(0.0, 0.0, 90.0, 60.0); // aspect 1.5
        assert!(v.validate(&q, 1.5));
        assert!(v.validate(&q, 1.5 / 3.0));
        assert!(matches!(
            v.check(&q, 1.5 / 3.2),
            Err(QuadRejection::AspectDistortion { .. })
        ));
        assert!(!v.validate(&q, 1.5 / 0.29));
        assert!(!v.validate(&q, 0.0));
    }

    #[test]
    fn non_convex_reported_before_aspect() {
        let v = GeometryValidator::default();
        let q = Quadrilateral::new([
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(30.0, 30.0),
            Point2::new(0.0, 100.0),
        ]);
        assert_eq!(v.check(&q, 1.0), Err(QuadRejection::NonConvex));
        assert_eq!(RejectReason::from(QuadRejection::NonConvex), RejectReason::NonConvex);
    }
}
