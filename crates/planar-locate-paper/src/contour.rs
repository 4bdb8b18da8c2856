//! Outer borders of the edge map and their polygonal simplification.

use image::GrayImage;
use imageproc::{
    contours::{find_contours, BorderType},
    geometry::{approximate_polygon_dp, arc_length},
    point::Point,
};

/// Outer borders that are not nested inside another border.
pub(crate) fn external_contours(edges: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

/// Douglas-Peucker simplification of a closed contour with tolerance
/// `epsilon_frac` times its perimeter.
///
/// Empty contours and contours without extent yield no polygon.
pub(crate) fn approximate_polygon(contour: &[Point<i32>], epsilon_frac: f64) -> Vec<Point<i32>> {
    let epsilon = epsilon_frac * arc_length(contour, true);
    if contour.len() < 3 || epsilon <= 0.0 {
        return Vec::new();
    }
    approximate_polygon_dp(contour, epsilon, true)
}
