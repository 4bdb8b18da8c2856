//! Intensity-centroid orientation and steered BRIEF.

use planar_locate_core::GrayImageView;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::Descriptor;

const PATTERN_SEED: u64 = 0x0b5_2011;
const PATTERN_RADIUS: i8 = 13;

/// Test point pairs `(x1, y1, x2, y2)` relative to the keypoint.
#[derive(Clone, Debug)]
pub(crate) struct BriefPattern {
    pairs: Vec<[i8; 4]>,
}

impl BriefPattern {
    /// Fixed 256-pair pattern drawn uniformly inside a 27x27 window.
    pub fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let mut pairs = Vec::with_capacity(256);
        while pairs.len() < 256 {
            let p: [i8; 4] =
                std::array::from_fn(|_| rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS));
            if p[0] != p[2] || p[1] != p[3] {
                pairs.push(p);
            }
        }
        Self { pairs }
    }

    /// Farthest a rotated test point can land from the keypoint, in pixels.
    pub fn reach() -> usize {
        // 13 * sqrt(2), rounded up
        19
    }

    /// Descriptor at integer `(x, y)` of a smoothed image, steered by `angle`.
    ///
    /// The caller keeps `(x, y)` at least [`BriefPattern::reach`] pixels from every edge.
    pub fn describe(
        &self,
        smoothed: &GrayImageView<'_>,
        x: usize,
        y: usize,
        angle: f32,
    ) -> Descriptor {
        let (sin, cos) = angle.sin_cos();
        let sample = |dx: i8, dy: i8| {
            let rx = (dx as f32 * cos - dy as f32 * sin).round() as isize;
            let ry = (dx as f32 * sin + dy as f32 * cos).round() as isize;
            smoothed.get((x as isize + rx) as usize, (y as isize + ry) as usize)
        };

        let mut out = [0u8; 32];
        for (byte, chunk) in out.iter_mut().zip(self.pairs.chunks(8)) {
            for (bit, p) in chunk.iter().enumerate() {
                if sample(p[0], p[1]) < sample(p[2], p[3]) {
                    *byte |= 1 << bit;
                }
            }
        }
        out
    }
}

/// Angle of the intensity centroid of the disc of `radius` around `(x, y)`.
pub(crate) fn intensity_centroid_angle(
    img: &GrayImageView<'_>,
    x: usize,
    y: usize,
    radius: isize,
) -> f32 {
    let (mut m01, mut m10) = (0i64, 0i64);
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let v = img.get((x as isize + dx) as usize, (y as isize + dy) as usize) as i64;
            m10 += dx as i64 * v;
            m01 += dy as i64 * v;
        }
    }
    (m01 as f32).atan2(m10 as f32)
}
