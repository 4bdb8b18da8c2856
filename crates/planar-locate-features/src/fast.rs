//! FAST-9 segment test with Harris ranking.

use planar_locate_core::GrayImageView;

/// Bresenham circle of radius 3, clockwise from 12 o'clock.
const CIRCLE: [(isize, isize); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

const ARC_LEN: u32 = 9;
const HARRIS_K: f32 = 0.04;
const HARRIS_BLOCK: isize = 7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Corner {
    pub x: usize,
    pub y: usize,
    pub response: f32,
}

// True when the 16-bit circular mask holds `len` consecutive set bits.
#[inline]
fn has_arc(mask: u16, len: u32) -> bool {
    let mut acc = (mask as u32) | ((mask as u32) << 16);
    for _ in 1..len {
        acc &= acc >> 1;
    }
    acc != 0
}

#[inline]
fn is_fast_corner(img: &GrayImageView<'_>, x: usize, y: usize, threshold: u8) -> bool {
    let c = img.get(x, y);
    let hi = c.saturating_add(threshold);
    let lo = c.saturating_sub(threshold);

    // Any 9-arc covers at least two of the four compass points.
    let compass = [0usize, 4, 8, 12].map(|i| {
        let (dx, dy) = CIRCLE[i];
        img.get((x as isize + dx) as usize, (y as isize + dy) as usize)
    });
    let bright = compass.iter().filter(|&&p| p > hi).count();
    let dark = compass.iter().filter(|&&p| p < lo).count();
    if bright < 2 && dark < 2 {
        return false;
    }

    let mut bright_mask = 0u16;
    let mut dark_mask = 0u16;
    for (i, (dx, dy)) in CIRCLE.iter().enumerate() {
        let p = img.get((x as isize + dx) as usize, (y as isize + dy) as usize);
        if p > hi {
            bright_mask |= 1 << i;
        } else if p < lo {
            dark_mask |= 1 << i;
        }
    }
    has_arc(bright_mask, ARC_LEN) || has_arc(dark_mask, ARC_LEN)
}

/// Harris corner measure over a 7x7 block of Sobel gradients.
pub(crate) fn harris_response(img: &GrayImageView<'_>, x: usize, y: usize) -> f32 {
    let r = HARRIS_BLOCK / 2;
    let px = |xx: isize, yy: isize| img.get(xx as usize, yy as usize) as f32;
    let (mut a, mut b, mut c) = (0.0_f32, 0.0_f32, 0.0_f32);
    for dy in -r..=r {
        for dx in -r..=r {
            let (u, v) = (x as isize + dx, y as isize + dy);
            let gx = (px(u + 1, v - 1) + 2.0 * px(u + 1, v) + px(u + 1, v + 1))
                - (px(u - 1, v - 1) + 2.0 * px(u - 1, v) + px(u - 1, v + 1));
            let gy = (px(u - 1, v + 1) + 2.0 * px(u, v + 1) + px(u + 1, v + 1))
                - (px(u - 1, v - 1) + 2.0 * px(u, v - 1) + px(u + 1, v - 1));
            a += gx * gx;
            b += gy * gy;
            c += gx * gy;
        }
    }
    // Normalize so the response does not depend on the block area.
    let norm = 1.0 / (4.0 * HARRIS_BLOCK as f32 * 255.0);
    let (a, b, c) = (a * norm * norm, b * norm * norm, c * norm * norm);
    a * b - c * c - HARRIS_K * (a + b) * (a + b)
}

/// FAST-9 corners at least `border` pixels from every edge, scored by
/// Harris response and thinned by 3x3 non-maximum suppression.
pub(crate) fn detect_corners(img: &GrayImageView<'_>, threshold: u8, border: usize) -> Vec<Corner> {
    let border = border.max(4);
    if img.width <= 2 * border || img.height <= 2 * border {
        return Vec::new();
    }
    let (w, h) = (img.width, img.height);

    let mut score = vec![f32::NEG_INFINITY; w * h];
    let mut candidates = Vec::new();
    for y in border..h - border {
        for x in border..w - border {
            if is_fast_corner(img, x, y, threshold) {
                let response = harris_response(img, x, y);
                score[y * w + x] = response;
                candidates.push(Corner { x, y, response });
            }
        }
    }

    candidates.retain(|c| {
        let s = c.response;
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let idx = (c.y as isize + dy) as usize * w + (c.x as isize + dx) as usize;
                let n = score[idx];
                // Ties go to the earlier pixel in raster order.
                if n > s || (n == s && (dy < 0 || (dy == 0 && dx < 0))) {
                    return false;
                }
            }
        }
        true
    });
    candidates
}

/// Sort strongest first, breaking ties by raster position.
pub(crate) fn sort_by_response(corners: &mut [Corner]) {
    corners.sort_by(|a, b| {
        b.response
            .total_cmp(&a.response)
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });
}
