//! C ABI over the `planar-locate` facade.
//!
//! Every entry point returns its result struct by value and never unwinds:
//! null pointers and bad sizes become `status = -1`, and a panic inside the
//! pipeline is caught and reported the same way.

use std::ffi::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::slice;

use nalgebra::Point2;
use planar_locate::detect::{self, RawImage};
use planar_locate::report::{HomographyReport, PaperReport, Status};
use planar_locate::{AnchorMatchParams, PaperDetectionConfig as Config};

/// Anchor-in-scene result. Field order and types are part of the ABI.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HomographyResult {
    pub center_x: f32,
    pub center_y: f32,
    /// Radians, clockwise on screen.
    pub rotation: f32,
    pub scale: f32,
    /// Row-major anchor-to-scene homography.
    pub homography: [f64; 9],
    /// TL, TR, BR, BL as `[x0, y0, .., x3, y3]`.
    pub corners: [f32; 8],
    pub num_matches: c_int,
    /// 1 found, 0 not found, -1 invalid input, -2 anchor decode, -3 scene decode.
    pub status: c_int,
}

impl From<&HomographyReport> for HomographyResult {
    fn from(r: &HomographyReport) -> Self {
        Self {
            center_x: r.center_x,
            center_y: r.center_y,
            rotation: r.rotation,
            scale: r.scale,
            homography: r.homography,
            corners: r.corners,
            num_matches: r.num_matches,
            status: r.status,
        }
    }
}

impl HomographyResult {
    fn with_status(status: Status) -> Self {
        Self {
            status: status.code(),
            ..Self::default()
        }
    }
}

/// Paper detection result. `rvec`/`tvec` are zero when no pose was solved.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PaperDetectionResult {
    pub corners: [f32; 8],
    pub center_x: f32,
    pub center_y: f32,
    /// Row-major canonical-millimetre-to-image homography.
    pub homography: [f64; 9],
    pub rvec: [f64; 3],
    pub tvec: [f64; 3],
    pub area: f32,
    pub perimeter: f32,
    /// Short side over long side.
    pub aspect_ratio: f32,
    /// 1 found, 0 not found, -1 invalid input or undecodable image.
    pub status: c_int,
}

impl From<&PaperReport> for PaperDetectionResult {
    fn from(r: &PaperReport) -> Self {
        Self {
            corners: r.corners,
            center_x: r.center_x,
            center_y: r.center_y,
            homography: r.homography,
            rvec: r.rvec,
            tvec: r.tvec,
            area: r.area,
            perimeter: r.perimeter,
            aspect_ratio: r.aspect_ratio,
            status: r.status,
        }
    }
}

impl PaperDetectionResult {
    fn invalid() -> Self {
        Self {
            status: Status::InvalidInput.code(),
            ..Self::default()
        }
    }
}

/// Paper detection settings. Zero `focal_length` skips pose; zero `cx`/`cy`
/// use the image center.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaperDetectionConfig {
    pub canny_threshold1: c_int,
    pub canny_threshold2: c_int,
    /// Odd kernel size, 0 disables smoothing.
    pub blur_kernel_size: c_int,
    pub min_area_ratio: f32,
    pub max_area_ratio: f32,
    pub expected_aspect_ratio: f32,
    pub aspect_ratio_tolerance: f32,
    pub paper_width_mm: f32,
    pub paper_height_mm: f32,
    pub focal_length: f32,
    pub cx: f32,
    pub cy: f32,
}

impl From<&Config> for PaperDetectionConfig {
    fn from(c: &Config) -> Self {
        Self {
            canny_threshold1: c.canny_low.round() as c_int,
            canny_threshold2: c.canny_high.round() as c_int,
            blur_kernel_size: c.blur_kernel_size as c_int,
            min_area_ratio: c.min_area_ratio,
            max_area_ratio: c.max_area_ratio,
            expected_aspect_ratio: c.expected_aspect_ratio,
            aspect_ratio_tolerance: c.aspect_tolerance,
            paper_width_mm: c.paper_width_mm,
            paper_height_mm: c.paper_height_mm,
            focal_length: c.focal_length_px,
            cx: c.principal_point_x,
            cy: c.principal_point_y,
        }
    }
}

impl From<&PaperDetectionConfig> for Config {
    fn from(c: &PaperDetectionConfig) -> Self {
        Self {
            canny_low: c.canny_threshold1 as f32,
            canny_high: c.canny_threshold2 as f32,
            blur_kernel_size: u32::try_from(c.blur_kernel_size).unwrap_or(0),
            min_area_ratio: c.min_area_ratio,
            max_area_ratio: c.max_area_ratio,
            expected_aspect_ratio: c.expected_aspect_ratio,
            aspect_tolerance: c.aspect_ratio_tolerance,
            paper_width_mm: c.paper_width_mm,
            paper_height_mm: c.paper_height_mm,
            focal_length_px: c.focal_length,
            principal_point_x: c.cx,
            principal_point_y: c.cy,
        }
    }
}

fn guarded<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        log::error!("planar-locate: panic caught at the C boundary");
        fallback
    })
}

/// Borrow `len` bytes, `None` for a null pointer or zero length.
///
/// # Safety
/// A non-null `ptr` must be valid for reads of `len` bytes.
unsafe fn bytes<'a>(ptr: *const u8, len: usize) -> Option<&'a [u8]> {
    if ptr.is_null() || len == 0 {
        return None;
    }
    Some(unsafe { slice::from_raw_parts(ptr, len) })
}

/// Borrow a raw interleaved image, validating sizes before touching memory.
///
/// # Safety
/// A non-null `ptr` must be valid for reads of `width * height * channels` bytes.
unsafe fn raw_image<'a>(
    ptr: *const u8,
    width: c_int,
    height: c_int,
    channels: c_int,
) -> Option<RawImage<'a>> {
    let w = u32::try_from(width).ok().filter(|&w| w > 0)?;
    let h = u32::try_from(height).ok().filter(|&h| h > 0)?;
    let c = u32::try_from(channels).ok().filter(|c| matches!(c, 1 | 3 | 4))?;
    let len = (w as usize).checked_mul(h as usize)?.checked_mul(c as usize)?;
    let data = unsafe { bytes(ptr, len) }?;
    Some(RawImage::new(data, w, h, c))
}

/// Locate an encoded (PNG/JPEG) anchor inside an encoded scene.
///
/// # Safety
/// Non-null pointers must be valid for reads of the given sizes.
#[no_mangle]
pub unsafe extern "C" fn hg_find_homography(
    anchor_bytes: *const u8,
    anchor_size: usize,
    scene_bytes: *const u8,
    scene_size: usize,
) -> HomographyResult {
    let invalid = HomographyResult::with_status(Status::InvalidInput);
    let anchor = unsafe { bytes(anchor_bytes, anchor_size) };
    let scene = unsafe { bytes(scene_bytes, scene_size) };
    let (Some(anchor), Some(scene)) = (anchor, scene) else {
        return invalid;
    };
    guarded(invalid, || {
        let outcome = detect::match_encoded_images(anchor, scene, &AnchorMatchParams::default());
        HomographyResult::from(&HomographyReport::from_outcome(&outcome))
    })
}

/// Locate a raw (1, 3 or 4 channel) anchor inside a raw scene.
///
/// # Safety
/// Non-null pointers must be valid for reads of `width * height * channels` bytes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn hg_find_homography_raw(
    anchor_data: *const u8,
    anchor_width: c_int,
    anchor_height: c_int,
    anchor_channels: c_int,
    scene_data: *const u8,
    scene_width: c_int,
    scene_height: c_int,
    scene_channels: c_int,
) -> HomographyResult {
    let invalid = HomographyResult::with_status(Status::InvalidInput);
    let anchor = unsafe { raw_image(anchor_data, anchor_width, anchor_height, anchor_channels) };
    let scene = unsafe { raw_image(scene_data, scene_width, scene_height, scene_channels) };
    let (Some(anchor), Some(scene)) = (anchor, scene) else {
        return invalid;
    };
    guarded(invalid, || {
        let outcome = detect::match_raw_images(anchor, scene, &AnchorMatchParams::default());
        HomographyResult::from(&HomographyReport::from_outcome(&outcome))
    })
}

/// Anchor placement from externally matched points (`pts0` anchor, `pts1` scene).
///
/// Fewer than four points give `status = 0` with `num_matches = num_points`.
///
/// # Safety
/// Non-null pointers must each be valid for reads of `num_points` floats.
#[no_mangle]
pub unsafe extern "C" fn hg_find_homography_from_points(
    pts0_x: *const f32,
    pts0_y: *const f32,
    pts1_x: *const f32,
    pts1_y: *const f32,
    num_points: c_int,
    anchor_width: c_int,
    anchor_height: c_int,
) -> HomographyResult {
    let invalid = HomographyResult::with_status(Status::InvalidInput);
    if pts0_x.is_null() || pts0_y.is_null() || pts1_x.is_null() || pts1_y.is_null() {
        return invalid;
    }
    if num_points < 4 {
        return HomographyResult {
            num_matches: num_points,
            ..HomographyResult::with_status(Status::NotFound)
        };
    }
    if anchor_width <= 0 || anchor_height <= 0 {
        return invalid;
    }
    let n = num_points as usize;
    let read = |xs: *const f32, ys: *const f32| -> Vec<Point2<f32>> {
        let xs = unsafe { slice::from_raw_parts(xs, n) };
        let ys = unsafe { slice::from_raw_parts(ys, n) };
        xs.iter().zip(ys).map(|(&x, &y)| Point2::new(x, y)).collect()
    };
    let anchor = read(pts0_x, pts0_y);
    let scene = read(pts1_x, pts1_y);
    guarded(invalid, || {
        let outcome = detect::match_from_points(
            &anchor,
            &scene,
            anchor_width as f32,
            anchor_height as f32,
            &AnchorMatchParams::default(),
        );
        HomographyResult::from(&HomographyReport::from_outcome(&outcome))
    })
}

/// NUL-terminated library version with static lifetime.
#[no_mangle]
pub extern "C" fn hg_lib_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

/// Resolve an optional config pointer; null means A4 defaults.
///
/// # Safety
/// A non-null `config` must point to a valid `PaperDetectionConfig`.
unsafe fn paper_config(config: *const PaperDetectionConfig) -> Config {
    match unsafe { config.as_ref() } {
        Some(c) => Config::from(c),
        None => detect::default_paper_config(),
    }
}

/// Detect a sheet of paper in a raw (1, 3 or 4 channel) image.
///
/// # Safety
/// `image_data` must be valid for reads of `width * height * channels` bytes
/// and a non-null `config` must point to a valid struct.
#[no_mangle]
pub unsafe extern "C" fn hg_detect_paper(
    image_data: *const u8,
    image_width: c_int,
    image_height: c_int,
    image_channels: c_int,
    config: *const PaperDetectionConfig,
) -> PaperDetectionResult {
    let Some(image) = (unsafe { raw_image(image_data, image_width, image_height, image_channels) })
    else {
        return PaperDetectionResult::invalid();
    };
    let cfg = unsafe { paper_config(config) };
    guarded(PaperDetectionResult::invalid(), || {
        let outcome = detect::detect_paper_raw(image, &cfg);
        PaperDetectionResult::from(&PaperReport::from_outcome(&outcome))
    })
}

/// Detect a sheet of paper in an encoded image.
///
/// # Safety
/// A non-null `image_bytes` must be valid for reads of `image_size` bytes and
/// a non-null `config` must point to a valid struct.
#[no_mangle]
pub unsafe extern "C" fn hg_detect_paper_encoded(
    image_bytes: *const u8,
    image_size: usize,
    config: *const PaperDetectionConfig,
) -> PaperDetectionResult {
    let Some(bytes) = (unsafe { bytes(image_bytes, image_size) }) else {
        return PaperDetectionResult::invalid();
    };
    let cfg = unsafe { paper_config(config) };
    guarded(PaperDetectionResult::invalid(), || {
        let outcome = detect::detect_paper_encoded(bytes, &cfg);
        PaperDetectionResult::from(&PaperReport::from_outcome(&outcome))
    })
}

/// A4 defaults with pose estimation disabled.
#[no_mangle]
pub extern "C" fn hg_default_paper_config() -> PaperDetectionConfig {
    PaperDetectionConfig::from(&detect::default_paper_config())
}
