use std::ffi::CStr;
use std::io::Cursor;
use std::ptr;

use image::{GrayImage, ImageFormat, Luma};
use planar_locate_ffi::*;

fn sheet(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let inside = (93..306).contains(&x) && (49..350).contains(&y);
        Luma([if inside { 220 } else { 30 }])
    })
}

fn png_bytes(img: &GrayImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[test]
fn version_is_nul_terminated() {
    let v = unsafe { CStr::from_ptr(hg_lib_version()) };
    assert_eq!(v.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
}

#[test]
fn null_pointers_are_invalid_input() {
    let r = unsafe { hg_find_homography(ptr::null(), 10, ptr::null(), 10) };
    assert_eq!(r.status, -1);

    let r = unsafe { hg_find_homography_raw(ptr::null(), 4, 4, 1, ptr::null(), 4, 4, 1) };
    assert_eq!(r.status, -1);

    let xs = [0.0f32; 4];
    let r = unsafe {
        hg_find_homography_from_points(xs.as_ptr(), ptr::null(), xs.as_ptr(), xs.as_ptr(), 4, 10, 10)
    };
    assert_eq!(r.status, -1);

    let r = unsafe { hg_detect_paper(ptr::null(), 10, 10, 1, ptr::null()) };
    assert_eq!(r.status, -1);
    let r = unsafe { hg_detect_paper_encoded(ptr::null(), 0, ptr::null()) };
    assert_eq!(r.status, -1);
}

#[test]
fn raw_inputs_are_validated() {
    let px = [0u8; 16];
    let r = unsafe { hg_find_homography_raw(px.as_ptr(), 4, 4, 2, px.as_ptr(), 4, 4, 1) };
    assert_eq!(r.status, -1);
    let r = unsafe { hg_find_homography_raw(px.as_ptr(), -4, 4, 1, px.as_ptr(), 4, 4, 1) };
    assert_eq!(r.status, -1);
    let r = unsafe { hg_detect_paper(px.as_ptr(), 4, 0, 1, ptr::null()) };
    assert_eq!(r.status, -1);
}

#[test]
fn three_points_echo_count() {
    let xs = [1.0f32, 2.0, 3.0];
    let ys = [4.0f32, 8.0, 5.0];
    let r = unsafe {
        hg_find_homography_from_points(xs.as_ptr(), ys.as_ptr(), xs.as_ptr(), ys.as_ptr(), 3, 0, 0)
    };
    assert_eq!(r.status, 0);
    assert_eq!(r.num_matches, 3);
}

#[test]
fn translated_points_are_found() {
    let mut ax = Vec::new();
    let mut ay = Vec::new();
    for r in 0..4 {
        for c in 0..5 {
            ax.push(10.0 + 20.0 * c as f32);
            ay.push(12.0 + 25.0 * r as f32);
        }
    }
    let sx: Vec<f32> = ax.iter().map(|x| x + 40.0).collect();
    let sy: Vec<f32> = ay.iter().map(|y| y + 30.0).collect();
    let r = unsafe {
        hg_find_homography_from_points(
            ax.as_ptr(),
            ay.as_ptr(),
            sx.as_ptr(),
            sy.as_ptr(),
            ax.len() as i32,
            100,
            100,
        )
    };
    assert_eq!(r.status, 1);
    assert_eq!(r.num_matches, 20);
    assert!((r.center_x - 90.0).abs() < 1e-2 && (r.center_y - 80.0).abs() < 1e-2);
    assert!((r.scale - 1.0).abs() < 1e-3);
    assert!((r.homography[2] - 40.0).abs() < 1e-2);
}

#[test]
fn default_config_is_a4() {
    let cfg = hg_default_paper_config();
    assert_eq!(cfg.canny_threshold1, 50);
    assert_eq!(cfg.canny_threshold2, 150);
    assert_eq!(cfg.blur_kernel_size, 5);
    assert_eq!(cfg.paper_width_mm, 210.0);
    assert_eq!(cfg.paper_height_mm, 297.0);
    assert_eq!(cfg.focal_length, 0.0);
    assert!((cfg.expected_aspect_ratio - 210.0 / 297.0).abs() < 1e-6);
}

#[test]
fn paper_in_rgba_buffer() {
    let gray = sheet(400, 400);
    let rgba: Vec<u8> = gray.as_raw().iter().flat_map(|&v| [v, v, v, 255]).collect();
    let r = unsafe { hg_detect_paper(rgba.as_ptr(), 400, 400, 4, ptr::null()) };
    assert_eq!(r.status, 1);
    assert!((r.center_x - 199.5).abs() < 3.0);
    assert_eq!(r.rvec, [0.0; 3]);
}

#[test]
fn paper_encoded_with_pose() {
    let png = png_bytes(&sheet(400, 400));
    let cfg = PaperDetectionConfig {
        focal_length: 600.0,
        ..hg_default_paper_config()
    };
    let r = unsafe { hg_detect_paper_encoded(png.as_ptr(), png.len(), &cfg) };
    assert_eq!(r.status, 1);
    assert!(r.tvec[2] > 0.0, "tvec {:?}", r.tvec);

    let garbage = [1u8, 2, 3];
    let r = unsafe { hg_detect_paper_encoded(garbage.as_ptr(), garbage.len(), &cfg) };
    assert_eq!(r.status, -1);
}

#[test]
fn encoded_anchor_decode_failure() {
    let png = png_bytes(&sheet(400, 400));
    let garbage = [9u8; 32];
    let r = unsafe { hg_find_homography(garbage.as_ptr(), garbage.len(), png.as_ptr(), png.len()) };
    assert_eq!(r.status, -2);
    let r = unsafe { hg_find_homography(png.as_ptr(), png.len(), garbage.as_ptr(), garbage.len()) };
    assert_eq!(r.status, -3);
}
