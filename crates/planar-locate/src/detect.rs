//! End-to-end entry points over encoded, raw and point-array inputs.
//!
//! Input problems are returned as [`DetectError`]; a well-formed input that
//! simply does not contain the target is `Ok(Detection::NotFound(..))`.

use std::fmt;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use nalgebra::Point2;

use crate::anchor::{AnchorMatch, AnchorMatchParams, AnchorMatcher};
use crate::core::{Detection, GrayImageView, PointCorrespondence};
use crate::paper::{PaperDetection, PaperDetectionConfig, PaperDetector};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Which input an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRole {
    Anchor,
    Scene,
    Image,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageRole::Anchor => "anchor",
            ImageRole::Scene => "scene",
            ImageRole::Image => "image",
        })
    }
}

/// Errors produced by the facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("{role} buffer is empty")]
    EmptyBuffer { role: ImageRole },

    #[error("invalid {role} dimensions (width={width}, height={height})")]
    InvalidDimensions {
        role: ImageRole,
        width: u32,
        height: u32,
    },

    #[error("unsupported {role} channel count {channels} (expected 1, 3 or 4)")]
    InvalidChannels { role: ImageRole, channels: u32 },

    #[error("{role} buffer too small (expected {expected} bytes, got {got})")]
    BufferTooSmall {
        role: ImageRole,
        expected: usize,
        got: usize,
    },

    #[error("failed to decode {role} image")]
    Decode {
        role: ImageRole,
        #[source]
        source: image::ImageError,
    },

    #[error("point arrays differ in length (anchor {anchor}, scene {scene})")]
    MismatchedPointArrays { anchor: usize, scene: usize },

    #[error("anchor size must be positive and finite (width={width}, height={height})")]
    InvalidAnchorSize { width: f32, height: f32 },
}

impl DetectError {
    pub fn role(&self) -> Option<ImageRole> {
        match self {
            DetectError::EmptyBuffer { role }
            | DetectError::InvalidDimensions { role, .. }
            | DetectError::InvalidChannels { role, .. }
            | DetectError::BufferTooSmall { role, .. }
            | DetectError::Decode { role, .. } => Some(*role),
            DetectError::MismatchedPointArrays { .. } | DetectError::InvalidAnchorSize { .. } => {
                None
            }
        }
    }
}

/// Uncompressed interleaved 8-bit pixels: 1 = gray, 3 = RGB, 4 = RGBA.
#[derive(Clone, Copy, Debug)]
pub struct RawImage<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl<'a> RawImage<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, channels: u32) -> Self {
        Self {
            data,
            width,
            height,
            channels,
        }
    }
}

/// A4 paper defaults.
pub fn default_paper_config() -> PaperDetectionConfig {
    PaperDetectionConfig::a4()
}

/// Borrow an `image::GrayImage` as a core view.
pub fn gray_view(img: &GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Decode a JPEG/PNG (or any format enabled in `image`) straight to grayscale.
pub fn decode_gray(bytes: &[u8], role: ImageRole) -> Result<GrayImage, DetectError> {
    if bytes.is_empty() {
        return Err(DetectError::EmptyBuffer { role });
    }
    let img = image::load_from_memory(bytes).map_err(|source| DetectError::Decode { role, source })?;
    let gray = img.into_luma8();
    if gray.width() == 0 || gray.height() == 0 {
        return Err(DetectError::InvalidDimensions {
            role,
            width: gray.width(),
            height: gray.height(),
        });
    }
    Ok(gray)
}

/// Copy a raw buffer into a grayscale image, converting color with luma weights.
///
/// Bytes past `width * height * channels` are ignored.
pub fn gray_from_raw(raw: RawImage<'_>, role: ImageRole) -> Result<GrayImage, DetectError> {
    let RawImage {
        data,
        width,
        height,
        channels,
    } = raw;
    if width == 0 || height == 0 {
        return Err(DetectError::InvalidDimensions {
            role,
            width,
            height,
        });
    }
    if !matches!(channels, 1 | 3 | 4) {
        return Err(DetectError::InvalidChannels { role, channels });
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels as usize))
        .ok_or(DetectError::InvalidDimensions {
            role,
            width,
            height,
        })?;
    if data.is_empty() {
        return Err(DetectError::EmptyBuffer { role });
    }
    if data.len() < expected {
        return Err(DetectError::BufferTooSmall {
            role,
            expected,
            got: data.len(),
        });
    }

    let pixels = data[..expected].to_vec();
    let gray = match channels {
        1 => GrayImage::from_raw(width, height, pixels),
        3 => RgbImage::from_raw(width, height, pixels).map(|rgb| DynamicImage::ImageRgb8(rgb).into_luma8()),
        _ => RgbaImage::from_raw(width, height, pixels)
            .map(|rgba| DynamicImage::ImageRgba8(rgba).into_luma8()),
    };
    gray.ok_or(DetectError::InvalidDimensions {
        role,
        width,
        height,
    })
}

/// Locate an encoded anchor image inside an encoded scene image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(anchor_bytes = anchor.len(), scene_bytes = scene.len()))
)]
pub fn match_encoded_images(
    anchor: &[u8],
    scene: &[u8],
    params: &AnchorMatchParams,
) -> Result<Detection<AnchorMatch>, DetectError> {
    let anchor = decode_gray(anchor, ImageRole::Anchor)?;
    let scene = decode_gray(scene, ImageRole::Scene)?;
    Ok(match_gray_images(&anchor, &scene, params))
}

/// Locate a raw anchor buffer inside a raw scene buffer.
pub fn match_raw_images(
    anchor: RawImage<'_>,
    scene: RawImage<'_>,
    params: &AnchorMatchParams,
) -> Result<Detection<AnchorMatch>, DetectError> {
    let anchor = gray_from_raw(anchor, ImageRole::Anchor)?;
    let scene = gray_from_raw(scene, ImageRole::Scene)?;
    Ok(match_gray_images(&anchor, &scene, params))
}

/// Locate the anchor using the built-in ORB extractor and Hamming matcher.
pub fn match_gray_images(
    anchor: &GrayImage,
    scene: &GrayImage,
    params: &AnchorMatchParams,
) -> Detection<AnchorMatch> {
    AnchorMatcher::new(*params).find_anchor(&gray_view(anchor), &gray_view(scene))
}

/// Locate the anchor from externally matched points (`anchor[i]` pairs with `scene[i]`).
///
/// Fewer than four pairs are a `NotFound` carrying the pair count, checked
/// before the anchor size.
pub fn match_from_points(
    anchor: &[Point2<f32>],
    scene: &[Point2<f32>],
    anchor_width: f32,
    anchor_height: f32,
    params: &AnchorMatchParams,
) -> Result<Detection<AnchorMatch>, DetectError> {
    if anchor.len() != scene.len() {
        return Err(DetectError::MismatchedPointArrays {
            anchor: anchor.len(),
            scene: scene.len(),
        });
    }
    let matcher = AnchorMatcher::new(*params);
    let correspondences: Vec<PointCorrespondence> = anchor
        .iter()
        .zip(scene)
        .map(|(&a, &s)| PointCorrespondence::new(a, s))
        .collect();
    if correspondences.len() < 4 {
        return Ok(matcher.find_anchor_from_correspondences(
            &correspondences,
            anchor_width,
            anchor_height,
        ));
    }
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if !valid(anchor_width) || !valid(anchor_height) {
        return Err(DetectError::InvalidAnchorSize {
            width: anchor_width,
            height: anchor_height,
        });
    }
    Ok(matcher.find_anchor_from_correspondences(&correspondences, anchor_width, anchor_height))
}

/// Detect a sheet of paper in a raw buffer.
pub fn detect_paper_raw(
    image: RawImage<'_>,
    config: &PaperDetectionConfig,
) -> Result<Detection<PaperDetection>, DetectError> {
    let gray = gray_from_raw(image, ImageRole::Image)?;
    Ok(PaperDetector::new(*config).detect(&gray))
}

/// Detect a sheet of paper in an encoded image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(bytes = bytes.len()))
)]
pub fn detect_paper_encoded(
    bytes: &[u8],
    config: &PaperDetectionConfig,
) -> Result<Detection<PaperDetection>, DetectError> {
    let gray = decode_gray(bytes, ImageRole::Image)?;
    Ok(PaperDetector::new(*config).detect(&gray))
}
