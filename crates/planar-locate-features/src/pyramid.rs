use image::imageops::{resize, FilterType};
use imageproc::filter::gaussian_blur_f32;
use planar_locate_core::{GrayImage, GrayImageView};

const DESCRIPTOR_BLUR_SIGMA: f32 = 1.0;

pub(crate) struct PyramidLevel {
    pub image: GrayImage,
    /// Full-resolution pixels per level pixel.
    pub scale: f32,
}

/// Successive bilinear reductions by `scale_factor`, stopping once a level
/// would be smaller than `min_side` pixels on either axis.
pub(crate) fn build_pyramid(
    src: &GrayImageView<'_>,
    levels: usize,
    scale_factor: f32,
    min_side: usize,
) -> Vec<PyramidLevel> {
    let mut out = Vec::with_capacity(levels);
    if src.width < min_side || src.height < min_side || levels == 0 {
        return out;
    }
    out.push(PyramidLevel {
        image: GrayImage {
            width: src.width,
            height: src.height,
            data: src.data.to_vec(),
        },
        scale: 1.0,
    });

    let mut scale = 1.0_f32;
    for _ in 1..levels {
        scale *= scale_factor;
        let w = (src.width as f32 / scale).round() as usize;
        let h = (src.height as f32 / scale).round() as usize;
        if w < min_side || h < min_side {
            break;
        }
        let Some(prev) = out.last() else {
            break;
        };
        let Some(image) = resize_bilinear(&prev.image.view(), w, h) else {
            break;
        };
        out.push(PyramidLevel { image, scale });
    }
    out
}

fn to_buffer(src: &GrayImageView<'_>) -> Option<image::GrayImage> {
    image::GrayImage::from_raw(src.width as u32, src.height as u32, src.data.to_vec())
}

fn from_buffer(buf: image::GrayImage) -> GrayImage {
    let (width, height) = buf.dimensions();
    GrayImage {
        width: width as usize,
        height: height as usize,
        data: buf.into_raw(),
    }
}

fn resize_bilinear(src: &GrayImageView<'_>, w: usize, h: usize) -> Option<GrayImage> {
    let buf = to_buffer(src)?;
    Some(from_buffer(resize(&buf, w as u32, h as u32, FilterType::Triangle)))
}

/// Gaussian pre-smoothing for descriptor sampling.
pub(crate) fn smooth(src: &GrayImageView<'_>) -> GrayImage {
    match to_buffer(src) {
        Some(buf) => from_buffer(gaussian_blur_f32(&buf, DESCRIPTOR_BLUR_SIGMA)),
        None => GrayImage {
            width: src.width,
            height: src.height,
            data: src.data.to_vec(),
        },
    }
}
