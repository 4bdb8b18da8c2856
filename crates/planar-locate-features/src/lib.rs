//! Feature oracle used by the anchor matcher.
//!
//! The matcher only talks to the two traits below, so any detector/descriptor
//! pair can be plugged in. [`OrbExtractor`] and [`BruteForceMatcher`] are the
//! built-in implementations: oriented FAST corners ranked by the Harris
//! measure, steered 256-bit BRIEF descriptors, and exhaustive Hamming k-NN.

mod brief;
mod fast;
mod matcher;
mod orb;
mod pyramid;

use nalgebra::Point2;
use planar_locate_core::GrayImageView;
use serde::{Deserialize, Serialize};

pub use matcher::{hamming_distance, BruteForceMatcher};
pub use orb::{OrbExtractor, OrbParams};

/// 256-bit binary descriptor.
pub type Descriptor = [u8; 32];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Position in full-resolution pixel coordinates.
    pub position: Point2<f32>,
    /// Orientation in radians.
    pub angle: f32,
    pub response: f32,
    /// Pyramid level the point was detected on.
    pub octave: u8,
    /// Patch diameter in full-resolution pixels.
    pub size: f32,
}

/// Keypoints with one descriptor each (`keypoints[i]` owns `descriptors[i]`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// One neighbour returned by [`DescriptorMatcher::knn_match`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: u32,
}

/// Detect keypoints and compute their descriptors.
pub trait FeatureExtractor {
    fn detect_and_describe(&self, image: &GrayImageView<'_>) -> Features;
}

/// Nearest-neighbour search between two descriptor sets.
pub trait DescriptorMatcher {
    /// For every query descriptor, up to `k` train neighbours ordered from nearest.
    fn knn_match(
        &self,
        query: &[Descriptor],
        train: &[Descriptor],
        k: usize,
    ) -> Vec<Vec<DescriptorMatch>>;
}

impl<T: FeatureExtractor + ?Sized> FeatureExtractor for &T {
    fn detect_and_describe(&self, image: &GrayImageView<'_>) -> Features {
        (**self).detect_and_describe(image)
    }
}

impl<T: DescriptorMatcher + ?Sized> DescriptorMatcher for &T {
    fn knn_match(
        &self,
        query: &[Descriptor],
        train: &[Descriptor],
        k: usize,
    ) -> Vec<Vec<DescriptorMatch>> {
        (**self).knn_match(query, train, k)
    }
}
