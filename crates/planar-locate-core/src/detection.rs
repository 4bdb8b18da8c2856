use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A match between a point in source space and one in target space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointCorrespondence {
    pub source: Point2<f32>,
    pub target: Point2<f32>,
}

impl PointCorrespondence {
    pub fn new(source: Point2<f32>, target: Point2<f32>) -> Self {
        Self { source, target }
    }
}

/// Pipeline stage that turned a valid input into a negative result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooFewKeypoints,
    TooFewMatches,
    HomographyFailed,
    LowConfidence,
    NonConvex,
    AspectDistortion,
    NoQuadrilateral,
}

/// Why a detection did not succeed, plus how many matches survived filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: RejectReason,
    pub match_count: usize,
}

impl Rejection {
    pub fn new(reason: RejectReason, match_count: usize) -> Self {
        Self {
            reason,
            match_count,
        }
    }
}

/// Outcome of a detection call on well-formed input.
///
/// `NotFound` is a legitimate negative answer, not a fault; malformed input is
/// reported through `Err` by the entry points instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Detection<T> {
    Found(T),
    NotFound(Rejection),
}

impl<T> Detection<T> {
    pub fn not_found(reason: RejectReason, match_count: usize) -> Self {
        Detection::NotFound(Rejection::new(reason, match_count))
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Detection::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Detection::Found(v) => Some(v),
            Detection::NotFound(_) => None,
        }
    }

    pub fn as_found(&self) -> Option<&T> {
        match self {
            Detection::Found(v) => Some(v),
            Detection::NotFound(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Detection::Found(_) => None,
            Detection::NotFound(r) => Some(r),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Detection<U> {
        match self {
            Detection::Found(v) => Detection::Found(f(v)),
            Detection::NotFound(r) => Detection::NotFound(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_match_count() {
        let d: Detection<u32> = Detection::not_found(RejectReason::TooFewMatches, 7);
        assert!(!d.is_found());
        assert_eq!(d.rejection().map(|r| r.match_count), Some(7));
        assert_eq!(d.found(), None);
    }

    #[test]
    fn map_preserves_variant() {
        let d = Detection::Found(3).map(|v| v * 2);
        assert_eq!(d, Detection::Found(6));
    }

    #[test]
    fn serializes_with_outcome_tag() {
        let d: Detection<u32> = Detection::not_found(RejectReason::NonConvex, 12);
        let json = serde_json::to_string(&d).expect("serialize");
        assert!(json.contains("\"outcome\":\"not_found\""));
        assert!(json.contains("\"non_convex\""));
    }
}
