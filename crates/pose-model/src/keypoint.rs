//! Keypoints and 2D point helpers.

use serde::{Deserialize, Serialize};

use crate::error::{is_unit, ModelError};

/// One tracked body/hand landmark in normalized frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Normalized X coordinate [0.0, 1.0].
    pub x: f64,
    /// Normalized Y coordinate [0.0, 1.0], growing downward.
    pub y: f64,
    /// Detector confidence [0.0, 1.0].
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    /// Validate ranges; `index` is reported in the error.
    pub fn validate(&self, index: usize) -> Result<(), ModelError> {
        for (field, value) in [("x", self.x), ("y", self.y), ("confidence", self.confidence)] {
            if !is_unit(value) {
                return Err(ModelError::KeypointOutOfRange {
                    index,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Position without the confidence.
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// A normalized 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: &Point2D, b: &Point2D, t: f64) -> Point2D {
        let t = t.clamp(0.0, 1.0);
        Point2D {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keypoint() {
        assert!(Keypoint::new(0.5, 0.5, 0.9).validate(0).is_ok());
        assert!(Keypoint::new(0.0, 1.0, 0.0).validate(0).is_ok());
    }

    #[test]
    fn test_out_of_range_keypoint_reports_field() {
        let err = Keypoint::new(0.5, 1.2, 0.9).validate(3).unwrap_err();
        match err {
            ModelError::KeypointOutOfRange {
                index,
                field,
                value,
            } => {
                assert_eq!(index, 3);
                assert_eq!(field, "y");
                assert!((value - 1.2).abs() < 1e-12);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nan_confidence_rejected() {
        assert!(Keypoint::new(0.5, 0.5, f64::NAN).validate(0).is_err());
    }

    #[test]
    fn test_point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(0.3, 0.4);
        assert!((a.distance_to(&b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_point_lerp_clamps() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(1.0, 1.0);
        assert_eq!(Point2D::lerp(&a, &b, 2.0), b);
        assert_eq!(Point2D::lerp(&a, &b, 0.5), Point2D::new(0.5, 0.5));
    }
}
