//! Gesture segments: classified, time-bounded motion events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{is_unit, ModelError};

/// Recognized gesture labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureType {
    /// Repeated side-to-side motion.
    Wave,
    /// Fast, straight motion toward the left edge.
    SwipeLeft,
    /// Fast, straight motion toward the right edge.
    SwipeRight,
    /// Fast, straight motion toward the top edge.
    SwipeUp,
    /// Fast, straight motion toward the bottom edge.
    SwipeDown,
    /// Tracked point held still.
    Hold,
}

impl GestureType {
    pub const ALL: [GestureType; 6] = [
        GestureType::Wave,
        GestureType::SwipeLeft,
        GestureType::SwipeRight,
        GestureType::SwipeUp,
        GestureType::SwipeDown,
        GestureType::Hold,
    ];

    /// Wire label, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wave => "wave",
            Self::SwipeLeft => "swipe_left",
            Self::SwipeRight => "swipe_right",
            Self::SwipeUp => "swipe_up",
            Self::SwipeDown => "swipe_down",
            Self::Hold => "hold",
        }
    }

    pub fn is_swipe(&self) -> bool {
        matches!(
            self,
            Self::SwipeLeft | Self::SwipeRight | Self::SwipeUp | Self::SwipeDown
        )
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ModelError::UnknownGestureType {
                label: s.to_string(),
            })
    }
}

/// A completed, classified motion event spanning multiple pose frames.
///
/// Invariants: `end_time > start_time`, `confidence` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGestureSegment")]
pub struct GestureSegment {
    start_time: f64,
    end_time: f64,
    confidence: f64,
    gesture_type: GestureType,
}

#[derive(Deserialize)]
struct RawGestureSegment {
    start_time: f64,
    end_time: f64,
    confidence: f64,
    gesture_type: GestureType,
}

impl TryFrom<RawGestureSegment> for GestureSegment {
    type Error = ModelError;

    fn try_from(raw: RawGestureSegment) -> Result<Self, Self::Error> {
        GestureSegment::new(raw.start_time, raw.end_time, raw.confidence, raw.gesture_type)
    }
}

impl GestureSegment {
    /// Create a validated segment.
    pub fn new(
        start_time: f64,
        end_time: f64,
        confidence: f64,
        gesture_type: GestureType,
    ) -> Result<Self, ModelError> {
        if !start_time.is_finite() {
            return Err(ModelError::InvalidTimestamp { value: start_time });
        }
        if !end_time.is_finite() || end_time <= start_time {
            return Err(ModelError::InvalidSegmentBounds {
                start_time,
                end_time,
            });
        }
        if !is_unit(confidence) {
            return Err(ModelError::ConfidenceOutOfRange { value: confidence });
        }
        Ok(Self {
            start_time,
            end_time,
            confidence,
            gesture_type,
        })
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn gesture_type(&self) -> GestureType {
        self.gesture_type
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether the half-open intervals `[start, end)` intersect.
    /// Segments that only touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &GestureSegment) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time
    }
}

/// Check that segments are in time order and pairwise non-overlapping.
pub fn check_segment_order(segments: &[GestureSegment]) -> Result<(), ModelError> {
    for (i, pair) in segments.windows(2).enumerate() {
        if pair[1].start_time < pair[0].end_time {
            return Err(ModelError::SegmentOrder { index: i + 1 });
        }
    }
    Ok(())
}

/// Parse segments from JSONL content.
pub fn parse_segments(jsonl: &str) -> Result<Vec<GestureSegment>, ModelError> {
    jsonl
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, content)| {
            serde_json::from_str(content).map_err(|source| ModelError::Parse { line, source })
        })
        .collect()
}

/// Serialize segments to JSONL format.
pub fn serialize_segments(segments: &[GestureSegment]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for segment in segments {
        output.push_str(&serde_json::to_string(segment)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sample_segment_fixture() {
        let raw = r#"{"start_time":1234567890.0,"end_time":1234567892.0,"confidence":0.85,"gesture_type":"wave"}"#;
        let segment: GestureSegment = serde_json::from_str(raw).unwrap();
        assert!(segment.start_time() < segment.end_time());
        assert!((segment.duration_secs() - 2.0).abs() < 1e-6);
        assert_eq!(segment.gesture_type(), GestureType::Wave);
        assert!(!segment.gesture_type().as_str().is_empty());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(matches!(
            GestureSegment::new(2.0, 2.0, 0.5, GestureType::Hold),
            Err(ModelError::InvalidSegmentBounds { .. })
        ));
        let raw = r#"{"start_time":3.0,"end_time":1.0,"confidence":0.5,"gesture_type":"hold"}"#;
        assert!(serde_json::from_str::<GestureSegment>(raw).is_err());
    }

    #[test]
    fn test_confidence_range_enforced() {
        assert!(matches!(
            GestureSegment::new(0.0, 1.0, 1.01, GestureType::Wave),
            Err(ModelError::ConfidenceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_unknown_label_rejected() {
        let raw = r#"{"start_time":0.0,"end_time":1.0,"confidence":0.5,"gesture_type":"moonwalk"}"#;
        assert!(serde_json::from_str::<GestureSegment>(raw).is_err());
        assert!("moonwalk".parse::<GestureType>().is_err());
    }

    #[test]
    fn test_labels_match_serde() {
        for gesture in GestureType::ALL {
            let json = serde_json::to_string(&gesture).unwrap();
            assert_eq!(json, format!("\"{}\"", gesture.as_str()));
            assert_eq!(gesture.as_str().parse::<GestureType>().unwrap(), gesture);
        }
        assert!(GestureType::SwipeUp.is_swipe());
        assert!(!GestureType::Wave.is_swipe());
    }

    #[test]
    fn test_touching_segments_do_not_overlap() {
        let a = GestureSegment::new(0.0, 1.0, 0.9, GestureType::Hold).unwrap();
        let b = GestureSegment::new(1.0, 2.0, 0.9, GestureType::Wave).unwrap();
        let c = GestureSegment::new(1.5, 2.5, 0.9, GestureType::SwipeLeft).unwrap();
        assert!(!a.overlaps(&b));
        assert!(b.overlaps(&c));
        assert!(check_segment_order(&[a, b]).is_ok());
        assert!(matches!(
            check_segment_order(&[a, b, c]),
            Err(ModelError::SegmentOrder { index: 2 })
        ));
    }

    #[test]
    fn test_segments_jsonl() {
        let segments = vec![
            GestureSegment::new(0.0, 1.0, 0.9, GestureType::Hold).unwrap(),
            GestureSegment::new(1.2, 2.0, 0.7, GestureType::SwipeRight).unwrap(),
        ];
        let jsonl = serialize_segments(&segments).unwrap();
        assert_eq!(jsonl.lines().count(), 2);
        assert!(jsonl.contains("\"gesture_type\":\"swipe_right\""));
        assert_eq!(parse_segments(&jsonl).unwrap(), segments);
    }

    proptest! {
        #[test]
        fn prop_new_accepts_exactly_valid_segments(
            start in -10.0f64..10.0,
            len in -1.0f64..2.0,
            confidence in -0.5f64..1.5,
        ) {
            let result = GestureSegment::new(start, start + len, confidence, GestureType::Wave);
            let valid = start + len > start && (0.0..=1.0).contains(&confidence);
            prop_assert_eq!(result.is_ok(), valid);
        }
    }
}
