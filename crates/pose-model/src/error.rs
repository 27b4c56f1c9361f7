//! Validation and parse errors for model types.

/// Errors raised when constructing or parsing model values.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Keypoint {index} has {field} = {value} outside [0, 1]")]
    KeypointOutOfRange {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("Invalid timestamp: {value}")]
    InvalidTimestamp { value: f64 },

    #[error("Segment end_time {end_time} must be greater than start_time {start_time}")]
    InvalidSegmentBounds { start_time: f64, end_time: f64 },

    #[error("Confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange { value: f64 },

    #[error("Unknown gesture type: {label:?}")]
    UnknownGestureType { label: String },

    #[error("Segment {index} overlaps or precedes the segment before it")]
    SegmentOrder { index: usize },

    #[error("Parse error on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// Check that `value` is a finite number within `[0, 1]`.
pub(crate) fn is_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
