//! Pose frames and the JSONL pose stream format.
//!
//! A pose stream is one JSON object per line. The first line may be a
//! `# `-prefixed header carrying [`PoseStreamHeader`]; blank lines and other
//! comment lines are skipped.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::keypoint::{Keypoint, Point2D};

/// Current pose stream schema version.
pub const SCHEMA_VERSION: &str = "1.0";

/// One timestamped snapshot of keypoints.
///
/// Frames are validated on construction and on deserialization, and are
/// immutable afterwards. An empty keypoint list means "no detection".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseFrameRecord")]
pub struct PoseFrame {
    /// Monotonic seconds.
    timestamp: f64,
    /// Ordered keypoints; the index identifies the landmark.
    keypoints: Vec<Keypoint>,
}

/// Wire form of a frame before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct PoseFrameRecord {
    pub timestamp: f64,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
}

impl TryFrom<PoseFrameRecord> for PoseFrame {
    type Error = ModelError;

    fn try_from(raw: PoseFrameRecord) -> Result<Self, Self::Error> {
        PoseFrame::new(raw.timestamp, raw.keypoints)
    }
}

impl PoseFrame {
    /// Create a validated frame.
    pub fn new(timestamp: f64, keypoints: Vec<Keypoint>) -> Result<Self, ModelError> {
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(ModelError::InvalidTimestamp { value: timestamp });
        }
        for (index, keypoint) in keypoints.iter().enumerate() {
            keypoint.validate(index)?;
        }
        Ok(Self {
            timestamp,
            keypoints,
        })
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn keypoint(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index)
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Mean keypoint confidence, 0.0 for an empty frame.
    pub fn mean_confidence(&self) -> f64 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        self.keypoints.iter().map(|k| k.confidence).sum::<f64>() / self.keypoints.len() as f64
    }

    /// Confidence-weighted centroid of keypoints at or above `min_confidence`.
    ///
    /// Returns the centroid and the mean confidence of the contributing
    /// keypoints, or `None` when no keypoint qualifies.
    pub fn confident_centroid(&self, min_confidence: f64) -> Option<(Point2D, f64)> {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_w = 0.0;
        let mut count = 0usize;

        for k in self.keypoints.iter().filter(|k| k.confidence >= min_confidence) {
            sum_x += k.x * k.confidence;
            sum_y += k.y * k.confidence;
            sum_w += k.confidence;
            count += 1;
        }

        if count == 0 || sum_w <= 0.0 {
            return None;
        }
        Some((
            Point2D::new(sum_x / sum_w, sum_y / sum_w),
            sum_w / count as f64,
        ))
    }
}

/// Header line of a pose stream file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Producer of the stream (estimator name, "synthetic", ...).
    #[serde(default)]
    pub source: String,

    /// Wall-clock time at stream start (RFC 3339).
    #[serde(default)]
    pub epoch_wall: Option<String>,

    /// Nominal frame rate (Hz).
    #[serde(default)]
    pub frame_rate_hz: Option<u32>,

    /// Number of keypoints per non-empty frame.
    #[serde(default)]
    pub keypoint_count: Option<usize>,

    /// Optional landmark names, indexed like the keypoints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keypoint_names: Vec<String>,
}

impl PoseStreamHeader {
    /// Create a header stamped with the current wall-clock time.
    pub fn new(source: impl Into<String>, frame_rate_hz: u32, keypoint_count: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            source: source.into(),
            epoch_wall: Some(chrono::Utc::now().to_rfc3339()),
            frame_rate_hz: Some(frame_rate_hz),
            keypoint_count: Some(keypoint_count),
            keypoint_names: vec![],
        }
    }
}

/// A parsed pose stream: optional header and frames in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseStream {
    pub header: Option<PoseStreamHeader>,
    pub frames: Vec<PoseFrame>,
}

/// Parse the header comment of a stream, if the first content line is one.
pub fn parse_header(jsonl: &str) -> Result<Option<PoseStreamHeader>, ModelError> {
    for (idx, line) in jsonl.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        return match trimmed.strip_prefix('#') {
            Some(rest) if rest.trim_start().starts_with('{') => {
                serde_json::from_str(rest.trim())
                    .map(Some)
                    .map_err(|source| ModelError::Parse {
                        line: idx + 1,
                        source,
                    })
            }
            _ => Ok(None),
        };
    }
    Ok(None)
}

/// Parse frames from JSONL content (one JSON object per line).
///
/// Errors carry the 1-based line number of the offending line.
pub fn parse_frames(jsonl: &str) -> Result<Vec<PoseFrame>, ModelError> {
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

/// Parse a full stream: header (if any) and frames.
pub fn parse_stream(jsonl: &str) -> Result<PoseStream, ModelError> {
    Ok(PoseStream {
        header: parse_header(jsonl)?,
        frames: parse_frames(jsonl)?,
    })
}

/// Serialize frames to JSONL format, with an optional header line.
pub fn serialize_frames(
    header: Option<&PoseStreamHeader>,
    frames: &[PoseFrame],
) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    if let Some(header) = header {
        output.push_str("# ");
        output.push_str(&serde_json::to_string(header)?);
        output.push('\n');
    }
    for frame in frames {
        output.push_str(&serde_json::to_string(frame)?);
        output.push('\n');
    }
    Ok(output)
}

/// Summary statistics for a sequence of frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    pub frame_count: usize,
    pub empty_frames: usize,
    pub duration_secs: f64,
    /// Mean frame rate over the stream, 0.0 for fewer than two frames.
    pub mean_rate_hz: f64,
    /// Mean confidence over all keypoints of non-empty frames.
    pub mean_confidence: f64,
    /// Number of adjacent pairs whose timestamps are not strictly increasing.
    pub ordering_violations: usize,
}

impl FrameStats {
    pub fn from_frames(frames: &[PoseFrame]) -> Self {
        if frames.is_empty() {
            return Self::default();
        }

        let first = frames[0].timestamp();
        let last = frames[frames.len() - 1].timestamp();
        let duration_secs = (last - first).max(0.0);

        let (conf_sum, conf_count) = frames
            .iter()
            .flat_map(|f| f.keypoints().iter())
            .fold((0.0, 0usize), |(sum, n), k| (sum + k.confidence, n + 1));

        let ordering_violations = frames
            .windows(2)
            .filter(|w| w[1].timestamp() <= w[0].timestamp())
            .count();

        Self {
            frame_count: frames.len(),
            empty_frames: frames.iter().filter(|f| f.is_empty()).count(),
            duration_secs,
            mean_rate_hz: if frames.len() > 1 && duration_secs > 0.0 {
                (frames.len() - 1) as f64 / duration_secs
            } else {
                0.0
            },
            mean_confidence: if conf_count > 0 {
                conf_sum / conf_count as f64
            } else {
                0.0
            },
            ordering_violations,
        }
    }
}
