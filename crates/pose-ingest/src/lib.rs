//! Gestura Pose Ingest
//!
//! Accepts timestamped pose frames from a pluggable source and validates
//! them before segmentation:
//!
//! - **Ordering:** timestamps must be strictly increasing
//! - **Layout:** every non-empty frame carries the same number of keypoints
//! - **Gaps:** long pauses between frames are flagged as discontinuities
//!
//! Sources include JSONL replay, in-memory queues, and a deterministic
//! synthetic generator. Streams are written back in append-only JSONL.

pub mod sources;
pub mod writer;

pub use sources::{
    parse_script, MemorySource, MotionStep, ReplaySource, SyntheticConfig, SyntheticMotion,
    SyntheticSource,
};
pub use writer::PoseWriter;

use serde::Serialize;

use gestura_common::error::{GesturaError, GesturaResult};
use gestura_pose_model::{ModelError, PoseFrame, PoseFrameRecord, PoseStreamHeader};

/// Trait for pose frame sources.
pub trait FrameSource: Send {
    /// Produce the next frame. Returns `None` once the source is exhausted.
    fn next_frame(&mut self) -> GesturaResult<Option<PoseFrame>>;

    /// Source name for logging.
    fn name(&self) -> &str;

    /// Stream header, when the source has one.
    fn header(&self) -> Option<&PoseStreamHeader> {
        None
    }
}

/// Reasons a frame is rejected at ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Frame at {received}s does not follow previous frame at {previous}s")]
    OutOfOrder { previous: f64, received: f64 },

    #[error("Frame has {received} keypoints, stream layout expects {expected}")]
    LayoutMismatch { expected: usize, received: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<IngestError> for GesturaError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Model(e) => GesturaError::model(e.to_string()),
            other => GesturaError::ingest(other.to_string()),
        }
    }
}

/// Ingestion parameters.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Gap between consecutive frames (seconds) that marks a discontinuity.
    pub max_gap_secs: f64,

    /// Keypoint count fixed up front (e.g. from the stream header).
    /// When `None`, the first non-empty frame fixes the layout.
    pub expected_keypoints: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: 0.5,
            expected_keypoints: None,
        }
    }
}

/// A frame that passed ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedFrame {
    pub frame: PoseFrame,
    /// Seconds since the previous accepted frame.
    pub gap_secs: Option<f64>,
    /// The gap exceeded `max_gap_secs`; downstream state should reset.
    pub discontinuity: bool,
}

/// Ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub accepted: u64,
    pub out_of_order: u64,
    pub layout_mismatches: u64,
    pub invalid: u64,
    pub discontinuities: u64,
}

impl IngestStats {
    pub fn rejected(&self) -> u64 {
        self.out_of_order + self.layout_mismatches + self.invalid
    }
}

/// Validates frames and enforces strict time order.
#[derive(Debug)]
pub struct PoseIngestor {
    config: IngestConfig,
    layout: Option<usize>,
    last_timestamp: Option<f64>,
    stats: IngestStats,
}

impl PoseIngestor {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            layout: config.expected_keypoints,
            config,
            last_timestamp: None,
            stats: IngestStats::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(IngestConfig::default())
    }

    /// Validate and accept a frame.
    pub fn ingest(&mut self, frame: PoseFrame) -> Result<IngestedFrame, IngestError> {
        let timestamp = frame.timestamp();

        if let Some(previous) = self.last_timestamp {
            if timestamp <= previous {
                self.stats.out_of_order += 1;
                tracing::debug!(previous, received = timestamp, "Rejected out-of-order frame");
                return Err(IngestError::OutOfOrder {
                    previous,
                    received: timestamp,
                });
            }
        }

        if !frame.is_empty() {
            match self.layout {
                Some(expected) if expected != frame.len() => {
                    self.stats.layout_mismatches += 1;
                    return Err(IngestError::LayoutMismatch {
                        expected,
                        received: frame.len(),
                    });
                }
                Some(_) => {}
                None => {
                    tracing::debug!(keypoints = frame.len(), "Keypoint layout fixed");
                    self.layout = Some(frame.len());
                }
            }
        }

        let gap_secs = self.last_timestamp.map(|previous| timestamp - previous);
        let discontinuity = gap_secs
            .map(|gap| gap > self.config.max_gap_secs)
            .unwrap_or(false);
        if discontinuity {
            self.stats.discontinuities += 1;
            tracing::debug!(gap_secs = gap_secs.unwrap_or_default(), "Stream discontinuity");
        }

        self.last_timestamp = Some(timestamp);
        self.stats.accepted += 1;

        Ok(IngestedFrame {
            frame,
            gap_secs,
            discontinuity,
        })
    }

    /// Parse one JSON frame and ingest it.
    ///
    /// Syntax errors come back as [`IngestError::Json`], well-formed frames
    /// with out-of-range values as [`IngestError::Model`].
    pub fn ingest_json(&mut self, line: &str) -> Result<IngestedFrame, IngestError> {
        let frame = serde_json::from_str::<PoseFrameRecord>(line.trim())
            .map_err(IngestError::from)
            .and_then(|record| PoseFrame::try_from(record).map_err(IngestError::from));
        match frame {
            Ok(frame) => self.ingest(frame),
            Err(e) => {
                self.stats.invalid += 1;
                Err(e)
            }
        }
    }

    /// Count a frame that failed before reaching the ingestor (e.g. a
    /// malformed line in a replay source).
    pub fn record_invalid(&mut self) {
        self.stats.invalid += 1;
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Keypoint count of the stream, once known.
    pub fn layout(&self) -> Option<usize> {
        self.layout
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }
}
