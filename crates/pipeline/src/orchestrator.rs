//! Synchronous pipeline: ingest, segment, measure.

use std::time::Instant;

use serde::Serialize;

use gestura_common::config::PipelineDefaults;
use gestura_common::error::{GesturaError, GesturaResult};
use gestura_gesture_core::{GestureSegmenter, SegmenterConfig, SegmenterStats, SmoothingAlgorithm};
use gestura_pose_ingest::{IngestConfig, IngestStats, PoseIngestor};
use gestura_pose_model::{GestureSegment, PoseFrame, PoseStreamHeader};

use crate::latency::{DecisionLag, LagReport, LatencyReport, LatencyTracker, DEFAULT_LATENCY_BUDGET_MS};

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ingest: IngestConfig,
    pub segmenter: SegmenterConfig,
    /// Per-frame processing budget (milliseconds).
    pub latency_budget_ms: f64,
    /// Bound of the async runner's frame and segment channels.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            segmenter: SegmenterConfig::default(),
            latency_budget_ms: DEFAULT_LATENCY_BUDGET_MS,
            channel_capacity: 256,
        }
    }
}

impl PipelineConfig {
    /// Build from the application-level defaults.
    pub fn from_defaults(defaults: &PipelineDefaults) -> GesturaResult<Self> {
        let smoothing = SmoothingAlgorithm::from_name(&defaults.smoothing, defaults.smoothing_strength)
            .ok_or_else(|| {
                GesturaError::config(format!(
                    "unknown smoothing algorithm {:?} (expected ema, one-euro, or none)",
                    defaults.smoothing
                ))
            })?;

        Ok(Self {
            ingest: IngestConfig {
                max_gap_secs: defaults.max_gap_secs,
                expected_keypoints: None,
            },
            segmenter: SegmenterConfig {
                smoothing,
                min_keypoint_confidence: defaults.min_keypoint_confidence,
                min_confidence: defaults.min_confidence,
                max_gap_secs: defaults.max_gap_secs,
                ..Default::default()
            },
            latency_budget_ms: defaults.latency_budget_ms,
            channel_capacity: defaults.channel_capacity.max(1),
        })
    }

    /// Fix the keypoint layout from a stream header, when it declares one.
    pub fn with_header(mut self, header: Option<&PoseStreamHeader>) -> Self {
        if let Some(count) = header.and_then(|h| h.keypoint_count) {
            self.ingest.expected_keypoints = Some(count);
        }
        self
    }
}

/// Totals for a finished (or in-progress) run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub frames_seen: u64,
    pub frames_accepted: u64,
    pub frames_rejected: u64,
    pub segments: u64,
    /// Segments the async runner could not hand to a receiver.
    pub segments_dropped: u64,
    pub ingest: IngestStats,
    pub segmenter: SegmenterStats,
    pub latency: LatencyReport,
    pub decision_lag: LagReport,
}

/// Ingestion wired to segmentation, with latency accounting.
pub struct GesturePipeline {
    ingestor: PoseIngestor,
    segmenter: GestureSegmenter,
    latency: LatencyTracker,
    lag: DecisionLag,
    frames_seen: u64,
    segments: u64,
}

impl GesturePipeline {
    pub fn new(config: PipelineConfig) -> GesturaResult<Self> {
        Ok(Self {
            ingestor: PoseIngestor::new(config.ingest),
            segmenter: GestureSegmenter::new(config.segmenter),
            latency: LatencyTracker::new(config.latency_budget_ms)?,
            lag: DecisionLag::default(),
            frames_seen: 0,
            segments: 0,
        })
    }

    pub fn with_defaults() -> GesturaResult<Self> {
        Self::new(PipelineConfig::default())
    }

    /// Process one frame and return the segments it completed.
    ///
    /// Frames rejected by the ingestor come back as errors for which
    /// [`GesturaError::is_frame_rejection`] holds; the pipeline state is
    /// unchanged and the next frame can follow.
    pub fn process_frame(&mut self, frame: PoseFrame) -> GesturaResult<Vec<GestureSegment>> {
        let started = Instant::now();
        self.frames_seen += 1;

        let ingested = self.ingestor.ingest(frame)?;
        let timestamp = ingested.frame.timestamp();

        let mut segments = vec![];
        if ingested.discontinuity {
            tracing::debug!(
                at = timestamp,
                gap_secs = ingested.gap_secs.unwrap_or_default(),
                "Discontinuity, closing open gesture"
            );
            segments.extend(self.segmenter.mark_discontinuity()?);
        }
        segments.extend(self.segmenter.push_frame(&ingested.frame)?);

        let elapsed = started.elapsed();
        if self.latency.record(elapsed) {
            tracing::warn!(
                at = timestamp,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.latency.budget_ms(),
                "Frame processing exceeded latency budget"
            );
        }

        self.note_emitted(&segments, timestamp);
        Ok(segments)
    }

    /// Count a frame that never reached the ingestor (e.g. malformed input).
    pub fn record_invalid_frame(&mut self) {
        self.frames_seen += 1;
        self.ingestor.record_invalid();
    }

    /// Close the open gesture at end of stream.
    pub fn finish(&mut self) -> GesturaResult<Vec<GestureSegment>> {
        let segments = self.segmenter.flush()?;
        if let Some(last) = self.ingestor.last_timestamp() {
            self.note_emitted(&segments, last);
        }
        Ok(segments)
    }

    /// Process a whole recording and flush.
    pub fn run_frames(
        &mut self,
        frames: impl IntoIterator<Item = PoseFrame>,
    ) -> GesturaResult<Vec<GestureSegment>> {
        let mut segments = vec![];
        for frame in frames {
            match self.process_frame(frame) {
                Ok(done) => segments.extend(done),
                Err(e) if e.is_frame_rejection() => {
                    tracing::warn!(error = %e, "Frame rejected");
                }
                Err(e) => return Err(e),
            }
        }
        segments.extend(self.finish()?);
        Ok(segments)
    }

    pub fn summary(&self) -> PipelineSummary {
        let ingest = self.ingestor.stats();
        PipelineSummary {
            frames_seen: self.frames_seen,
            frames_accepted: ingest.accepted,
            frames_rejected: ingest.rejected(),
            segments: self.segments,
            segments_dropped: 0,
            ingest,
            segmenter: self.segmenter.stats().clone(),
            latency: self.latency.report(),
            decision_lag: self.lag.report(),
        }
    }

    pub fn segmenter(&self) -> &GestureSegmenter {
        &self.segmenter
    }

    fn note_emitted(&mut self, segments: &[GestureSegment], decided_at: f64) {
        for segment in segments {
            self.segments += 1;
            self.lag.record(decided_at - segment.end_time());
            tracing::info!(
                gesture = %segment.gesture_type(),
                start = segment.start_time(),
                end = segment.end_time(),
                confidence = segment.confidence(),
                "Gesture recognized"
            );
        }
    }
}
