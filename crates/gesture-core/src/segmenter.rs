//! Streaming gesture segmenter.
//!
//! # Algorithm
//!
//! 1. **Smooth** each frame's keypoints.
//! 2. **Track** one point per frame (centroid or a chosen keypoint).
//! 3. **Activity**: the speed between consecutive samples separates motion
//!    from stillness.
//! 4. **Runs**: motion opens a run at the preceding sample. The run closes
//!    after `release_secs` of stillness, at `max_segment_secs`, on a gap or
//!    on flush, and is then classified as a wave or a swipe.
//! 5. **Holds**: a stillness streak with no pending run is checked once,
//!    as soon as it lasts `hold_min_secs`.
//!
//! Emitted segments never start before the end of the previous one.

use serde::{Deserialize, Serialize};

use gestura_common::error::{GesturaError, GesturaResult};
use gestura_pose_model::{GestureSegment, PoseFrame};

use crate::classifier::{Classification, ClassifierConfig, GestureClassifier};
use crate::motion::{track_point, MotionFeatures, TrackSample, TrackingTarget};
use crate::smoothing::{KeypointSmoother, SmoothingAlgorithm};
use crate::TIME_EPSILON;

/// Configuration for the segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub smoothing: SmoothingAlgorithm,

    pub tracking: TrackingTarget,

    /// Keypoints below this confidence are ignored for tracking and hold
    /// their smoothed position.
    pub min_keypoint_confidence: f64,

    /// Speed (normalized units per second) at or above which the tracked
    /// point counts as moving.
    pub motion_speed_threshold: f64,

    /// Stillness needed to close a motion run (seconds).
    pub release_secs: f64,

    /// Runs shorter than this are dropped (seconds).
    pub min_segment_secs: f64,

    /// Runs are closed once they reach this length (seconds).
    pub max_segment_secs: f64,

    /// Stillness needed for a hold (seconds).
    pub hold_min_secs: f64,

    pub detect_holds: bool,

    /// A gap between tracked samples longer than this resets the segmenter.
    pub max_gap_secs: f64,

    /// Classifications below this confidence are discarded.
    pub min_confidence: f64,

    pub classifier: ClassifierConfig,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            smoothing: SmoothingAlgorithm::default(),
            tracking: TrackingTarget::Centroid,
            min_keypoint_confidence: 0.3,
            motion_speed_threshold: 0.15,
            release_secs: 0.25,
            min_segment_secs: 0.2,
            max_segment_secs: 5.0,
            hold_min_secs: 1.0,
            detect_holds: true,
            max_gap_secs: 0.5,
            min_confidence: 0.5,
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Coarse segmenter state, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterState {
    /// No tracked sample since start or the last reset.
    Idle,
    /// A motion run is open (including its release window).
    Moving,
    /// Tracking a still point.
    Still,
}

/// Counters over the lifetime of a segmenter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmenterStats {
    pub frames: u64,
    /// Frames that produced a tracked point.
    pub samples: u64,
    pub runs: u64,
    pub segments: u64,
    pub holds: u64,
    pub short_runs: u64,
    pub unclassified: u64,
    pub low_confidence: u64,
    pub discontinuities: u64,
}

struct MotionRun {
    start: f64,
    samples: Vec<TrackSample>,
    last_moving: f64,
}

struct StillStreak {
    start: f64,
    samples: Vec<TrackSample>,
    checked: bool,
}

impl StillStreak {
    fn new(samples: Vec<TrackSample>) -> Self {
        Self {
            start: samples.first().map_or(0.0, |s| s.t),
            samples,
            checked: false,
        }
    }

    fn push(&mut self, sample: TrackSample) {
        if !self.checked {
            self.samples.push(sample);
        }
    }
}

/// Turns a time-ordered pose stream into gesture segments.
pub struct GestureSegmenter {
    config: SegmenterConfig,
    classifier: GestureClassifier,
    smoother: KeypointSmoother,
    run: Option<MotionRun>,
    still: Option<StillStreak>,
    last_sample: Option<TrackSample>,
    last_frame_time: Option<f64>,
    /// End of the last emitted segment.
    floor: Option<f64>,
    stats: SegmenterStats,
}

impl GestureSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            classifier: GestureClassifier::new(config.classifier.clone()),
            smoother: KeypointSmoother::new(config.smoothing, config.min_keypoint_confidence),
            config,
            run: None,
            still: None,
            last_sample: None,
            last_frame_time: None,
            floor: None,
            stats: SegmenterStats::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SegmenterConfig::default())
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn stats(&self) -> &SegmenterStats {
        &self.stats
    }

    pub fn state(&self) -> SegmenterState {
        match (&self.last_sample, &self.run) {
            (None, _) => SegmenterState::Idle,
            (Some(_), Some(_)) => SegmenterState::Moving,
            (Some(_), None) => SegmenterState::Still,
        }
    }

    /// End time of the last emitted segment.
    pub fn last_segment_end(&self) -> Option<f64> {
        self.floor
    }

    /// Feed one frame; returns the segments it completed.
    pub fn push_frame(&mut self, frame: &PoseFrame) -> GesturaResult<Vec<GestureSegment>> {
        let t = frame.timestamp();
        if let Some(last) = self.last_frame_time {
            if t <= last {
                return Err(GesturaError::segmentation(format!(
                    "frame at {t:.6}s does not follow previous frame at {last:.6}s"
                )));
            }
        }
        self.last_frame_time = Some(t);
        self.stats.frames += 1;

        let mut emitted = vec![];

        if let Some(last) = self.last_sample {
            let gap = t - last.t;
            if gap > self.config.max_gap_secs {
                tracing::debug!(gap_secs = gap, at = t, "Tracking gap, resetting segmenter");
                self.break_stream(&mut emitted)?;
            }
        }

        let smoothed = self
            .smoother
            .smooth(frame)
            .map_err(|e| GesturaError::segmentation(format!("smoothing frame at {t:.6}s: {e}")))?;

        let Some(sample) = track_point(
            &smoothed,
            self.config.tracking,
            self.config.min_keypoint_confidence,
        ) else {
            return Ok(emitted);
        };
        self.stats.samples += 1;

        match self.last_sample.replace(sample) {
            None => self.still = Some(StillStreak::new(vec![sample])),
            Some(prev) if sample.speed_from(&prev) >= self.config.motion_speed_threshold => {
                self.on_moving(prev, sample, &mut emitted)?
            }
            Some(prev) => self.on_still(prev, sample, &mut emitted)?,
        }

        Ok(emitted)
    }

    /// Close any open run and return what it produced.
    pub fn flush(&mut self) -> GesturaResult<Vec<GestureSegment>> {
        let mut emitted = vec![];
        self.complete_run(&mut emitted)?;
        Ok(emitted)
    }

    /// Close any open run and forget smoothing and tracking state.
    ///
    /// Segments emitted afterwards still start at or after the last
    /// emitted end.
    pub fn mark_discontinuity(&mut self) -> GesturaResult<Vec<GestureSegment>> {
        let mut emitted = vec![];
        self.break_stream(&mut emitted)?;
        Ok(emitted)
    }

    /// Return to a freshly constructed state.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.run = None;
        self.still = None;
        self.last_sample = None;
        self.last_frame_time = None;
        self.floor = None;
        self.stats = SegmenterStats::default();
    }

    /// Segment a complete recording, flushing at the end.
    pub fn segment_all(&mut self, frames: &[PoseFrame]) -> GesturaResult<Vec<GestureSegment>> {
        let mut segments = vec![];
        for frame in frames {
            segments.extend(self.push_frame(frame)?);
        }
        segments.extend(self.flush()?);
        Ok(segments)
    }

    fn break_stream(&mut self, emitted: &mut Vec<GestureSegment>) -> GesturaResult<()> {
        self.complete_run(emitted)?;
        self.smoother.reset();
        self.still = None;
        self.last_sample = None;
        self.stats.discontinuities += 1;
        Ok(())
    }

    fn on_moving(
        &mut self,
        prev: TrackSample,
        sample: TrackSample,
        emitted: &mut Vec<GestureSegment>,
    ) -> GesturaResult<()> {
        self.still = None;

        match self.run.as_mut() {
            Some(run) => {
                run.samples.push(sample);
                run.last_moving = sample.t;
            }
            None => {
                let start = self.clamp_to_floor(prev.t);
                self.stats.runs += 1;
                self.run = Some(MotionRun {
                    start,
                    samples: vec![prev, sample],
                    last_moving: sample.t,
                });
            }
        }

        let max = self.config.max_segment_secs;
        if self
            .run
            .as_ref()
            .is_some_and(|run| run.last_moving - run.start >= max - TIME_EPSILON)
        {
            self.complete_run(emitted)?;
        }
        Ok(())
    }

    fn on_still(
        &mut self,
        prev: TrackSample,
        sample: TrackSample,
        emitted: &mut Vec<GestureSegment>,
    ) -> GesturaResult<()> {
        let release = self.config.release_secs;
        let released = match self.run.as_mut() {
            Some(run) => {
                run.samples.push(sample);
                sample.t - run.last_moving >= release - TIME_EPSILON
            }
            None => false,
        };
        if released {
            self.complete_run(emitted)?;
        }

        match self.still.as_mut() {
            Some(streak) => streak.push(sample),
            None => self.still = Some(StillStreak::new(vec![prev, sample])),
        }

        if self.run.is_none() && self.config.detect_holds {
            self.check_hold(sample.t, emitted)?;
        }
        Ok(())
    }

    fn check_hold(&mut self, now: f64, emitted: &mut Vec<GestureSegment>) -> GesturaResult<()> {
        let floor = self.floor;
        let Some(streak) = self.still.as_mut() else {
            return Ok(());
        };
        if streak.checked {
            return Ok(());
        }

        let start = floor.map_or(streak.start, |f| streak.start.max(f));
        let held = now - start;
        if held < self.config.hold_min_secs - TIME_EPSILON || held <= TIME_EPSILON {
            return Ok(());
        }

        streak.checked = true;
        let window: Vec<TrackSample> = streak
            .samples
            .drain(..)
            .filter(|s| s.t >= start - TIME_EPSILON)
            .collect();

        let classification = MotionFeatures::from_samples(&window, self.config.classifier.wave_min_travel)
            .and_then(|features| self.classifier.classify_hold(&features));

        if let Some(classification) = classification {
            if self.emit(start, now, classification, emitted)? {
                self.stats.holds += 1;
            }
        }
        Ok(())
    }

    fn complete_run(&mut self, emitted: &mut Vec<GestureSegment>) -> GesturaResult<()> {
        let Some(run) = self.run.take() else {
            return Ok(());
        };

        let start = run.start;
        let end = run.last_moving;
        let duration = end - start;
        if duration < self.config.min_segment_secs - TIME_EPSILON || duration <= TIME_EPSILON {
            self.stats.short_runs += 1;
            tracing::trace!(start, end, "Dropping short motion run");
            return Ok(());
        }

        let samples: Vec<TrackSample> = run
            .samples
            .into_iter()
            .filter(|s| s.t >= start - TIME_EPSILON && s.t <= end + TIME_EPSILON)
            .collect();

        let classification = MotionFeatures::from_samples(&samples, self.config.classifier.wave_min_travel)
            .and_then(|features| self.classifier.classify_motion(&features));

        match classification {
            Some(classification) => {
                self.emit(start, end, classification, emitted)?;
            }
            None => {
                self.stats.unclassified += 1;
                tracing::trace!(start, end, "Motion run matched no gesture");
            }
        }
        Ok(())
    }

    /// Emit a segment if it clears the confidence threshold.
    fn emit(
        &mut self,
        start: f64,
        end: f64,
        classification: Classification,
        emitted: &mut Vec<GestureSegment>,
    ) -> GesturaResult<bool> {
        let Classification {
            gesture_type,
            confidence,
        } = classification;

        if confidence < self.config.min_confidence {
            self.stats.low_confidence += 1;
            tracing::debug!(
                gesture = %gesture_type,
                confidence,
                min_confidence = self.config.min_confidence,
                "Discarding low-confidence gesture"
            );
            return Ok(false);
        }

        let segment = GestureSegment::new(start, end, confidence, gesture_type).map_err(|e| {
            GesturaError::segmentation(format!("building {gesture_type} segment: {e}"))
        })?;

        self.floor = Some(end);
        self.stats.segments += 1;
        tracing::debug!(
            gesture = %gesture_type,
            start,
            end,
            confidence,
            "Gesture segment emitted"
        );
        emitted.push(segment);
        Ok(true)
    }

    fn clamp_to_floor(&self, t: f64) -> f64 {
        self.floor.map_or(t, |floor| t.max(floor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gestura_pose_model::{GestureType, Keypoint};

    const FPS: f64 = 30.0;

    fn frame(t: f64, x: f64, y: f64) -> PoseFrame {
        PoseFrame::new(t, vec![Keypoint::new(x, y, 0.9)]).unwrap()
    }

    fn raw_config() -> SegmenterConfig {
        SegmenterConfig {
            smoothing: SmoothingAlgorithm::None,
            ..Default::default()
        }
    }

    /// Straight move to the right at 0.8 units/s for `n` frames.
    fn swipe_frames(n: usize) -> Vec<PoseFrame> {
        (0..n)
            .map(|i| {
                let t = i as f64 / FPS;
                frame(t, 0.2 + 0.8 * t, 0.5)
            })
            .collect()
    }

    #[test]
    fn test_still_stream_emits_single_hold() {
        let mut segmenter = GestureSegmenter::with_defaults();
        let frames: Vec<PoseFrame> = (0..45).map(|i| frame(i as f64 / FPS, 0.5, 0.5)).collect();
        let segments = segmenter.segment_all(&frames).unwrap();

        assert_eq!(segments.len(), 1);
        let hold = &segments[0];
        assert_eq!(hold.gesture_type(), GestureType::Hold);
        assert_eq!(hold.start_time(), 0.0);
        assert!((hold.end_time() - 1.0).abs() < 1e-9);
        assert!((hold.confidence() - 0.9).abs() < 1e-9);
        assert_eq!(segmenter.stats().holds, 1);
        assert_eq!(segmenter.state(), SegmenterState::Still);
    }

    #[test]
    fn test_holds_can_be_disabled() {
        let mut segmenter = GestureSegmenter::new(SegmenterConfig {
            detect_holds: false,
            ..Default::default()
        });
        let frames: Vec<PoseFrame> = (0..60).map(|i| frame(i as f64 / FPS, 0.5, 0.5)).collect();
        assert!(segmenter.segment_all(&frames).unwrap().is_empty());
    }

    #[test]
    fn test_flush_completes_pending_swipe() {
        let mut segmenter = GestureSegmenter::new(raw_config());
        for f in swipe_frames(15) {
            assert!(segmenter.push_frame(&f).unwrap().is_empty());
        }
        assert_eq!(segmenter.state(), SegmenterState::Moving);

        let segments = segmenter.flush().unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].gesture_type(), GestureType::SwipeRight);
        assert_eq!(segments[0].start_time(), 0.0);
        assert!((segments[0].end_time() - 14.0 / FPS).abs() < 1e-9);
        assert!(segments[0].confidence() > 0.8);
        assert_eq!(segmenter.last_segment_end(), Some(segments[0].end_time()));
    }

    #[test]
    fn test_gap_completes_run_and_resets() {
        let mut segmenter = GestureSegmenter::new(raw_config());
        for f in swipe_frames(15) {
            segmenter.push_frame(&f).unwrap();
        }
        let segments = segmenter.push_frame(&frame(2.0, 0.9, 0.5)).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].gesture_type(), GestureType::SwipeRight);
        assert_eq!(segmenter.stats().discontinuities, 1);
        // The jump across the gap is not treated as motion.
        assert_eq!(segmenter.state(), SegmenterState::Still);
    }

    #[test]
    fn test_short_run_dropped() {
        let mut segmenter = GestureSegmenter::new(raw_config());
        for f in swipe_frames(3) {
            segmenter.push_frame(&f).unwrap();
        }
        assert!(segmenter.flush().unwrap().is_empty());
        assert_eq!(segmenter.stats().short_runs, 1);
    }

    #[test]
    fn test_long_run_split_at_max_length() {
        let mut segmenter = GestureSegmenter::new(SegmenterConfig {
            detect_holds: false,
            ..raw_config()
        });
        let frames: Vec<PoseFrame> = (0..180)
            .map(|i| {
                let t = i as f64 / FPS;
                frame(t, 0.16 * t, 0.5)
            })
            .collect();
        let segments = segmenter.segment_all(&frames).unwrap();

        // Too slow for a swipe, but the run is still cut in two.
        assert!(segments.is_empty());
        assert_eq!(segmenter.stats().runs, 2);
        assert_eq!(segmenter.stats().unclassified, 2);
    }

    #[test]
    fn test_out_of_order_frame_rejected() {
        let mut segmenter = GestureSegmenter::with_defaults();
        segmenter.push_frame(&frame(1.0, 0.5, 0.5)).unwrap();
        let err = segmenter.push_frame(&frame(0.5, 0.5, 0.5)).unwrap_err();
        assert!(matches!(err, GesturaError::Segmentation { .. }));
        assert!(segmenter.push_frame(&frame(1.0, 0.5, 0.5)).is_err());
    }

    #[test]
    fn test_empty_frames_produce_no_samples() {
        let mut segmenter = GestureSegmenter::with_defaults();
        for i in 0..10 {
            let empty = PoseFrame::new(i as f64 / FPS, vec![]).unwrap();
            assert!(segmenter.push_frame(&empty).unwrap().is_empty());
        }
        assert_eq!(segmenter.stats().frames, 10);
        assert_eq!(segmenter.stats().samples, 0);
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }

    #[test]
    fn test_low_confidence_discarded() {
        let mut segmenter = GestureSegmenter::new(SegmenterConfig {
            min_confidence: 0.95,
            ..raw_config()
        });
        for f in swipe_frames(15) {
            segmenter.push_frame(&f).unwrap();
        }
        assert!(segmenter.flush().unwrap().is_empty());
        assert_eq!(segmenter.stats().low_confidence, 1);
    }

    #[test]
    fn test_discontinuity_then_reset() {
        let mut segmenter = GestureSegmenter::new(raw_config());
        for f in swipe_frames(15) {
            segmenter.push_frame(&f).unwrap();
        }
        assert_eq!(segmenter.mark_discontinuity().unwrap().len(), 1);
        assert_eq!(segmenter.state(), SegmenterState::Idle);

        segmenter.reset();
        assert_eq!(segmenter.stats(), &SegmenterStats::default());
        assert_eq!(segmenter.last_segment_end(), None);
        // Time may restart after a reset.
        assert!(segmenter.push_frame(&frame(0.0, 0.5, 0.5)).is_ok());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: SegmenterConfig =
            serde_json::from_str(r#"{"release_secs":0.5,"tracking":{"keypoint":3}}"#).unwrap();
        assert_eq!(config.release_secs, 0.5);
        assert_eq!(config.tracking, TrackingTarget::Keypoint(3));
        assert_eq!(config.hold_min_secs, 1.0);
    }
}
