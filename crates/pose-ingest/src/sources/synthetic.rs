//! Deterministic synthetic pose streams for tests, demos, and benchmarks.
//!
//! A script is a list of motion steps. Every keypoint follows the same
//! tracked position, laid out on a small ring around it, so the
//! confidence-weighted centroid moves exactly like the scripted motion.

use std::f64::consts::TAU;

use gestura_common::error::{GesturaError, GesturaResult};
use gestura_pose_model::{Keypoint, Point2D, PoseFrame, PoseStreamHeader};

use crate::FrameSource;

/// One kind of scripted motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyntheticMotion {
    /// Hold the current position.
    Still,
    /// Horizontal sinusoid around the current position.
    Wave { amplitude: f64, frequency_hz: f64 },
    /// Linear move by `(dx, dy)` over the step duration.
    Swipe { dx: f64, dy: f64 },
    /// Frames with no keypoints (detector lost the subject).
    Dropout,
    /// No frames at all; time keeps advancing.
    Gap,
}

/// A motion held for a duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStep {
    pub motion: SyntheticMotion,
    pub duration_secs: f64,
}

impl MotionStep {
    pub fn new(motion: SyntheticMotion, duration_secs: f64) -> Self {
        Self {
            motion,
            duration_secs,
        }
    }
}

/// Generator parameters.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub frame_rate_hz: u32,
    pub keypoint_count: usize,
    /// Timestamp of the first frame (seconds).
    pub start_time: f64,
    /// Starting tracked position.
    pub origin: Point2D,
    /// Confidence assigned to every keypoint.
    pub confidence: f64,
    /// Radius of the keypoint ring around the tracked position.
    pub spread: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 30,
            keypoint_count: 2,
            start_time: 0.0,
            origin: Point2D::new(0.5, 0.5),
            confidence: 0.9,
            spread: 0.03,
        }
    }
}

/// Default wave used by scripts.
const WAVE_AMPLITUDE: f64 = 0.08;
const WAVE_FREQUENCY_HZ: f64 = 1.5;
/// Default swipe displacement used by scripts.
const SWIPE_DISTANCE: f64 = 0.4;

/// Parse a script such as `still:1,wave:2,swipe_right:0.5,gap:1`.
pub fn parse_script(script: &str) -> GesturaResult<Vec<MotionStep>> {
    script
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| {
            let (name, secs) = item.split_once(':').ok_or_else(|| {
                GesturaError::config(format!("script step {item:?} must be <motion>:<seconds>"))
            })?;
            let duration_secs: f64 = secs.trim().parse().map_err(|_| {
                GesturaError::config(format!("invalid duration in script step {item:?}"))
            })?;
            if !duration_secs.is_finite() || duration_secs <= 0.0 {
                return Err(GesturaError::config(format!(
                    "duration must be positive in script step {item:?}"
                )));
            }
            let motion = match name.trim() {
                "still" => SyntheticMotion::Still,
                "wave" => SyntheticMotion::Wave {
                    amplitude: WAVE_AMPLITUDE,
                    frequency_hz: WAVE_FREQUENCY_HZ,
                },
                "swipe_left" => SyntheticMotion::Swipe {
                    dx: -SWIPE_DISTANCE,
                    dy: 0.0,
                },
                "swipe_right" => SyntheticMotion::Swipe {
                    dx: SWIPE_DISTANCE,
                    dy: 0.0,
                },
                "swipe_up" => SyntheticMotion::Swipe {
                    dx: 0.0,
                    dy: -SWIPE_DISTANCE,
                },
                "swipe_down" => SyntheticMotion::Swipe {
                    dx: 0.0,
                    dy: SWIPE_DISTANCE,
                },
                "dropout" => SyntheticMotion::Dropout,
                "gap" => SyntheticMotion::Gap,
                other => {
                    return Err(GesturaError::config(format!(
                        "unknown motion {other:?} in script"
                    )))
                }
            };
            Ok(MotionStep::new(motion, duration_secs))
        })
        .collect()
}

/// Lazily generates frames from a motion script.
pub struct SyntheticSource {
    config: SyntheticConfig,
    steps: Vec<MotionStep>,
    header: PoseStreamHeader,
    step_index: usize,
    /// Frame index within the current step.
    step_frame: u64,
    /// Global frame slot, including slots skipped by gaps.
    slot: u64,
    anchor: Point2D,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig, steps: Vec<MotionStep>) -> Self {
        let header = PoseStreamHeader::new(
            "synthetic",
            config.frame_rate_hz,
            config.keypoint_count,
        );
        Self {
            anchor: config.origin,
            config,
            steps,
            header,
            step_index: 0,
            step_frame: 0,
            slot: 0,
        }
    }

    /// Build from a textual script with default settings.
    pub fn from_script(script: &str) -> GesturaResult<Self> {
        Ok(Self::new(SyntheticConfig::default(), parse_script(script)?))
    }

    /// Generate every remaining frame.
    pub fn collect_frames(mut self) -> Vec<PoseFrame> {
        let mut frames = vec![];
        while let Some(frame) = self.generate() {
            frames.push(frame);
        }
        frames
    }

    fn frames_in(&self, step: &MotionStep) -> u64 {
        (step.duration_secs * self.config.frame_rate_hz as f64).round() as u64
    }

    fn position_at(&self, motion: SyntheticMotion, t: f64, duration: f64) -> Point2D {
        let p = match motion {
            SyntheticMotion::Wave {
                amplitude,
                frequency_hz,
            } => Point2D::new(
                self.anchor.x + amplitude * (TAU * frequency_hz * t).sin(),
                self.anchor.y,
            ),
            SyntheticMotion::Swipe { dx, dy } => {
                let progress = if duration > 0.0 { t / duration } else { 1.0 };
                Point2D::new(self.anchor.x + dx * progress, self.anchor.y + dy * progress)
            }
            _ => self.anchor,
        };
        Point2D::new(p.x.clamp(0.0, 1.0), p.y.clamp(0.0, 1.0))
    }

    fn keypoints_at(&self, center: Point2D) -> Vec<Keypoint> {
        let n = self.config.keypoint_count;
        (0..n)
            .map(|i| {
                let (ox, oy) = if i == 0 || n < 2 {
                    (0.0, 0.0)
                } else {
                    let angle = TAU * (i - 1) as f64 / (n - 1) as f64;
                    (self.config.spread * angle.cos(), self.config.spread * angle.sin())
                };
                Keypoint::new(
                    (center.x + ox).clamp(0.0, 1.0),
                    (center.y + oy).clamp(0.0, 1.0),
                    self.config.confidence.clamp(0.0, 1.0),
                )
            })
            .collect()
    }

    fn generate(&mut self) -> Option<PoseFrame> {
        let fps = self.config.frame_rate_hz.max(1) as f64;

        loop {
            let step = *self.steps.get(self.step_index)?;
            let total = self.frames_in(&step);

            if self.step_frame >= total {
                // Carry the end position of this step into the next one.
                let end = self.position_at(step.motion, step.duration_secs, step.duration_secs);
                self.anchor = end;
                self.step_index += 1;
                self.step_frame = 0;
                continue;
            }

            let t_local = self.step_frame as f64 / fps;
            let timestamp = self.config.start_time + self.slot as f64 / fps;
            self.step_frame += 1;
            self.slot += 1;

            let keypoints = match step.motion {
                SyntheticMotion::Gap => continue,
                SyntheticMotion::Dropout => vec![],
                motion => self.keypoints_at(self.position_at(motion, t_local, step.duration_secs)),
            };

            // Generated values are clamped into range, so construction cannot fail.
            return PoseFrame::new(timestamp, keypoints).ok();
        }
    }
}

impl Iterator for SyntheticSource {
    type Item = PoseFrame;

    fn next(&mut self) -> Option<PoseFrame> {
        self.generate()
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> GesturaResult<Option<PoseFrame>> {
        Ok(self.generate())
    }

    fn name(&self) -> &str {
        "synthetic"
    }

    fn header(&self) -> Option<&PoseStreamHeader> {
        Some(&self.header)
    }
}
