//! Keypoint smoothing filters.
//!
//! Raw detector output jitters from frame to frame. Each keypoint gets its
//! own per-axis filter; keypoints whose confidence falls below the gate
//! hold their last smoothed position instead of feeding noise through.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use gestura_pose_model::{Keypoint, ModelError, PoseFrame};

/// Available smoothing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum SmoothingAlgorithm {
    /// Exponential Moving Average.
    ///
    /// `strength` is in [0.0, 1.0], where larger values mean more smoothing.
    Ema { strength: f64 },

    /// One-Euro adaptive low-pass filter: smooth at rest, responsive in motion.
    OneEuro { min_cutoff: f64, beta: f64 },

    /// No smoothing; pass through raw data.
    None,
}

impl Default for SmoothingAlgorithm {
    fn default() -> Self {
        Self::Ema { strength: 0.3 }
    }
}

impl SmoothingAlgorithm {
    /// Build from a CLI/config name: `ema`, `one-euro`, or `none`.
    pub fn from_name(name: &str, strength: f64) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ema" => Some(Self::Ema {
                strength: clamp01(strength),
            }),
            "one-euro" | "one_euro" | "oneeuro" => Some(Self::OneEuro {
                min_cutoff: 1.0,
                beta: 0.15,
            }),
            "none" | "off" => Some(Self::None),
            _ => None,
        }
    }
}

/// Single-axis filter state.
#[derive(Debug, Clone)]
enum AxisFilter {
    Ema {
        alpha: f64,
        prev: Option<f64>,
    },
    OneEuro {
        min_cutoff: f64,
        beta: f64,
        d_cutoff: f64,
        prev: Option<(f64, f64)>,
        dx_prev: f64,
    },
    Pass,
}

impl AxisFilter {
    fn new(algorithm: SmoothingAlgorithm) -> Self {
        match algorithm {
            SmoothingAlgorithm::Ema { strength } => Self::Ema {
                alpha: clamp01(1.0 - strength),
                prev: None,
            },
            SmoothingAlgorithm::OneEuro { min_cutoff, beta } => Self::OneEuro {
                min_cutoff,
                beta,
                d_cutoff: 1.0,
                prev: None,
                dx_prev: 0.0,
            },
            SmoothingAlgorithm::None => Self::Pass,
        }
    }

    fn filter(&mut self, t: f64, x: f64) -> f64 {
        match self {
            Self::Ema { alpha, prev } => {
                let next = match *prev {
                    Some(p) => *alpha * x + (1.0 - *alpha) * p,
                    None => x,
                };
                *prev = Some(next);
                next
            }
            Self::OneEuro {
                min_cutoff,
                beta,
                d_cutoff,
                prev,
                dx_prev,
            } => {
                let Some((t_prev, x_prev)) = *prev else {
                    *prev = Some((t, x));
                    return x;
                };
                let t_e = t - t_prev;
                if t_e <= 0.0 {
                    return x_prev;
                }

                let a_d = one_euro_alpha(t_e, *d_cutoff);
                let dx = (x - x_prev) / t_e;
                let dx_hat = a_d * dx + (1.0 - a_d) * *dx_prev;

                let cutoff = *min_cutoff + *beta * dx_hat.abs();
                let a = one_euro_alpha(t_e, cutoff);
                let x_hat = a * x + (1.0 - a) * x_prev;

                *prev = Some((t, x_hat));
                *dx_prev = dx_hat;
                x_hat
            }
            Self::Pass => x,
        }
    }
}

fn one_euro_alpha(t_e: f64, cutoff: f64) -> f64 {
    let r = TAU * cutoff * t_e;
    r / (r + 1.0)
}

#[derive(Debug, Clone)]
struct KeypointFilter {
    x: AxisFilter,
    y: AxisFilter,
    last: Option<(f64, f64)>,
}

/// Per-keypoint smoothing engine for a pose stream.
pub struct KeypointSmoother {
    algorithm: SmoothingAlgorithm,
    confidence_gate: f64,
    filters: Vec<KeypointFilter>,
}

impl KeypointSmoother {
    /// Create a smoother; keypoints below `confidence_gate` hold position.
    pub fn new(algorithm: SmoothingAlgorithm, confidence_gate: f64) -> Self {
        Self {
            algorithm,
            confidence_gate,
            filters: vec![],
        }
    }

    pub fn algorithm(&self) -> SmoothingAlgorithm {
        self.algorithm
    }

    /// Forget all filter state (stream restart or discontinuity).
    pub fn reset(&mut self) {
        self.filters.clear();
    }

    /// Smooth one frame. Empty frames pass through and leave state untouched.
    pub fn smooth(&mut self, frame: &PoseFrame) -> Result<PoseFrame, ModelError> {
        if frame.is_empty() || self.algorithm == SmoothingAlgorithm::None {
            return Ok(frame.clone());
        }

        if self.filters.len() != frame.len() {
            self.filters = (0..frame.len())
                .map(|_| KeypointFilter {
                    x: AxisFilter::new(self.algorithm),
                    y: AxisFilter::new(self.algorithm),
                    last: None,
                })
                .collect();
        }

        let t = frame.timestamp();
        let gate = self.confidence_gate;
        let keypoints = frame
            .keypoints()
            .iter()
            .zip(self.filters.iter_mut())
            .map(|(kp, filter)| {
                let (x, y) = match filter.last {
                    Some(last) if kp.confidence < gate => last,
                    _ => {
                        let smoothed = (
                            clamp01(filter.x.filter(t, kp.x)),
                            clamp01(filter.y.filter(t, kp.y)),
                        );
                        filter.last = Some(smoothed);
                        smoothed
                    }
                };
                Keypoint::new(x, y, kp.confidence)
            })
            .collect();

        PoseFrame::new(t, keypoints)
    }

    /// Smooth a whole sequence of frames in order.
    pub fn smooth_frames(&mut self, frames: &[PoseFrame]) -> Result<Vec<PoseFrame>, ModelError> {
        frames.iter().map(|f| self.smooth(f)).collect()
    }
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(t: f64, x: f64, confidence: f64) -> PoseFrame {
        PoseFrame::new(t, vec![Keypoint::new(x, 0.5, confidence)]).unwrap()
    }

    #[test]
    fn test_none_passes_through() {
        let mut smoother = KeypointSmoother::new(SmoothingAlgorithm::None, 0.3);
        let input = frame(0.0, 0.42, 0.9);
        assert_eq!(smoother.smooth(&input).unwrap(), input);
    }

    #[test]
    fn test_ema_strength_semantics() {
        let mut smoother = KeypointSmoother::new(SmoothingAlgorithm::Ema { strength: 0.5 }, 0.3);
        let first = smoother.smooth(&frame(0.0, 0.0, 0.9)).unwrap();
        assert_eq!(first.keypoints()[0].x, 0.0);
        let second = smoother.smooth(&frame(0.1, 1.0, 0.9)).unwrap();
        assert!((second.keypoints()[0].x - 0.5).abs() < 1e-9);
        let third = smoother.smooth(&frame(0.2, 1.0, 0.9)).unwrap();
        assert!((third.keypoints()[0].x - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_low_confidence_holds_last_position() {
        let mut smoother = KeypointSmoother::new(SmoothingAlgorithm::Ema { strength: 0.0 }, 0.5);
        smoother.smooth(&frame(0.0, 0.3, 0.9)).unwrap();
        let gated = smoother.smooth(&frame(0.1, 0.9, 0.1)).unwrap();
        assert_eq!(gated.keypoints()[0].x, 0.3);
        assert_eq!(gated.keypoints()[0].confidence, 0.1);
    }

    #[test]
    fn test_one_euro_converges_on_static_input() {
        let mut smoother = KeypointSmoother::new(
            SmoothingAlgorithm::OneEuro {
                min_cutoff: 1.0,
                beta: 0.15,
            },
            0.3,
        );
        smoother.smooth(&frame(0.0, 0.2, 0.9)).unwrap();
        let mut last = 0.0;
        for i in 1..120 {
            last = smoother.smooth(&frame(i as f64 / 30.0, 0.8, 0.9)).unwrap().keypoints()[0].x;
        }
        assert!((last - 0.8).abs() < 0.01);
    }

    #[test]
    fn test_layout_change_resets_filters() {
        let mut smoother = KeypointSmoother::new(SmoothingAlgorithm::Ema { strength: 0.9 }, 0.3);
        smoother.smooth(&frame(0.0, 0.1, 0.9)).unwrap();
        let two = PoseFrame::new(
            0.1,
            vec![Keypoint::new(0.7, 0.5, 0.9), Keypoint::new(0.2, 0.5, 0.9)],
        )
        .unwrap();
        let out = smoother.smooth(&two).unwrap();
        assert_eq!(out.keypoints()[0].x, 0.7);
    }

    #[test]
    fn test_empty_frame_keeps_state() {
        let mut smoother = KeypointSmoother::new(SmoothingAlgorithm::Ema { strength: 0.5 }, 0.3);
        smoother.smooth(&frame(0.0, 0.0, 0.9)).unwrap();
        smoother.smooth(&PoseFrame::new(0.1, vec![]).unwrap()).unwrap();
        let out = smoother.smooth(&frame(0.2, 1.0, 0.9)).unwrap();
        assert!((out.keypoints()[0].x - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            SmoothingAlgorithm::from_name("EMA", 0.4),
            Some(SmoothingAlgorithm::Ema { strength: 0.4 })
        );
        assert!(matches!(
            SmoothingAlgorithm::from_name("one-euro", 0.0),
            Some(SmoothingAlgorithm::OneEuro { .. })
        ));
        assert_eq!(
            SmoothingAlgorithm::from_name("none", 0.0),
            Some(SmoothingAlgorithm::None)
        );
        assert_eq!(SmoothingAlgorithm::from_name("kalman", 0.0), None);
    }
}
