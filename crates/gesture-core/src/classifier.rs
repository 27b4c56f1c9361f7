//! Rule-based gesture classification over motion features.
//!
//! # Rules
//!
//! 1. **Wave**: enough horizontal reversals with a visible amplitude,
//!    dominated by horizontal motion.
//! 2. **Swipe**: long, straight and fast displacement along one axis.
//!    Image coordinates: y grows downward, so a negative `dy` is "up".
//! 3. **Hold**: the tracked point stays inside a small radius.
//!
//! Every rule yields a shape score in [0.5, 1.0]. The reported confidence
//! is that score scaled by the mean keypoint confidence of the run.

use serde::{Deserialize, Serialize};

use gestura_pose_model::GestureType;

use crate::motion::MotionFeatures;

/// Thresholds for the classification rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum horizontal direction reversals for a wave.
    pub wave_min_reversals: usize,
    /// Distance the point must travel back before a reversal counts.
    pub wave_min_travel: f64,
    /// Minimum horizontal range (normalized) for a wave.
    pub wave_min_amplitude: f64,

    /// Minimum net displacement along the dominant axis for a swipe.
    pub swipe_min_distance: f64,
    /// Minimum net-displacement / path-length ratio for a swipe.
    pub swipe_min_straightness: f64,
    /// Minimum mean speed (normalized units per second) for a swipe.
    pub swipe_min_speed: f64,

    /// Maximum distance from the centroid for a hold.
    pub hold_max_spread: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            wave_min_reversals: 2,
            wave_min_travel: 0.03,
            wave_min_amplitude: 0.05,
            swipe_min_distance: 0.2,
            swipe_min_straightness: 0.75,
            swipe_min_speed: 0.4,
            hold_max_spread: 0.03,
        }
    }
}

/// A labelled run with its confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub gesture_type: GestureType,
    pub confidence: f64,
}

/// Applies the classification rules.
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    config: ClassifierConfig,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ClassifierConfig::default())
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a completed motion run as a wave or a swipe.
    ///
    /// Wave is tried first: a wave has little net displacement, so the
    /// two rules rarely compete, but an oscillation ending off-center
    /// should not read as a swipe.
    pub fn classify_motion(&self, features: &MotionFeatures) -> Option<Classification> {
        self.wave_score(features)
            .map(|score| (GestureType::Wave, score))
            .or_else(|| self.swipe_score(features))
            .map(|(gesture_type, score)| Classification {
                gesture_type,
                confidence: scaled_confidence(score, features.mean_confidence),
            })
    }

    /// Classify a stillness streak as a hold.
    pub fn classify_hold(&self, features: &MotionFeatures) -> Option<Classification> {
        let max_spread = self.config.hold_max_spread;
        if max_spread <= 0.0 || features.spread > max_spread {
            return None;
        }
        let score = 1.0 - 0.5 * (features.spread / max_spread).min(1.0);
        Some(Classification {
            gesture_type: GestureType::Hold,
            confidence: scaled_confidence(score, features.mean_confidence),
        })
    }

    fn wave_score(&self, f: &MotionFeatures) -> Option<f64> {
        let min_reversals = self.config.wave_min_reversals.max(1);
        if f.x_reversals < min_reversals
            || f.x_amplitude < self.config.wave_min_amplitude
            || f.x_amplitude < f.y_amplitude
        {
            return None;
        }
        let ratio = f.x_reversals as f64 / (2 * min_reversals) as f64;
        Some(0.5 + 0.5 * ratio.min(1.0))
    }

    fn swipe_score(&self, f: &MotionFeatures) -> Option<(GestureType, f64)> {
        let (distance, gesture_type) = if f.net_dx.abs() >= f.net_dy.abs() {
            let label = if f.net_dx >= 0.0 {
                GestureType::SwipeRight
            } else {
                GestureType::SwipeLeft
            };
            (f.net_dx.abs(), label)
        } else {
            let label = if f.net_dy >= 0.0 {
                GestureType::SwipeDown
            } else {
                GestureType::SwipeUp
            };
            (f.net_dy.abs(), label)
        };

        if distance < self.config.swipe_min_distance
            || f.straightness < self.config.swipe_min_straightness
            || f.mean_speed < self.config.swipe_min_speed
        {
            return None;
        }

        let reach = if self.config.swipe_min_distance > 0.0 {
            (distance / (2.0 * self.config.swipe_min_distance)).min(1.0)
        } else {
            1.0
        };
        Some((gesture_type, 0.5 * f.straightness + 0.5 * reach))
    }
}

fn scaled_confidence(score: f64, keypoint_confidence: f64) -> f64 {
    (score * keypoint_confidence).clamp(0.0, 1.0)
}
