//! Tracked-point extraction and motion features.
//!
//! The segmenter follows one 2D point per frame. A run of such samples is
//! summarized into [`MotionFeatures`], which the classifier consumes.

use serde::{Deserialize, Serialize};

use gestura_pose_model::{Point2D, PoseFrame};

/// Which point of a frame the segmenter follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingTarget {
    /// Confidence-weighted centroid of all sufficiently confident keypoints.
    #[default]
    Centroid,
    /// A single landmark by index (e.g. a wrist).
    Keypoint(usize),
}

/// One tracked position in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub t: f64,
    pub position: Point2D,
    pub confidence: f64,
}

impl TrackSample {
    pub fn new(t: f64, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            t,
            position: Point2D::new(x, y),
            confidence,
        }
    }

    /// Speed from `prev` to `self` in normalized units per second.
    /// Zero when time does not advance.
    pub fn speed_from(&self, prev: &TrackSample) -> f64 {
        let dt = self.t - prev.t;
        if dt <= 0.0 {
            return 0.0;
        }
        self.position.distance_to(&prev.position) / dt
    }
}

/// Extract the tracked point of a frame, if it has one.
pub fn track_point(
    frame: &PoseFrame,
    target: TrackingTarget,
    min_confidence: f64,
) -> Option<TrackSample> {
    match target {
        TrackingTarget::Centroid => frame
            .confident_centroid(min_confidence)
            .map(|(p, conf)| TrackSample::new(frame.timestamp(), p.x, p.y, conf)),
        TrackingTarget::Keypoint(index) => frame
            .keypoint(index)
            .filter(|k| k.confidence >= min_confidence)
            .map(|k| TrackSample::new(frame.timestamp(), k.x, k.y, k.confidence)),
    }
}

/// Summary of a run of tracked samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionFeatures {
    pub start_time: f64,
    pub end_time: f64,
    pub duration_secs: f64,
    pub sample_count: usize,
    /// Net displacement, last minus first.
    pub net_dx: f64,
    pub net_dy: f64,
    /// Sum of distances between consecutive samples.
    pub path_length: f64,
    /// Path length over duration.
    pub mean_speed: f64,
    /// Net displacement over path length, in [0, 1].
    pub straightness: f64,
    /// Maximum distance from the centroid.
    pub spread: f64,
    /// Range of x and y values.
    pub x_amplitude: f64,
    pub y_amplitude: f64,
    /// Direction reversals per axis, with hysteresis.
    pub x_reversals: usize,
    pub y_reversals: usize,
    pub mean_confidence: f64,
}

impl MotionFeatures {
    /// Compute features over time-ordered samples.
    ///
    /// `reversal_min_travel` is the distance a point must travel back
    /// before a direction change counts. Returns `None` for fewer than two
    /// samples.
    pub fn from_samples(samples: &[TrackSample], reversal_min_travel: f64) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }

        let first = samples[0];
        let last = samples[samples.len() - 1];
        let duration_secs = last.t - first.t;

        let path_length: f64 = samples
            .windows(2)
            .map(|w| w[1].position.distance_to(&w[0].position))
            .sum();

        let net_dx = last.position.x - first.position.x;
        let net_dy = last.position.y - first.position.y;
        let net = (net_dx * net_dx + net_dy * net_dy).sqrt();

        let xs: Vec<f64> = samples.iter().map(|s| s.position.x).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.position.y).collect();
        let centroid = compute_centroid(samples);

        Some(Self {
            start_time: first.t,
            end_time: last.t,
            duration_secs,
            sample_count: samples.len(),
            net_dx,
            net_dy,
            path_length,
            mean_speed: if duration_secs > 0.0 {
                path_length / duration_secs
            } else {
                0.0
            },
            straightness: if path_length > 0.0 {
                (net / path_length).min(1.0)
            } else {
                0.0
            },
            spread: compute_spread(samples, centroid),
            x_amplitude: range(&xs),
            y_amplitude: range(&ys),
            x_reversals: count_reversals(&xs, reversal_min_travel),
            y_reversals: count_reversals(&ys, reversal_min_travel),
            mean_confidence: samples.iter().map(|s| s.confidence).sum::<f64>()
                / samples.len() as f64,
        })
    }
}

/// Average position of a set of samples.
fn compute_centroid(samples: &[TrackSample]) -> Point2D {
    let n = samples.len() as f64;
    let sum_x: f64 = samples.iter().map(|s| s.position.x).sum();
    let sum_y: f64 = samples.iter().map(|s| s.position.y).sum();
    Point2D::new(sum_x / n, sum_y / n)
}

/// Maximum distance from centroid.
fn compute_spread(samples: &[TrackSample], centroid: Point2D) -> f64 {
    samples
        .iter()
        .map(|s| s.position.distance_to(&centroid))
        .fold(0.0_f64, f64::max)
}

fn range(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    (max - min).max(0.0)
}

/// Count direction reversals in a 1D signal.
///
/// A direction is established once the value moves `min_travel` away from
/// the start; a reversal is counted each time it then retreats at least
/// `min_travel` from the running extreme.
pub fn count_reversals(values: &[f64], min_travel: f64) -> usize {
    let Some(&start) = values.first() else {
        return 0;
    };

    let mut direction = 0i8;
    let mut extreme = start;
    let mut reversals = 0;

    for &v in &values[1..] {
        match direction {
            0 => {
                if v - start >= min_travel {
                    direction = 1;
                    extreme = v;
                } else if start - v >= min_travel {
                    direction = -1;
                    extreme = v;
                }
            }
            1 => {
                if v > extreme {
                    extreme = v;
                } else if extreme - v >= min_travel {
                    direction = -1;
                    extreme = v;
                    reversals += 1;
                }
            }
            _ => {
                if v < extreme {
                    extreme = v;
                } else if v - extreme >= min_travel {
                    direction = 1;
                    extreme = v;
                    reversals += 1;
                }
            }
        }
    }

    reversals
}

#[cfg(test)]
mod tests {
    use super::*;
    use gestura_pose_model::Keypoint;

    fn samples(points: &[(f64, f64, f64)]) -> Vec<TrackSample> {
        points
            .iter()
            .map(|&(t, x, y)| TrackSample::new(t, x, y, 0.9))
            .collect()
    }

    #[test]
    fn test_reversals_with_hysteresis() {
        // Jitter below the travel threshold is ignored.
        assert_eq!(count_reversals(&[0.5, 0.51, 0.5, 0.51, 0.5], 0.03), 0);
        // Up, down, up: two reversals.
        assert_eq!(count_reversals(&[0.5, 0.6, 0.4, 0.6], 0.03), 2);
        // Monotonic.
        assert_eq!(count_reversals(&[0.1, 0.2, 0.3, 0.4], 0.03), 0);
        assert_eq!(count_reversals(&[], 0.03), 0);
    }

    #[test]
    fn test_straight_line_features() {
        let s = samples(&[(0.0, 0.2, 0.5), (0.25, 0.4, 0.5), (0.5, 0.6, 0.5)]);
        let f = MotionFeatures::from_samples(&s, 0.03).unwrap();
        assert!((f.duration_secs - 0.5).abs() < 1e-9);
        assert!((f.net_dx - 0.4).abs() < 1e-9);
        assert!((f.path_length - 0.4).abs() < 1e-9);
        assert!((f.mean_speed - 0.8).abs() < 1e-9);
        assert!((f.straightness - 1.0).abs() < 1e-9);
        assert!((f.spread - 0.2).abs() < 1e-9);
        assert_eq!(f.x_reversals, 0);
        assert!((f.mean_confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_back_and_forth_features() {
        let s = samples(&[
            (0.0, 0.5, 0.5),
            (0.1, 0.6, 0.5),
            (0.2, 0.4, 0.5),
            (0.3, 0.6, 0.5),
            (0.4, 0.5, 0.5),
        ]);
        let f = MotionFeatures::from_samples(&s, 0.03).unwrap();
        assert_eq!(f.x_reversals, 3);
        assert_eq!(f.y_reversals, 0);
        assert!((f.x_amplitude - 0.2).abs() < 1e-9);
        assert!(f.straightness < 0.01);
    }

    #[test]
    fn test_single_sample_has_no_features() {
        assert!(MotionFeatures::from_samples(&samples(&[(0.0, 0.5, 0.5)]), 0.03).is_none());
    }

    #[test]
    fn test_track_point_targets() {
        let frame = PoseFrame::new(
            1.0,
            vec![Keypoint::new(0.2, 0.2, 0.9), Keypoint::new(0.8, 0.8, 0.1)],
        )
        .unwrap();

        let centroid = track_point(&frame, TrackingTarget::Centroid, 0.3).unwrap();
        assert_eq!(centroid.position, Point2D::new(0.2, 0.2));

        assert!(track_point(&frame, TrackingTarget::Keypoint(1), 0.3).is_none());
        assert!(track_point(&frame, TrackingTarget::Keypoint(5), 0.3).is_none());
        let kp = track_point(&frame, TrackingTarget::Keypoint(0), 0.3).unwrap();
        assert_eq!(kp.t, 1.0);
    }

    #[test]
    fn test_speed_from() {
        let a = TrackSample::new(0.0, 0.0, 0.0, 1.0);
        let b = TrackSample::new(0.5, 0.3, 0.4, 1.0);
        assert!((b.speed_from(&a) - 1.0).abs() < 1e-9);
        assert_eq!(a.speed_from(&b), 0.0);
    }
}
