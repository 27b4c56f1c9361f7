//! Gestura Gesture Core: the segmenter
//!
//! Turns a time-ordered stream of pose frames into gesture segments:
//! - **Smoothing:** EMA / One-Euro filtering of keypoints with a confidence gate
//! - **Motion:** Tracked-point extraction and per-run motion features
//! - **Classification:** Wave, swipe, and hold rules over motion features
//! - **Segmentation:** Streaming motion/stillness state machine
//!
//! This crate is pure computation: no I/O, no async.
//! All inputs are data; all outputs are data.

pub mod classifier;
pub mod motion;
pub mod segmenter;
pub mod smoothing;

pub use classifier::{Classification, ClassifierConfig, GestureClassifier};
pub use motion::{MotionFeatures, TrackSample, TrackingTarget};
pub use segmenter::{GestureSegmenter, SegmenterConfig, SegmenterState, SegmenterStats};
pub use smoothing::{KeypointSmoother, SmoothingAlgorithm};

/// Tolerance for comparing durations derived from float timestamps.
pub(crate) const TIME_EPSILON: f64 = 1e-6;
