//! Gestura Pose Model
//!
//! Defines the core data contracts for the pose-to-gesture pipeline:
//! - **Keypoints:** Normalized 2D landmarks with a confidence score
//! - **Frames:** Timestamped, immutable snapshots of keypoints
//! - **Segments:** Classified, time-bounded gesture events
//!
//! All coordinates are normalized to `[0.0, 1.0]` relative to the source
//! frame, with `(0.0, 0.0)` at the top-left corner. Timestamps are
//! monotonic fractional seconds.

pub mod error;
pub mod frame;
pub mod keypoint;
pub mod segment;

pub use error::*;
pub use frame::*;
pub use keypoint::*;
pub use segment::*;
