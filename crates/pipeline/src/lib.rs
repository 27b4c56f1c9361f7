//! Gestura Pipeline
//!
//! Wires pose ingestion to gesture segmentation and enforces the
//! per-frame latency budget.
//!
//! # Architecture
//!
//! ```text
//!  FrameSource ──► frame channel ──┐
//!                                  ▼
//!  ┌──────────────── GesturePipeline ────────────────┐
//!  │ PoseIngestor ─► GestureSegmenter ─► segments    │
//!  │        └──────── LatencyTracker ───────┘        │
//!  └────────────────────────┬────────────────────────┘
//!                           ▼
//!                    segment channel
//! ```

pub mod latency;
pub mod orchestrator;
pub mod session;

pub use latency::*;
pub use orchestrator::*;
pub use session::*;
