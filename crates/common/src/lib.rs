//! Gestura Common Utilities
//!
//! Shared infrastructure for all Gestura crates:
//! - Error types and result aliases
//! - Monotonic clock and rate control for periodic work
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
