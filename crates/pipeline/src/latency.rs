//! Per-frame processing latency and decision lag.

use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

use gestura_common::error::{GesturaError, GesturaResult};

/// Default end-to-end budget for one frame-to-segment decision.
pub const DEFAULT_LATENCY_BUDGET_MS: f64 = 100.0;

/// Histogram precision; quantiles are within 0.1% of the recorded value.
const SIGNIFICANT_DIGITS: u8 = 3;

/// Records processing durations against a budget.
///
/// Samples land in a microsecond HDR histogram, so memory stays constant
/// however long the stream runs. Count, mean, max and the over-budget
/// tally are kept exactly; p50/p95 come from the histogram.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    budget_ms: f64,
    histogram: Histogram<u64>,
    total_ms: f64,
    max_ms: f64,
    over_budget: u64,
}

/// Latency summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyReport {
    pub frames: u64,
    pub budget_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
    pub over_budget: u64,
}

impl LatencyReport {
    /// No frame exceeded the budget.
    pub fn within_budget(&self) -> bool {
        self.over_budget == 0
    }
}

impl LatencyTracker {
    pub fn new(budget_ms: f64) -> GesturaResult<Self> {
        let histogram = Histogram::<u64>::new(SIGNIFICANT_DIGITS).map_err(|e| {
            GesturaError::pipeline(format!("Failed to create latency histogram: {e:?}"))
        })?;
        Ok(Self {
            budget_ms,
            histogram,
            total_ms: 0.0,
            max_ms: 0.0,
            over_budget: 0,
        })
    }

    pub fn budget_ms(&self) -> f64 {
        self.budget_ms
    }

    /// Record one duration. Returns true when it exceeded the budget.
    pub fn record(&mut self, elapsed: Duration) -> bool {
        self.record_ms(elapsed.as_secs_f64() * 1000.0)
    }

    pub fn record_ms(&mut self, ms: f64) -> bool {
        let ms = ms.max(0.0);
        self.histogram.saturating_record((ms * 1000.0).round() as u64);
        self.total_ms += ms;
        self.max_ms = self.max_ms.max(ms);

        let over = ms > self.budget_ms;
        if over {
            self.over_budget += 1;
        }
        over
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }

    pub fn report(&self) -> LatencyReport {
        let frames = self.len();
        let mean_ms = if frames == 0 {
            0.0
        } else {
            self.total_ms / frames as f64
        };

        LatencyReport {
            frames,
            budget_ms: self.budget_ms,
            mean_ms,
            p50_ms: self.quantile_ms(0.50),
            p95_ms: self.quantile_ms(0.95),
            max_ms: self.max_ms,
            over_budget: self.over_budget,
        }
    }

    fn quantile_ms(&self, q: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        // Bucket upper bounds can overshoot the largest sample slightly.
        (self.histogram.value_at_quantile(q) as f64 / 1000.0).min(self.max_ms)
    }
}

/// Stream-time lag between a segment's end and the frame that emitted it.
///
/// A swipe is only known once the release window has passed, so this
/// measures how long after the gesture ended the decision was made.
#[derive(Debug, Clone, Default)]
pub struct DecisionLag {
    count: u64,
    total_secs: f64,
    max_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LagReport {
    pub segments: u64,
    pub mean_secs: f64,
    pub max_secs: f64,
}

impl DecisionLag {
    pub fn record(&mut self, lag_secs: f64) {
        let lag = lag_secs.max(0.0);
        self.count += 1;
        self.total_secs += lag;
        self.max_secs = self.max_secs.max(lag);
    }

    pub fn report(&self) -> LagReport {
        LagReport {
            segments: self.count,
            mean_secs: if self.count == 0 {
                0.0
            } else {
                self.total_secs / self.count as f64
            },
            max_secs: self.max_secs,
        }
    }
}
