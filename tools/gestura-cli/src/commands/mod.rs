pub mod bench;
pub mod info;
pub mod segment;
pub mod synth;
pub mod validate;

use clap::Args;

use gestura_common::config::{AppConfig, PipelineDefaults};
use gestura_pipeline::PipelineConfig;

/// Pipeline settings that override the config file for one run.
#[derive(Debug, Clone, Default, Args)]
pub struct PipelineOverrides {
    /// Keypoint smoothing: ema|one-euro|none
    #[arg(long)]
    pub smoothing: Option<String>,

    /// EMA smoothing strength [0.0, 1.0]
    #[arg(long)]
    pub smoothing_strength: Option<f64>,

    /// Minimum confidence for an emitted gesture [0.0, 1.0]
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Per-frame latency budget (milliseconds)
    #[arg(long)]
    pub budget_ms: Option<f64>,
}

impl PipelineOverrides {
    pub fn apply(&self, defaults: &PipelineDefaults) -> PipelineDefaults {
        let mut merged = defaults.clone();
        if let Some(ref smoothing) = self.smoothing {
            merged.smoothing = smoothing.clone();
        }
        if let Some(strength) = self.smoothing_strength {
            merged.smoothing_strength = strength;
        }
        if let Some(min_confidence) = self.min_confidence {
            merged.min_confidence = min_confidence;
        }
        if let Some(budget_ms) = self.budget_ms {
            merged.latency_budget_ms = budget_ms;
        }
        merged
    }
}

/// Resolve the pipeline configuration for a command run.
pub fn pipeline_config(
    config: &AppConfig,
    overrides: &PipelineOverrides,
) -> anyhow::Result<PipelineConfig> {
    let merged = AppConfig {
        pipeline: overrides.apply(&config.pipeline),
        logging: config.logging.clone(),
    };
    merged
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid pipeline settings: {e}"))?;
    PipelineConfig::from_defaults(&merged.pipeline)
        .map_err(|e| anyhow::anyhow!("Invalid pipeline settings: {e}"))
}
