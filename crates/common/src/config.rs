//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GesturaError, GesturaResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default pipeline settings.
    pub pipeline: PipelineDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default pipeline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineDefaults {
    /// Nominal input frame rate (Hz).
    pub frame_rate_hz: u32,

    /// Per-frame processing budget in milliseconds.
    pub latency_budget_ms: f64,

    /// Minimum segment confidence to emit.
    pub min_confidence: f64,

    /// Keypoints below this confidence are ignored when tracking.
    pub min_keypoint_confidence: f64,

    /// Keypoint smoothing algorithm ("ema", "one-euro", "none").
    pub smoothing: String,

    /// Smoothing strength [0.0, 1.0] for EMA.
    pub smoothing_strength: f64,

    /// Gap between frames (seconds) treated as a stream discontinuity.
    pub max_gap_secs: f64,

    /// Capacity of the async frame channel.
    pub channel_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "gestura=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            frame_rate_hz: 30,
            latency_budget_ms: 100.0,
            min_confidence: 0.5,
            min_keypoint_confidence: 0.3,
            smoothing: "ema".to_string(),
            smoothing_strength: 0.3,
            max_gap_secs: 0.5,
            channel_capacity: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> GesturaResult<Self> {
        if !path.exists() {
            return Err(GesturaError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> GesturaResult<()> {
        let p = &self.pipeline;
        if p.frame_rate_hz == 0 {
            return Err(GesturaError::config("frame_rate_hz must be positive"));
        }
        if !p.latency_budget_ms.is_finite() || p.latency_budget_ms <= 0.0 {
            return Err(GesturaError::config("latency_budget_ms must be positive"));
        }
        for (name, value) in [
            ("min_confidence", p.min_confidence),
            ("min_keypoint_confidence", p.min_keypoint_confidence),
            ("smoothing_strength", p.smoothing_strength),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GesturaError::config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !p.max_gap_secs.is_finite() || p.max_gap_secs <= 0.0 {
            return Err(GesturaError::config("max_gap_secs must be positive"));
        }
        if p.channel_capacity == 0 {
            return Err(GesturaError::config("channel_capacity must be positive"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("gestura").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.latency_budget_ms, 100.0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"pipeline":{"min_confidence":0.7}}"#).unwrap();
        assert_eq!(config.pipeline.min_confidence, 0.7);
        assert_eq!(config.pipeline.frame_rate_hz, 30);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let mut config = AppConfig::default();
        config.pipeline.min_confidence = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_confidence"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = std::env::temp_dir().join("gestura_missing_config.json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(GesturaError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join("gestura_test_config");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"logging":{"level":"debug","json":true}}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);

        std::fs::remove_dir_all(&dir).ok();
    }
}
