//! Tracker configuration.

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Errors loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid JSON for [`TrackerConfig`]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for a progress tracker.
///
/// Every field has a default, so a config file only needs the values it
/// overrides. Per-course overrides are expressed by handing a different
/// config to each lesson session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Seeks longer than this (either direction) raise a skipping notice
    pub large_jump_threshold_seconds: f64,
    /// Position reports further apart than this are treated as unreported seeks
    pub max_timeupdate_gap_seconds: f64,
    /// Minimum wall-clock time between periodic saves
    pub save_interval_seconds: u64,
    /// Percentage the completion validator requires. Not used by the
    /// tracker itself; see `StoredProgressValidator::from_config`.
    pub completion_threshold_percent: u8,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            large_jump_threshold_seconds: 10.0,
            max_timeupdate_gap_seconds: 10.0,
            save_interval_seconds: 10,
            completion_threshold_percent: 80,
        }
    }
}

impl TrackerConfig {
    /// Load a JSON config file and clamp it to sane values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config.validate())
    }

    /// Replace nonsense values with defaults and clamp the threshold to 100.
    pub fn validate(mut self) -> Self {
        let defaults = Self::default();
        if !self.large_jump_threshold_seconds.is_finite() || self.large_jump_threshold_seconds < 0.0 {
            self.large_jump_threshold_seconds = defaults.large_jump_threshold_seconds;
        }
        if !self.max_timeupdate_gap_seconds.is_finite() || self.max_timeupdate_gap_seconds <= 0.0 {
            self.max_timeupdate_gap_seconds = defaults.max_timeupdate_gap_seconds;
        }
        if self.save_interval_seconds == 0 {
            self.save_interval_seconds = 1;
        }
        self.completion_threshold_percent = self.completion_threshold_percent.min(100);
        self
    }

    /// Periodic save interval.
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_seconds)
    }
}
