//! Shared configuration for the Retopo runtime
//!
//! This crate is the single source of truth for timer rates and session
//! defaults used by the tool set. Hosts either take [`RuntimeConfig::default`]
//! or load overrides from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default periodic timer rate in hertz
pub const DEFAULT_TIMER_HZ: f64 = 10.0;

/// Lowest timer rate a tool can request
pub const MIN_TIMER_HZ: f64 = 0.1;

/// Error loading a configuration document
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("invalid runtime config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read runtime config: {0}")]
    Io(#[from] std::io::Error),
}

/// Periodic timer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Requested rate in hertz, clamped to [`MIN_TIMER_HZ`]
    pub hz: f64,
    /// Whether the timer starts enabled
    pub enabled: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            hz: DEFAULT_TIMER_HZ,
            enabled: true,
        }
    }
}

impl TimerConfig {
    pub fn new(hz: f64) -> Self {
        Self {
            hz,
            ..Self::default()
        }
    }

    /// Rate actually used by the timer
    pub fn effective_hz(&self) -> f64 {
        clamp_hz(self.hz)
    }

    /// Seconds between two timer events
    pub fn interval_secs(&self) -> f64 {
        1.0 / self.effective_hz()
    }
}

/// Clamp a requested rate to the supported minimum.
///
/// Non-finite or non-positive rates fall back to the minimum.
pub fn clamp_hz(hz: f64) -> f64 {
    if hz.is_finite() { hz.max(MIN_TIMER_HZ) } else { MIN_TIMER_HZ }
}

/// Session-wide runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub timer: TimerConfig,
    /// Tool selected when the session starts; the first registered tool
    /// otherwise
    pub start_tool: Option<String>,
}

impl RuntimeConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
