//! Dispatcher configuration, loaded from TOML.
//!
//! ```toml
//! [dispatcher]
//! name = "orders"
//! max_deliveries = 5
//!
//! [pipeline]
//! trace_behaviors = true
//! ```

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level middleware configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MiddlewareConfig {
    pub dispatcher: DispatcherSettings,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherSettings {
    /// Name used in tracing spans, so several dispatchers in one process
    /// stay distinguishable.
    pub name: String,

    /// Deliveries allowed before the built-in dead-letter policy faults
    /// the run.
    pub max_deliveries: u32,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            name: "dispatcher".to_string(),
            max_deliveries: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// Wire the intent-audit behavior at the head of the incoming chain, so
    /// every message is traced entering and leaving it.
    pub trace_behaviors: bool,
}

impl MiddlewareConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}
