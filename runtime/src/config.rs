//! Pipeline configuration.
//!
//! Configuration is plain data: hosts load it however they like (file,
//! environment, flags) and deserialize into [`PipelineConfig`]. Every field
//! has a default, so an empty document is a valid configuration.
//!
//! # Example
//!
//! ```
//! use railyard_runtime::config::PipelineConfig;
//! use std::time::Duration;
//!
//! let config: PipelineConfig = serde_json::from_str(r#"{"name": "accounts"}"#).unwrap();
//! assert_eq!(config.name, "accounts");
//! assert_eq!(config.slow_stage_threshold(), Duration::from_millis(500));
//!
//! let config = PipelineConfig::default()
//!     .with_name("leads")
//!     .with_slow_stage_threshold(Duration::from_millis(50));
//! assert_eq!(config.slow_stage_threshold_ms, 50);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default slow-stage warning threshold in milliseconds.
pub const DEFAULT_SLOW_STAGE_THRESHOLD_MS: u64 = 500;

/// Settings for one [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name used in tracing spans and metric labels.
    pub name: String,
    /// A stage running longer than this is logged at `warn`.
    pub slow_stage_threshold_ms: u64,
}

impl PipelineConfig {
    /// Set the pipeline name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the slow-stage warning threshold
    #[must_use]
    pub fn with_slow_stage_threshold(mut self, threshold: Duration) -> Self {
        self.slow_stage_threshold_ms = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The slow-stage warning threshold as a `Duration`
    #[must_use]
    pub const fn slow_stage_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_stage_threshold_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "pipeline".to_string(),
            slow_stage_threshold_ms: DEFAULT_SLOW_STAGE_THRESHOLD_MS,
        }
    }
}
