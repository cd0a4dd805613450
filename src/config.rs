use crate::core::{CollateError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Flush period used when none (or zero) is configured.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 10_000;

/// Period for a configured number of milliseconds, 0 selecting
/// [`DEFAULT_FLUSH_INTERVAL_MS`].
pub fn interval_or_default(interval_ms: u64) -> Duration {
    match interval_ms {
        0 => Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
        ms => Duration::from_millis(ms),
    }
}

/// Order book configuration
///
/// Can be built in code or loaded from a JSON file:
///
/// ```json
/// { "output_dir": "out", "flush_interval_ms": 30000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderBookConfig {
    /// Directory receiving one CSV file per order
    pub output_dir: PathBuf,

    /// Flush period in milliseconds, 0 selects the default
    #[serde(default)]
    pub flush_interval_ms: u64,
}

impl OrderBookConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            flush_interval_ms: 0,
        }
    }

    /// Set the flush period
    pub fn flush_interval_ms(mut self, interval_ms: u64) -> Self {
        self.flush_interval_ms = interval_ms;
        self
    }

    /// Effective flush period
    pub fn flush_interval(&self) -> Duration {
        interval_or_default(self.flush_interval_ms)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CollateError::io(path, e))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(CollateError::InvalidConfig(
                "output_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
