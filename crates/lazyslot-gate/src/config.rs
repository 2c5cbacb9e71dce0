//! Gate configuration
//!
//! Defaults suit a full-width canvas section: visible at 15%
//! intersection with a 200px vertical margin, 50ms before construction,
//! 800ms before pausing once out of view.

use crate::error::GateError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest accepted init or pause delay (one hour)
pub const MAX_DELAY_MS: u64 = 3_600_000;

/// Debounce and intersection settings for one gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Intersection ratio at or above which the section counts as visible
    pub threshold: f64,
    /// Pixels added above and below the viewport
    pub root_margin_px: u32,
    /// Delay between first visibility and construction
    pub init_delay_ms: u64,
    /// Delay between leaving view and pausing
    pub pause_delay_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold: 0.15,
            root_margin_px: 200,
            init_delay_ms: 50,
            pause_delay_ms: 800,
        }
    }
}

impl GateConfig {
    /// Create config with default values
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set visibility threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set root margin
    #[inline]
    #[must_use]
    pub fn with_root_margin(mut self, px: u32) -> Self {
        self.root_margin_px = px;
        self
    }

    /// Set init and pause delays
    #[inline]
    #[must_use]
    pub fn with_delays(mut self, init_ms: u64, pause_ms: u64) -> Self {
        self.init_delay_ms = init_ms;
        self.pause_delay_ms = pause_ms;
        self
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `GateError::InvalidThreshold` if threshold is NaN or outside `0.0..=1.0`
    /// - `GateError::InvalidDelay` if a delay exceeds [`MAX_DELAY_MS`]
    pub fn validate(&self) -> Result<(), GateError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(GateError::InvalidThreshold(self.threshold));
        }
        for (field, ms) in [
            ("init_delay_ms", self.init_delay_ms),
            ("pause_delay_ms", self.pause_delay_ms),
        ] {
            if ms > MAX_DELAY_MS {
                return Err(GateError::InvalidDelay { field, ms });
            }
        }
        Ok(())
    }

    /// Parse and validate from TOML
    ///
    /// Missing fields fall back to defaults.
    ///
    /// # Errors
    /// - `GateError::Config` on malformed TOML or unknown fields
    /// - `GateError::InvalidThreshold` on out-of-range threshold
    /// - `GateError::InvalidDelay` on a delay above [`MAX_DELAY_MS`]
    pub fn from_toml_str(s: &str) -> Result<Self, GateError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate from a TOML file
    ///
    /// # Errors
    /// - `GateError::Io` if the file cannot be read
    /// - any error from [`GateConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GateError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| GateError::io_error(path, e))?;
        Self::from_toml_str(&raw)
    }

    /// Init debounce as a duration
    #[inline]
    #[must_use]
    pub fn init_delay(&self) -> Duration {
        Duration::from_millis(self.init_delay_ms)
    }

    /// Pause debounce as a duration
    #[inline]
    #[must_use]
    pub fn pause_delay(&self) -> Duration {
        Duration::from_millis(self.pause_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.threshold, 0.15);
        assert_eq!(config.root_margin_px, 200);
        assert_eq!(config.init_delay(), Duration::from_millis(50));
        assert_eq!(config.pause_delay(), Duration::from_millis(800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_partial_toml_uses_defaults() {
        let config = GateConfig::from_toml_str("pause_delay_ms = 1200\n").unwrap();
        assert_eq!(config.pause_delay_ms, 1200);
        assert_eq!(config.init_delay_ms, 50);
    }

    #[test]
    fn config_rejects_bad_threshold() {
        let result = GateConfig::from_toml_str("threshold = 1.5\n");
        assert!(matches!(result, Err(GateError::InvalidThreshold(t)) if t == 1.5));

        assert!(GateConfig::new().with_threshold(f64::NAN).validate().is_err());
    }

    #[test]
    fn config_rejects_oversized_delay() {
        let result = GateConfig::from_toml_str("pause_delay_ms = 9223372036854775807\n");
        assert!(matches!(
            result,
            Err(GateError::InvalidDelay { field: "pause_delay_ms", .. })
        ));

        let at_limit = GateConfig::new().with_delays(MAX_DELAY_MS, MAX_DELAY_MS);
        assert!(at_limit.validate().is_ok());
        assert!(GateConfig::new().with_delays(MAX_DELAY_MS + 1, 0).validate().is_err());
    }

    #[test]
    fn config_rejects_unknown_field() {
        let result = GateConfig::from_toml_str("treshold = 0.3\n");
        assert!(matches!(result, Err(GateError::Config(_))));
    }

    #[test]
    fn config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "threshold = 0.25\nroot_margin_px = 0").unwrap();

        let config = GateConfig::load(file.path()).unwrap();
        assert_eq!(config, GateConfig::new().with_threshold(0.25).with_root_margin(0));
    }

    #[test]
    fn config_load_missing_file() {
        let result = GateConfig::load("/nonexistent/lazyslot/gate.toml");
        assert!(matches!(result, Err(GateError::Io { .. })));
    }
}
