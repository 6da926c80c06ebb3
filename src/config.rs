//! Edge filter configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Lower hysteresis threshold used by the exported boundary call.
pub const DEFAULT_LOW_THRESHOLD: f32 = 50.0;
/// Upper hysteresis threshold used by the exported boundary call.
pub const DEFAULT_HIGH_THRESHOLD: f32 = 150.0;

/// Thresholds handed to the Canny detector.
///
/// Gradient magnitudes at or above `high_threshold` seed edges; pixels between
/// the two thresholds survive only when connected to a seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_threshold: DEFAULT_LOW_THRESHOLD,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
        }
    }
}

impl FilterConfig {
    pub fn new(low_threshold: f32, high_threshold: f32) -> Result<Self, ConfigError> {
        let config = Self {
            low_threshold,
            high_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Both thresholds finite, non-negative, `low <= high`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (low, high) = (self.low_threshold, self.high_threshold);
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low > high {
            return Err(ConfigError::InvalidThresholds { low, high });
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            low = config.low_threshold,
            high = config.high_threshold,
            "loaded filter config"
        );
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_boundary_thresholds() {
        let config = FilterConfig::default();
        assert_eq!(config.low_threshold, 50.0);
        assert_eq!(config.high_threshold, 150.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = FilterConfig::from_json_str(r#"{ "high_threshold": 200.0 }"#).unwrap();
        assert_eq!(config.low_threshold, DEFAULT_LOW_THRESHOLD);
        assert_eq!(config.high_threshold, 200.0);

        let empty = FilterConfig::from_json_str("{}").unwrap();
        assert_eq!(empty, FilterConfig::default());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let err = FilterConfig::from_json_str(r#"{ "low_threshold": 90.0, "high_threshold": 10.0 }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThresholds { .. }));
        assert!(FilterConfig::new(-1.0, 10.0).is_err());
        assert!(FilterConfig::new(0.0, f32::NAN).is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = FilterConfig::from_json_str("{ low_threshold: }").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn json_round_trips_through_serde() {
        let config = FilterConfig::new(20.0, 60.0).unwrap();
        let text = config.to_json_string().unwrap();
        assert_eq!(FilterConfig::from_json_str(&text).unwrap(), config);
    }
}
