//! Experiment configuration.
//!
//! [`ExperimentConfig`] is the single source of truth for one run: which
//! formulation to build, its penalty weights, the oracle time budget, how
//! many samples to draw and the oracle connection settings. It round-trips
//! through JSON via [`serde`].
//!
//! # Example
//!
//! ```rust
//! use cqkp_core::config::ExperimentConfig;
//! use cqkp_core::formulation::Variant;
//!
//! let cfg = ExperimentConfig::default();
//! cfg.validate().expect("default config is valid");
//! assert_eq!(cfg.variant, Variant::BinarySlack);
//! assert_eq!(cfg.timeout_ms, 1000);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::encoder::SlackMode;
use crate::error::ConfigError;
use crate::formulation::{FormulationParams, Variant};
use crate::oracle::OracleConfig;

/// Complete configuration of a formulate → solve → decode run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Formulation variant. Default: **binary-slack**.
    pub variant: Variant,

    /// Override for the slack encoding of the slack variants. Default: none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_mode: Option<SlackMode>,

    /// Weight of the cardinality term. Default: **10.0**.
    pub lambda_card: f64,

    /// Weight of the capacity term. Default: **10.0**.
    pub lambda_cap: f64,

    /// Oracle wall-clock budget in milliseconds. Default: **1000**.
    pub timeout_ms: u64,

    /// Samples requested by [`run_multiple`](crate::runner::run_multiple)
    /// when driven from a config. Default: **1**.
    pub num_samples: usize,

    /// Oracle connection settings.
    pub oracle: OracleConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            variant: Variant::BinarySlack,
            slack_mode: None,
            lambda_card: 10.0,
            lambda_cap: 10.0,
            timeout_ms: 1000,
            num_samples: 1,
            oracle: OracleConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Default config for `variant`.
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileRead`] if the file cannot be read,
    /// [`ConfigError::ParseError`] if it is malformed, and any validation
    /// error.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        let cfg: ExperimentConfig = serde_json::from_str(&contents)
            .map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ConfigError::FileRead {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.lambda_card.is_finite() || self.lambda_card < 0.0 {
            return Err(ConfigError::invalid_value("lambda_card", "must be finite and >= 0.0"));
        }
        if !self.lambda_cap.is_finite() || self.lambda_cap < 0.0 {
            return Err(ConfigError::invalid_value("lambda_cap", "must be finite and >= 0.0"));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid_value("timeout_ms", "must be > 0"));
        }
        if self.num_samples == 0 {
            return Err(ConfigError::invalid_value("num_samples", "must be > 0"));
        }
        if self.slack_mode.is_some() && self.variant.default_slack_mode().is_none() {
            return Err(ConfigError::invalid_value(
                "slack_mode",
                format!("variant `{}` has no slack variable", self.variant),
            ));
        }
        Ok(())
    }

    /// Formulation parameters derived from this config.
    pub fn formulation_params(&self) -> FormulationParams {
        FormulationParams {
            lambda_card: self.lambda_card,
            lambda_cap: self.lambda_cap,
            slack_mode: self.slack_mode,
        }
    }

    /// Oracle time budget.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        ExperimentConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_negative_lambda() {
        let cfg = ExperimentConfig {
            lambda_cap: -1.0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "lambda_cap", .. }));
    }

    #[test]
    fn rejects_nan_lambda() {
        let cfg = ExperimentConfig {
            lambda_card: f64::NAN,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout_and_samples() {
        let cfg = ExperimentConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = ExperimentConfig {
            num_samples: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_slack_mode_on_slackless_variant() {
        let cfg = ExperimentConfig {
            variant: Variant::Naive,
            slack_mode: Some(SlackMode::Unary),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "slack_mode", .. }));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: ExperimentConfig =
            serde_json::from_str(r#"{"variant": "unary-slack", "lambda_cap": 2.5}"#).unwrap();
        assert_eq!(cfg.variant, Variant::UnarySlack);
        assert_eq!(cfg.lambda_cap, 2.5);
        assert_eq!(cfg.lambda_card, 10.0);
        assert_eq!(cfg.timeout_ms, 1000);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.json");
        let cfg = ExperimentConfig {
            variant: Variant::BinarySlack,
            slack_mode: Some(SlackMode::NativeInteger),
            num_samples: 5,
            oracle: OracleConfig::seeded(11),
            ..Default::default()
        };
        cfg.to_json(&path).unwrap();
        let back = ExperimentConfig::from_json(&path).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExperimentConfig::from_json(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
