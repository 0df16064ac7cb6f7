//! Configuration module for AutoValue.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by domain: Model and Observability.

mod model_config;
mod observability_config;

pub use model_config::{DEFAULT_MODEL_PATH, ModelEnvConfig};
pub use observability_config::ObservabilityEnvConfig;

use crate::domain::valuation::ConfidencePolicy;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Model (from ModelEnvConfig)
    pub model_path: PathBuf,
    pub confidence: ConfidencePolicy,

    // Observability (from ObservabilityEnvConfig)
    pub observability_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model = ModelEnvConfig::from_vars(&var).context("Failed to load model config")?;
        let observability = ObservabilityEnvConfig::from_vars(&var);

        Ok(Self {
            model_path: model.model_path,
            confidence: model.confidence,
            observability_enabled: observability.enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_composes_sub_configs() {
        let config = Config::from_vars(|key| match key {
            "MODEL_PATH" => Some("models/latest.json".to_string()),
            "CONFIDENCE_MODE" => Some("fixed".to_string()),
            "OBSERVABILITY_ENABLED" => Some("false".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.model_path, PathBuf::from("models/latest.json"));
        assert_eq!(config.confidence, ConfidencePolicy::deterministic());
        assert!(!config.observability_enabled);
    }

    #[test]
    fn test_config_error_carries_context() {
        let err = Config::from_vars(|key| {
            (key == "CONFIDENCE_MODE").then(|| "bogus".to_string())
        })
        .unwrap_err();
        assert!(format!("{:#}", err).contains("model config"));
    }
}
