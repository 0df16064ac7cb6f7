//! Model artifact and confidence configuration parsing from environment variables.

use crate::domain::valuation::{
    CONFIDENCE_MAX, CONFIDENCE_MIDPOINT, CONFIDENCE_MIN, ConfidencePolicy,
};
use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "data/model/car_price_model.json";

/// Model environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEnvConfig {
    pub model_path: PathBuf,
    pub confidence: ConfidencePolicy,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            confidence: ConfidencePolicy::Sampled,
        }
    }
}

impl ModelEnvConfig {
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

        let mode = var("CONFIDENCE_MODE").unwrap_or_else(|| "sampled".to_string());
        let confidence = match mode.to_lowercase().as_str() {
            "sampled" => ConfidencePolicy::Sampled,
            "fixed" => {
                let value = match var("CONFIDENCE_FIXED_VALUE") {
                    Some(raw) => raw
                        .parse::<f64>()
                        .context("Failed to parse CONFIDENCE_FIXED_VALUE")?,
                    None => CONFIDENCE_MIDPOINT,
                };
                if !(CONFIDENCE_MIN..=CONFIDENCE_MAX).contains(&value) {
                    anyhow::bail!(
                        "CONFIDENCE_FIXED_VALUE {} outside [{}, {}]",
                        value,
                        CONFIDENCE_MIN,
                        CONFIDENCE_MAX
                    );
                }
                ConfidencePolicy::Fixed(value)
            }
            other => anyhow::bail!(
                "Invalid CONFIDENCE_MODE: {}. Must be 'sampled' or 'fixed'",
                other
            ),
        };

        Ok(Self {
            model_path,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_model_config_defaults() {
        let config = ModelEnvConfig::from_vars(lookup(&[])).unwrap();
        assert_eq!(config, ModelEnvConfig::default());
    }

    #[test]
    fn test_fixed_confidence_defaults_to_midpoint() {
        let config = ModelEnvConfig::from_vars(lookup(&[
            ("CONFIDENCE_MODE", "FIXED"),
            ("MODEL_PATH", "/srv/models/rf.json"),
        ]))
        .unwrap();
        assert_eq!(config.confidence, ConfidencePolicy::Fixed(0.915));
        assert_eq!(config.model_path, PathBuf::from("/srv/models/rf.json"));
    }

    #[test]
    fn test_fixed_confidence_must_be_in_range() {
        let result = ModelEnvConfig::from_vars(lookup(&[
            ("CONFIDENCE_MODE", "fixed"),
            ("CONFIDENCE_FIXED_VALUE", "0.99"),
        ]));
        assert!(result.is_err());

        let config = ModelEnvConfig::from_vars(lookup(&[
            ("CONFIDENCE_MODE", "fixed"),
            ("CONFIDENCE_FIXED_VALUE", "0.9"),
        ]))
        .unwrap();
        assert_eq!(config.confidence, ConfidencePolicy::Fixed(0.9));
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert!(ModelEnvConfig::from_vars(lookup(&[("CONFIDENCE_MODE", "model")])).is_err());
    }
}
