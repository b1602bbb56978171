//! Serializable featurizer configuration.
//!
//! A [`FeaturizerConfig`] names the featurizer and carries its parameters, so
//! pipelines and benchmark scenarios can be described in JSON:
//!
//! ```json
//! {"featurizer": "rolling_window", "aggregation": "mean", "horizon": 3, "max_window_size": 2}
//! ```

use crate::error::{FeaturizerError, Result};
use crate::featurizers::{MaxNormalizeConfig, NumericalizeConfig, RollingWindowConfig, StringConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "featurizer", rename_all = "snake_case")]
pub enum FeaturizerConfig {
    RollingWindow(RollingWindowConfig),
    MaxNormalize(MaxNormalizeConfig),
    Numericalize(NumericalizeConfig),
    Stringify(StringConfig),
}

impl FeaturizerConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FeaturizerError::invalid_argument(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| FeaturizerError::invalid_argument(format!("cannot encode config: {}", e)))
    }

    /// Checks parameters that do not depend on the value type.
    ///
    /// `empty_string_for_nulls` is checked when the stringify estimator is
    /// created for a concrete type.
    pub fn validate(&self) -> Result<()> {
        match self {
            FeaturizerConfig::RollingWindow(config) => config.validate(),
            FeaturizerConfig::MaxNormalize(config) => config.validate(),
            FeaturizerConfig::Numericalize(config) => config.validate(),
            FeaturizerConfig::Stringify(_) => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeaturizerConfig::RollingWindow(_) => "rolling_window",
            FeaturizerConfig::MaxNormalize(_) => "max_normalize",
            FeaturizerConfig::Numericalize(_) => "numericalize",
            FeaturizerConfig::Stringify(_) => "stringify",
        }
    }
}
