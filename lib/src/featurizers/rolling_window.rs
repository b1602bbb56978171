//! Rolling-window featurizer.
//!
//! Training is a structural pass only: each `(grain, value)` record is checked
//! for a non-empty grain and the estimator completes on the first valid
//! batch. The transformer is a [`WindowTransformer`].
//!
//! # Example
//! ```ignore
//! use featurizers::featurizers::rolling_window::{RollingWindowAccumulator, RollingWindowConfig};
//! use featurizers::estimator::Estimator;
//!
//! let config = RollingWindowConfig { horizon: 3, min_window_size: 1, max_window_size: 2, ..Default::default() };
//! let mut estimator = Estimator::standalone(RollingWindowAccumulator::new(config)?);
//! estimator.complete_training()?;
//! let mut transformer = estimator.create_transformer()?;
//! ```

use crate::error::{FeaturizerError, Result};
use crate::estimator::{Accumulator, Estimator, EstimatorContext, FitResult};
use crate::window::{Aggregation, GrainedValue, WindowSpec, WindowTransformer};
use serde::{Deserialize, Serialize};

/// Configuration for a rolling-window featurizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingWindowConfig {
    pub aggregation: Aggregation,
    pub horizon: u32,
    pub min_window_size: u32,
    pub max_window_size: u32,
}

impl Default for RollingWindowConfig {
    fn default() -> Self {
        Self {
            aggregation: Aggregation::Mean,
            horizon: 1,
            min_window_size: 1,
            max_window_size: 1,
        }
    }
}

impl RollingWindowConfig {
    pub fn spec(&self) -> Result<WindowSpec> {
        WindowSpec::new(self.horizon, self.min_window_size, self.max_window_size)
    }

    pub fn validate(&self) -> Result<()> {
        self.spec().map(|_| ())
    }
}

/// Accumulator that validates grains and builds a [`WindowTransformer`].
#[derive(Debug, Clone)]
pub struct RollingWindowAccumulator {
    aggregation: Aggregation,
    spec: WindowSpec,
}

impl RollingWindowAccumulator {
    pub fn new(config: RollingWindowConfig) -> Result<Self> {
        Ok(Self {
            aggregation: config.aggregation,
            spec: config.spec()?,
        })
    }
}

impl Accumulator for RollingWindowAccumulator {
    type Input = GrainedValue;
    type Transformer = WindowTransformer;
    const NAME: &'static str = "RollingWindowEstimator";

    fn fit(&mut self, inputs: &[GrainedValue], _ctx: &EstimatorContext) -> Result<FitResult> {
        if let Some(position) = inputs.iter().position(|(grain, _)| grain.is_empty()) {
            return Err(FeaturizerError::invalid_argument(format!(
                "record {} has an empty grain",
                position
            )));
        }
        Ok(FitResult::Complete)
    }

    fn create_transformer(&mut self, _ctx: &EstimatorContext) -> Result<WindowTransformer> {
        Ok(WindowTransformer::new(self.aggregation, self.spec))
    }
}

pub type RollingWindowEstimator = Estimator<RollingWindowAccumulator>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{train, TrainingState};
    use crate::transformer::Transformer;

    fn config(horizon: u32, min: u32, max: u32) -> RollingWindowConfig {
        RollingWindowConfig {
            aggregation: Aggregation::Mean,
            horizon,
            min_window_size: min,
            max_window_size: max,
        }
    }

    fn grain(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            RollingWindowAccumulator::new(config(1, 2, 1)),
            Err(FeaturizerError::InvalidArgument(_))
        ));
        assert!(config(0, 1, 1).validate().is_err());
    }

    #[test]
    fn test_fit_completes_on_valid_record() {
        let mut estimator = Estimator::standalone(RollingWindowAccumulator::new(config(3, 1, 2)).unwrap());
        let result = estimator.fit(&(grain("one"), 1.0)).unwrap();
        assert_eq!(result, FitResult::Complete);
        assert_eq!(estimator.state(), TrainingState::Finished);
    }

    #[test]
    fn test_fit_rejects_empty_grain() {
        let mut estimator = Estimator::standalone(RollingWindowAccumulator::new(config(1, 1, 1)).unwrap());
        let records = vec![(grain("a"), 1.0), (Vec::new(), 2.0)];
        assert!(matches!(
            estimator.fit_buffer(&records),
            Err(FeaturizerError::InvalidArgument(_))
        ));
        assert_eq!(estimator.state(), TrainingState::Training);
    }

    #[test]
    fn test_complete_without_records() {
        let mut estimator = Estimator::standalone(RollingWindowAccumulator::new(config(1, 1, 1)).unwrap());
        estimator.begin_training().unwrap();
        estimator.complete_training().unwrap();
        assert!(estimator.create_transformer().is_ok());
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut estimator = Estimator::standalone(RollingWindowAccumulator::new(config(3, 1, 2)).unwrap());
        let records: Vec<GrainedValue> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|v| (grain("one"), *v))
            .collect();
        train(&mut estimator, &records).unwrap();

        let mut transformer = estimator.create_transformer().unwrap();
        let rows: Vec<Vec<f64>> = records
            .iter()
            .map(|r| transformer.execute(r).unwrap())
            .collect();
        assert!(rows[0].iter().all(|v| v.is_nan()));
        assert!(rows[1][0].is_nan() && rows[1][1].is_nan());
        assert!((rows[1][2] - 1.0).abs() < 1e-12);
        assert!(rows[2][0].is_nan());
        assert!((rows[2][1] - 1.0).abs() < 1e-12);
        assert!((rows[2][2] - 1.5).abs() < 1e-12);
        assert_eq!(rows[3], vec![1.0, 1.5, 2.5]);
    }

    #[test]
    fn test_config_from_json() {
        let config: RollingWindowConfig =
            serde_json::from_str(r#"{"aggregation":"max","horizon":2,"max_window_size":4}"#).unwrap();
        assert_eq!(config.aggregation, Aggregation::Max);
        assert_eq!(config.horizon, 2);
        assert_eq!(config.min_window_size, 1);
        assert_eq!(config.max_window_size, 4);
    }
}
