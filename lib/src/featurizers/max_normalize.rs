//! Max-normalize featurizer.
//!
//! Two chained stages: [`MaxAbsValueAccumulator`] scans every element of every
//! training row and publishes the largest absolute value as a
//! [`MaxAbsValueAnnotation`]; [`NormalizeStageAccumulator`] reads that
//! annotation and builds a [`NormalizeTransformer`] that divides each element
//! by it. `NaN` elements are ignored in training and pass through unchanged.
//!
//! # Example
//! ```ignore
//! use featurizers::featurizers::max_normalize::{max_normalize_estimator, MaxNormalizeConfig};
//! use featurizers::estimator::train;
//!
//! let mut estimator = max_normalize_estimator(MaxNormalizeConfig::default())?;
//! train(&mut estimator, &[vec![7.9, 4.37, 6.0, 10.0]])?;
//! let mut transformer = estimator.create_transformer()?;
//! let scaled = transformer.execute(&vec![7.9, 4.37, 6.0, 10.0])?; // [0.79, 0.437, 0.6, 1.0]
//! ```

use crate::annotations::AnnotationStore;
use crate::archive::{Archivable, ArchiveReader, ArchiveWriter};
use crate::error::{FeaturizerError, Result};
use crate::estimator::{Accumulator, Estimator, EstimatorContext, FitResult};
use crate::pipeline::{PipelineAccumulator, PipelineTransformer};
use crate::transformer::{PassThroughTransformer, Transformer};
use serde::{Deserialize, Serialize};

/// A row of values; `NaN` marks a null element.
pub type Row = Vec<f64>;

/// Configuration for the max-normalize featurizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxNormalizeConfig {
    /// Stop training after this many rows.
    pub max_training_items: Option<usize>,
}

impl MaxNormalizeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_training_items == Some(0) {
            return Err(FeaturizerError::invalid_argument(
                "max_training_items must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Largest absolute value seen while training.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxAbsValueAnnotation(pub f64);

/// First stage: tracks the largest absolute element.
#[derive(Debug, Clone, Default)]
pub struct MaxAbsValueAccumulator {
    max_abs: Option<f64>,
    rows: usize,
    max_training_items: Option<usize>,
}

impl MaxAbsValueAccumulator {
    pub fn new(max_training_items: Option<usize>) -> Self {
        Self {
            max_abs: None,
            rows: 0,
            max_training_items,
        }
    }

    pub fn max_abs(&self) -> Option<f64> {
        self.max_abs
    }
}

impl Accumulator for MaxAbsValueAccumulator {
    type Input = Row;
    type Transformer = PassThroughTransformer<Row>;
    const NAME: &'static str = "MaxAbsValueEstimator";

    fn fit(&mut self, inputs: &[Row], _ctx: &EstimatorContext) -> Result<FitResult> {
        for row in inputs {
            for value in row.iter().filter(|v| !v.is_nan()) {
                let abs = value.abs();
                self.max_abs = Some(self.max_abs.map_or(abs, |current| current.max(abs)));
            }
            self.rows += 1;
            if Some(self.rows) == self.max_training_items {
                return Ok(FitResult::Complete);
            }
        }
        Ok(FitResult::Continue)
    }

    fn complete_training(&mut self, ctx: &EstimatorContext) -> Result<()> {
        let max_abs = self.max_abs.ok_or_else(|| {
            FeaturizerError::invalid_state(
                "max-normalize needs at least one non-null training value",
            )
        })?;
        ctx.publish(Self::NAME, MaxAbsValueAnnotation(max_abs));
        Ok(())
    }

    fn create_transformer(&mut self, _ctx: &EstimatorContext) -> Result<Self::Transformer> {
        Ok(PassThroughTransformer::new())
    }
}

/// Second stage: reads the published maximum; needs no data of its own.
#[derive(Debug, Clone, Default)]
pub struct NormalizeStageAccumulator {
    max_abs: Option<f64>,
}

impl Accumulator for NormalizeStageAccumulator {
    type Input = Row;
    type Transformer = NormalizeTransformer;
    const NAME: &'static str = "NormalizeEstimator";

    fn begin_training(&mut self, ctx: &EstimatorContext) -> Result<bool> {
        let MaxAbsValueAnnotation(max_abs) = ctx.read::<MaxAbsValueAnnotation>().ok_or_else(|| {
            FeaturizerError::invalid_state("no MaxAbsValueAnnotation has been published upstream")
        })?;
        self.max_abs = Some(max_abs);
        Ok(false)
    }

    fn fit(&mut self, _inputs: &[Row], _ctx: &EstimatorContext) -> Result<FitResult> {
        Err(FeaturizerError::invalid_state(
            "normalize stage does not accept training data",
        ))
    }

    fn create_transformer(&mut self, _ctx: &EstimatorContext) -> Result<NormalizeTransformer> {
        let max_abs = self
            .max_abs
            .ok_or_else(|| FeaturizerError::invalid_state("normalize stage has not started"))?;
        Ok(NormalizeTransformer::new(max_abs))
    }
}

/// Divides every element of a row by a fixed maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeTransformer {
    max_abs: f64,
}

impl NormalizeTransformer {
    pub fn new(max_abs: f64) -> Self {
        Self { max_abs }
    }

    pub fn max_abs(&self) -> f64 {
        self.max_abs
    }

    fn divisor(&self) -> f64 {
        if self.max_abs == 0.0 {
            1.0
        } else {
            self.max_abs
        }
    }
}

impl Transformer for NormalizeTransformer {
    type Input = Row;
    type Output = Row;

    fn execute(&mut self, input: &Row) -> Result<Row> {
        let divisor = self.divisor();
        Ok(input.iter().map(|v| v / divisor).collect())
    }

    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        self.max_abs.save(ar)
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        let max_abs = f64::load(ar)?;
        // `inf` is a reachable trained maximum.
        if max_abs.is_nan() || max_abs < 0.0 {
            return Err(FeaturizerError::decode(format!(
                "invalid stored maximum {}",
                max_abs
            )));
        }
        Ok(Self { max_abs })
    }
}

pub type MaxNormalizeAccumulator = PipelineAccumulator<MaxAbsValueAccumulator, NormalizeStageAccumulator>;
pub type MaxNormalizeEstimator = Estimator<MaxNormalizeAccumulator>;
pub type MaxNormalizeTransformer = PipelineTransformer<PassThroughTransformer<Row>, NormalizeTransformer>;

/// Both stages of a max-normalize pipeline.
pub fn max_normalize_accumulator(config: MaxNormalizeConfig) -> Result<MaxNormalizeAccumulator> {
    config.validate()?;
    Ok(PipelineAccumulator::new(
        MaxAbsValueAccumulator::new(config.max_training_items),
        NormalizeStageAccumulator::default(),
    ))
}

/// Standalone max-normalize estimator with its own annotation store.
pub fn max_normalize_estimator(config: MaxNormalizeConfig) -> Result<MaxNormalizeEstimator> {
    max_normalize_estimator_in(config, AnnotationStore::new(), 0)
}

/// Max-normalize estimator placed at `position` of a shared pipeline.
pub fn max_normalize_estimator_in(
    config: MaxNormalizeConfig,
    annotations: AnnotationStore,
    position: usize,
) -> Result<MaxNormalizeEstimator> {
    Ok(Estimator::new(max_normalize_accumulator(config)?, annotations, position))
}
