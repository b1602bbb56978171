//! Numericalize featurizer.
//!
//! Learns the distinct values seen in training and maps each one to its index
//! in sorted order. Values never seen in training map to `None`.

use crate::archive::{Archivable, ArchiveReader, ArchiveWriter};
use crate::error::{FeaturizerError, Result};
use crate::estimator::{Accumulator, Estimator, EstimatorContext, FitResult};
use crate::transformer::Transformer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Configuration for the numericalize featurizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericalizeConfig {
    /// Stop training after this many records.
    pub max_training_items: Option<usize>,
}

impl NumericalizeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_training_items == Some(0) {
            return Err(FeaturizerError::invalid_argument(
                "max_training_items must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Value types that can be numericalized.
pub trait Label: Ord + Clone + Archivable {}

impl<T: Ord + Clone + Archivable> Label for T {}

/// Collects the distinct training values.
#[derive(Debug, Clone)]
pub struct NumericalizeAccumulator<T: Label> {
    values: BTreeSet<T>,
    seen: usize,
    max_training_items: Option<usize>,
}

impl<T: Label> NumericalizeAccumulator<T> {
    pub fn new(config: NumericalizeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            values: BTreeSet::new(),
            seen: 0,
            max_training_items: config.max_training_items,
        })
    }

    pub fn distinct(&self) -> usize {
        self.values.len()
    }
}

impl<T: Label> Accumulator for NumericalizeAccumulator<T> {
    type Input = T;
    type Transformer = NumericalizeTransformer<T>;
    const NAME: &'static str = "NumericalizeEstimator";

    fn fit(&mut self, inputs: &[T], _ctx: &EstimatorContext) -> Result<FitResult> {
        for value in inputs {
            self.values.insert(value.clone());
            self.seen += 1;
            if Some(self.seen) == self.max_training_items {
                return Ok(FitResult::Complete);
            }
        }
        Ok(FitResult::Continue)
    }

    fn create_transformer(&mut self, _ctx: &EstimatorContext) -> Result<NumericalizeTransformer<T>> {
        NumericalizeTransformer::from_sorted(std::mem::take(&mut self.values).into_iter().collect())
    }
}

pub type NumericalizeEstimator<T> = Estimator<NumericalizeAccumulator<T>>;

/// Maps known values to their sorted index.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericalizeTransformer<T: Label> {
    labels: BTreeMap<T, u32>,
}

impl<T: Label> NumericalizeTransformer<T> {
    /// Builds the label map from strictly increasing values.
    pub fn from_sorted(values: Vec<T>) -> Result<Self> {
        if values.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(FeaturizerError::invalid_argument(
                "labels must be strictly increasing",
            ));
        }
        let mut labels = BTreeMap::new();
        for (index, value) in values.into_iter().enumerate() {
            let index = u32::try_from(index).map_err(|_| {
                FeaturizerError::invalid_state("too many distinct values to numericalize")
            })?;
            labels.insert(value, index);
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<T: Label> Transformer for NumericalizeTransformer<T> {
    type Input = T;
    type Output = Option<u32>;

    fn execute(&mut self, input: &T) -> Result<Option<u32>> {
        Ok(self.labels.get(input).copied())
    }

    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        // Indexes are implied by order.
        ar.write_len(self.labels.len())?;
        for value in self.labels.keys() {
            value.save(ar)?;
        }
        Ok(())
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        let values = Vec::<T>::load(ar)?;
        Self::from_sorted(values).map_err(|e| FeaturizerError::decode(e.to_string()))
    }
}
