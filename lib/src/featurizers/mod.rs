//! Concrete featurizers built on the shared training protocol.
//!
//! Each featurizer is an [`Accumulator`](crate::estimator::Accumulator) that
//! plugs into [`Estimator`](crate::estimator::Estimator), plus the
//! [`Transformer`](crate::transformer::Transformer) it produces.
//!
//! # Available Featurizers
//!
//! - [`rolling_window`]: grain-grouped, horizon-delayed window aggregates
//! - [`max_normalize`]: scale by the largest absolute training value
//! - [`numericalize`]: map values to their sorted index
//! - [`stringify`]: canonical string form; needs no training
//!
//! # Example
//!
//! ```ignore
//! use featurizers::featurizers::{NumericalizeAccumulator, NumericalizeConfig};
//! use featurizers::estimator::{train, Estimator};
//!
//! let mut estimator = Estimator::standalone(NumericalizeAccumulator::<String>::new(NumericalizeConfig::default())?);
//! train(&mut estimator, &labels)?;
//! let mut transformer = estimator.create_transformer()?;
//! ```

pub mod max_normalize;
pub mod numericalize;
pub mod rolling_window;
pub mod stringify;

pub use max_normalize::{
    max_normalize_accumulator, max_normalize_estimator, max_normalize_estimator_in, MaxNormalizeAccumulator,
    MaxNormalizeConfig, MaxNormalizeEstimator, MaxNormalizeTransformer,
};
pub use numericalize::{
    NumericalizeAccumulator, NumericalizeConfig, NumericalizeEstimator, NumericalizeTransformer,
};
pub use rolling_window::{RollingWindowAccumulator, RollingWindowConfig, RollingWindowEstimator};
pub use stringify::{StringAccumulator, StringConfig, StringEstimator, StringTransformer, StringifyValue};
