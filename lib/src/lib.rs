//! # featurizers
//!
//! Streaming feature-engineering transforms with a strict split between
//! training and inference, exposed to foreign callers through a C ABI.
//!
//! ## Core Design Principles
//!
//! - **Estimator/Transformer Separation**: an [`Estimator`] accumulates
//!   statistics under an explicit state machine; the [`Transformer`] it
//!   produces holds only what inference needs.
//! - **Shared Annotations**: estimators in one chain publish results to an
//!   [`AnnotationStore`] so later stages can read them.
//! - **Portable State**: every transformer saves to a versioned
//!   little-endian [`archive`] and restores from it bit-for-bit.
//! - **Opaque Handles**: the [`ffi`] layer hands out generation-checked
//!   64-bit handles and reports failures as error objects, never panics.
//!
//! ## Quick Start
//!
//! ```rust
//! use featurizers::estimator::{train, Estimator};
//! use featurizers::featurizers::{RollingWindowAccumulator, RollingWindowConfig};
//! use featurizers::window::Aggregation;
//! use featurizers::Transformer;
//!
//! # fn main() -> featurizers::Result<()> {
//! let config = RollingWindowConfig {
//!     aggregation: Aggregation::Mean,
//!     horizon: 1,
//!     min_window_size: 1,
//!     max_window_size: 2,
//! };
//! let mut estimator = Estimator::standalone(RollingWindowAccumulator::new(config)?);
//! train(&mut estimator, &[(vec!["a".to_string()], 1.0)])?;
//!
//! let mut transformer = estimator.create_transformer()?;
//! let first = transformer.execute(&(vec!["a".to_string()], 1.0))?;
//! assert!(first[0].is_nan());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `error` - error kinds shared by the library and the ABI
//! - `archive` - binary save format
//! - `annotations` - cross-estimator result sharing
//! - `estimator` - training state machine and the `Accumulator` seam
//! - `transformer` - inference trait
//! - `pipeline` - chaining two featurizers
//! - `window` - grain-grouped windowing engine
//! - `featurizers` - concrete featurizers
//! - `config` - JSON featurizer configuration
//! - `ffi` - C ABI entry points and the handle table

pub mod annotations;

/// Versioned little-endian save format.
pub mod archive;

/// JSON configuration for the concrete featurizers.
pub mod config;

pub mod error;

/// Training protocol shared by every featurizer.
pub mod estimator;

pub mod featurizers;

/// C ABI surface.
pub mod ffi;

/// Chaining of two featurizers into one.
pub mod pipeline;

pub mod transformer;

/// Grain-grouped windowing engine.
pub mod window;

pub use annotations::AnnotationStore;
pub use config::FeaturizerConfig;
pub use error::{ErrorKind, FeaturizerError, Result};
pub use estimator::{train, Accumulator, Estimator, FitResult, TrainingState};
pub use transformer::Transformer;
