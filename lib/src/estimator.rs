//! Training protocol shared by every featurizer.
//!
//! An [`Estimator`] wraps an algorithm-specific [`Accumulator`] and owns the
//! training state machine:
//!
//! ```text
//! Pending --begin_training--> Training --fit returns Complete--------> Finished
//!    |                           |------on_data_completed finishes--->    ^
//!    |                           +------complete_training------------>    |
//!    +--accumulator needs no data--------------------------------------->-+
//! ```
//!
//! The state only ever moves forward. Once `complete_training` has run, the
//! estimator can hand out exactly one transformer.
//!
//! # Example
//! ```ignore
//! use featurizers::estimator::{train, Estimator};
//!
//! let mut estimator = Estimator::standalone(NumericalizeAccumulator::<String>::new(config)?);
//! train(&mut estimator, &records)?;
//! let mut transformer = estimator.create_transformer()?;
//! ```

use crate::annotations::AnnotationStore;
use crate::error::{FeaturizerError, Result};
use crate::transformer::Transformer;
use std::any::Any;

/// Upper bound on passes made by [`train`] before giving up.
pub const MAX_TRAINING_PASSES: usize = 1024;

/// Training state of an estimator. Ordered `Pending < Training < Finished`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrainingState {
    Pending = 1,
    Training = 2,
    Finished = 3,
}

/// Signal returned by every `fit` call.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitResult {
    /// No more data is needed.
    Complete = 1,
    /// Supply the next record.
    Continue = 2,
    /// Start again from the first record; fitted state is kept.
    ResetAndContinue = 3,
}

/// Where an estimator sits in its pipeline, and the store it shares.
#[derive(Debug, Clone, Default)]
pub struct EstimatorContext {
    annotations: AnnotationStore,
    position: usize,
}

impl EstimatorContext {
    pub fn new(annotations: AnnotationStore, position: usize) -> Self {
        Self {
            annotations,
            position,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    /// Context for the stage immediately downstream.
    pub fn next(&self) -> Self {
        Self {
            annotations: self.annotations.clone(),
            position: self.position + 1,
        }
    }

    pub fn publish<T: Any>(&self, estimator_name: &'static str, value: T) {
        self.annotations.publish(self.position, estimator_name, value);
    }

    pub fn read<T: Any + Clone>(&self) -> Option<T> {
        self.annotations.read(self.position)
    }
}

/// Algorithm-specific half of an estimator.
///
/// Implementors only see calls that the state machine has already validated:
/// `fit` is never called outside `Training` and never with an empty slice.
pub trait Accumulator {
    type Input;
    type Transformer: Transformer<Input = Self::Input>;

    /// Name used in logs, error messages and annotations.
    const NAME: &'static str;

    /// Returns `false` when no data is needed; the estimator then goes
    /// straight to `Finished`.
    fn begin_training(&mut self, _ctx: &EstimatorContext) -> Result<bool> {
        Ok(true)
    }

    fn fit(&mut self, inputs: &[Self::Input], ctx: &EstimatorContext) -> Result<FitResult>;

    /// End of one pass. Returns `true` when training is done.
    fn on_data_completed(&mut self, _ctx: &EstimatorContext) -> Result<bool> {
        Ok(true)
    }

    /// Finalizes accumulated statistics. Called exactly once.
    fn complete_training(&mut self, _ctx: &EstimatorContext) -> Result<()> {
        Ok(())
    }

    /// Builds the transformer. Called at most once, after `complete_training`.
    fn create_transformer(&mut self, ctx: &EstimatorContext) -> Result<Self::Transformer>;
}

/// Training state machine around an [`Accumulator`].
#[derive(Debug)]
pub struct Estimator<A: Accumulator> {
    accumulator: A,
    context: EstimatorContext,
    state: TrainingState,
    completed: bool,
    transformer_created: bool,
}

impl<A: Accumulator> Estimator<A> {
    /// Creates an estimator at `position` of a pipeline sharing `annotations`.
    pub fn new(accumulator: A, annotations: AnnotationStore, position: usize) -> Self {
        Self::with_context(accumulator, EstimatorContext::new(annotations, position))
    }

    /// Creates an estimator with its own private annotation store.
    pub fn standalone(accumulator: A) -> Self {
        Self::with_context(accumulator, EstimatorContext::default())
    }

    pub fn with_context(accumulator: A, context: EstimatorContext) -> Self {
        Self {
            accumulator,
            context,
            state: TrainingState::Pending,
            completed: false,
            transformer_created: false,
        }
    }

    pub fn name(&self) -> &'static str {
        A::NAME
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// `true` unless the estimator is currently `Training`.
    pub fn is_training_complete(&self) -> bool {
        self.state != TrainingState::Training
    }

    pub fn context(&self) -> &EstimatorContext {
        &self.context
    }

    pub fn accumulator(&self) -> &A {
        &self.accumulator
    }

    /// Moves an estimator that has not started training into `context`.
    pub(crate) fn attach(&mut self, context: EstimatorContext) -> Result<()> {
        if self.state != TrainingState::Pending {
            return Err(FeaturizerError::invalid_state(format!(
                "{}: cannot change pipeline position once training has begun",
                A::NAME
            )));
        }
        self.context = context;
        Ok(())
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed
    }

    /// Leaves `Pending`. Fails if training has already begun.
    pub fn begin_training(&mut self) -> Result<()> {
        if self.state != TrainingState::Pending {
            return Err(FeaturizerError::invalid_state(format!(
                "{}: begin_training requires the Pending state (current {:?})",
                A::NAME,
                self.state
            )));
        }
        let needs_data = self.accumulator.begin_training(&self.context)?;
        self.advance(if needs_data {
            TrainingState::Training
        } else {
            TrainingState::Finished
        });
        Ok(())
    }

    fn ensure_begun(&mut self) -> Result<()> {
        if self.state == TrainingState::Pending {
            self.begin_training()?;
        }
        Ok(())
    }

    /// Feeds a single record.
    pub fn fit(&mut self, input: &A::Input) -> Result<FitResult> {
        self.fit_buffer(std::slice::from_ref(input))
    }

    /// Feeds a batch of records.
    pub fn fit_buffer(&mut self, inputs: &[A::Input]) -> Result<FitResult> {
        if inputs.is_empty() {
            return Err(FeaturizerError::invalid_argument(format!(
                "{}: fit buffer is empty",
                A::NAME
            )));
        }
        self.ensure_begun()?;
        if self.state != TrainingState::Training {
            return Err(FeaturizerError::invalid_state(format!(
                "{}: fit called after training finished",
                A::NAME
            )));
        }

        let result = self.accumulator.fit(inputs, &self.context)?;
        if result == FitResult::Complete {
            self.advance(TrainingState::Finished);
        }
        Ok(result)
    }

    /// Signals the end of one pass over the training data.
    pub fn on_data_completed(&mut self) -> Result<()> {
        self.ensure_begun()?;
        if self.state == TrainingState::Training
            && self.accumulator.on_data_completed(&self.context)?
        {
            self.advance(TrainingState::Finished);
        }
        Ok(())
    }

    /// Forces `Finished` and finalizes the accumulator. Idempotent.
    pub fn complete_training(&mut self) -> Result<()> {
        if self.completed {
            return Ok(());
        }
        self.ensure_begun()?;
        self.accumulator.complete_training(&self.context)?;
        self.advance(TrainingState::Finished);
        self.completed = true;
        Ok(())
    }

    /// Produces the single transformer this estimator can create.
    pub fn create_transformer(&mut self) -> Result<A::Transformer> {
        if !self.completed {
            return Err(FeaturizerError::invalid_state(format!(
                "{}: complete_training must be called before creating a transformer",
                A::NAME
            )));
        }
        if self.transformer_created {
            return Err(FeaturizerError::invalid_state(format!(
                "{}: a transformer has already been created",
                A::NAME
            )));
        }
        let transformer = self.accumulator.create_transformer(&self.context)?;
        self.transformer_created = true;
        tracing::debug!(estimator = A::NAME, "created transformer");
        Ok(transformer)
    }

    fn advance(&mut self, next: TrainingState) {
        if next > self.state {
            tracing::debug!(
                estimator = A::NAME,
                from = ?self.state,
                to = ?next,
                "training state transition"
            );
            self.state = next;
        }
    }
}

/// Drives an estimator over `records` until it reports completion.
///
/// `ResetAndContinue` restarts iteration from the first record. Every full
/// pass ends with `on_data_completed`; another pass is made while the
/// estimator is still training. Returns the number of passes made.
pub fn train<A: Accumulator>(estimator: &mut Estimator<A>, records: &[A::Input]) -> Result<usize> {
    estimator.ensure_begun()?;

    let mut passes = 0;
    'passes: while !estimator.is_training_complete() {
        passes += 1;
        if passes > MAX_TRAINING_PASSES {
            return Err(FeaturizerError::invalid_state(format!(
                "{}: training did not finish after {} passes",
                A::NAME,
                MAX_TRAINING_PASSES
            )));
        }

        for record in records {
            match estimator.fit(record)? {
                FitResult::Continue => {}
                FitResult::Complete => break 'passes,
                FitResult::ResetAndContinue => continue 'passes,
            }
        }
        estimator.on_data_completed()?;
    }

    estimator.complete_training()?;
    tracing::debug!(estimator = A::NAME, passes, "training complete");
    Ok(passes)
}
