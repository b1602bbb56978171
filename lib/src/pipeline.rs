//! Two-stage estimator chaining.
//!
//! [`PipelineAccumulator`] trains a first stage on the raw records, then trains
//! the second stage on the first stage's transformed output. Both stages share
//! the pipeline's [`AnnotationStore`](crate::annotations::AnnotationStore):
//! the first sits at the pipeline position `p`, the second at `p + 1`, so the
//! second can read whatever the first published.
//!
//! When the first stage completes in the middle of a pass, the pipeline answers
//! `ResetAndContinue` so the caller replays the data for the second stage.
//! Chains longer than two are built by nesting.
//!
//! # Example
//! ```ignore
//! use featurizers::estimator::{train, Estimator};
//! use featurizers::pipeline::PipelineAccumulator;
//!
//! let pipeline = PipelineAccumulator::new(MaxAbsValueAccumulator::new(None), NormalizeStageAccumulator);
//! let mut estimator = Estimator::standalone(pipeline);
//! train(&mut estimator, &rows)?;
//! let mut transformer = estimator.create_transformer()?;
//! ```

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::error::{FeaturizerError, Result};
use crate::estimator::{Accumulator, Estimator, EstimatorContext, FitResult, TrainingState};
use crate::transformer::Transformer;

/// Output type of an accumulator's transformer.
type StageOutput<A> = <<A as Accumulator>::Transformer as Transformer>::Output;

/// Accumulator that chains two stages.
#[derive(Debug)]
pub struct PipelineAccumulator<A, B>
where
    A: Accumulator,
    B: Accumulator<Input = StageOutput<A>>,
{
    first: Estimator<A>,
    first_transformer: Option<A::Transformer>,
    second: Estimator<B>,
}

impl<A, B> PipelineAccumulator<A, B>
where
    A: Accumulator,
    B: Accumulator<Input = StageOutput<A>>,
{
    pub fn new(first: A, second: B) -> Self {
        Self {
            first: Estimator::standalone(first),
            first_transformer: None,
            second: Estimator::standalone(second),
        }
    }

    pub fn first(&self) -> &Estimator<A> {
        &self.first
    }

    pub fn second(&self) -> &Estimator<B> {
        &self.second
    }

    /// Completes the first stage and starts the second.
    fn finish_first(&mut self) -> Result<()> {
        if self.first_transformer.is_some() {
            return Ok(());
        }
        self.first.complete_training()?;
        self.first_transformer = Some(self.first.create_transformer()?);
        if self.second.state() == TrainingState::Pending {
            self.second.begin_training()?;
        }
        Ok(())
    }

    fn transform_through_first(&mut self, inputs: &[A::Input]) -> Result<Vec<B::Input>> {
        let transformer = self.first_transformer.as_mut().ok_or_else(|| {
            FeaturizerError::invalid_state("first pipeline stage has no transformer")
        })?;
        inputs
            .iter()
            .map(|input| transformer.execute(input))
            .collect()
    }
}

impl<A, B> Accumulator for PipelineAccumulator<A, B>
where
    A: Accumulator,
    B: Accumulator<Input = StageOutput<A>>,
{
    type Input = A::Input;
    type Transformer = PipelineTransformer<A::Transformer, B::Transformer>;
    const NAME: &'static str = "PipelineEstimator";

    fn begin_training(&mut self, ctx: &EstimatorContext) -> Result<bool> {
        self.first.attach(ctx.clone())?;
        self.second.attach(ctx.next())?;

        self.first.begin_training()?;
        if self.first.is_training_complete() {
            self.finish_first()?;
        }
        Ok(self.first.state() == TrainingState::Training
            || self.second.state() == TrainingState::Training)
    }

    fn fit(&mut self, inputs: &[A::Input], _ctx: &EstimatorContext) -> Result<FitResult> {
        if self.first.state() == TrainingState::Training {
            return match self.first.fit_buffer(inputs)? {
                FitResult::Complete => {
                    self.finish_first()?;
                    if self.second.is_training_complete() {
                        Ok(FitResult::Complete)
                    } else {
                        Ok(FitResult::ResetAndContinue)
                    }
                }
                other => Ok(other),
            };
        }

        let transformed = self.transform_through_first(inputs)?;
        self.second.fit_buffer(&transformed)
    }

    fn on_data_completed(&mut self, _ctx: &EstimatorContext) -> Result<bool> {
        if self.first.state() == TrainingState::Training {
            self.first.on_data_completed()?;
            if self.first.is_training_complete() {
                self.finish_first()?;
            }
        } else if self.second.state() == TrainingState::Training {
            self.second.on_data_completed()?;
        }
        Ok(self.second.state() == TrainingState::Finished)
    }

    fn complete_training(&mut self, _ctx: &EstimatorContext) -> Result<()> {
        self.finish_first()?;
        if !self.second.is_completed() {
            self.second.complete_training()?;
        }
        Ok(())
    }

    fn create_transformer(&mut self, _ctx: &EstimatorContext) -> Result<Self::Transformer> {
        let first = self.first_transformer.take().ok_or_else(|| {
            FeaturizerError::invalid_state("first pipeline stage has no transformer")
        })?;
        let second = self.second.create_transformer()?;
        Ok(PipelineTransformer::new(first, second))
    }
}

/// Transformer that runs two transformers back to back.
#[derive(Debug, Clone)]
pub struct PipelineTransformer<TA, TB> {
    first: TA,
    second: TB,
}

impl<TA, TB> PipelineTransformer<TA, TB>
where
    TA: Transformer,
    TB: Transformer<Input = TA::Output>,
{
    pub fn new(first: TA, second: TB) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &TA {
        &self.first
    }

    pub fn second(&self) -> &TB {
        &self.second
    }
}

impl<TA, TB> Transformer for PipelineTransformer<TA, TB>
where
    TA: Transformer,
    TB: Transformer<Input = TA::Output>,
{
    type Input = TA::Input;
    type Output = TB::Output;

    fn execute(&mut self, input: &TA::Input) -> Result<TB::Output> {
        let intermediate = self.first.execute(input)?;
        self.second.execute(&intermediate)
    }

    fn flush(&mut self) -> Result<Vec<TB::Output>> {
        let mut outputs = Vec::new();
        for intermediate in self.first.flush()? {
            outputs.push(self.second.execute(&intermediate)?);
        }
        outputs.extend(self.second.flush()?);
        Ok(outputs)
    }

    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        self.first.save(ar)?;
        self.second.save(ar)
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        let first = TA::load(ar)?;
        let second = TB::load(ar)?;
        Ok(Self { first, second })
    }
}
