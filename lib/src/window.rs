//! Grain-grouped, horizon-delayed windowing engine.
//!
//! Every grain (an ordered tuple of strings) owns an independent history of
//! the values observed for it, bounded to the most recent `horizon +
//! max_window_size` entries. Each call to [`WindowTransformer::execute`]
//! records the value and immediately emits one row of `horizon` columns.
//!
//! Column `H - k` (for `k` in `1..=H`) aggregates the window that ends `k`
//! values before the newest one:
//!
//! ```text
//! history:  v0 v1 v2 ... v[len-k-M] ... v[len-k-1] | v[len-k] ... v[len-1]
//!                         \________ window ________/  \____ k newest ____/
//! ```
//!
//! A column is `NaN` until at least `min_window_size` values precede those
//! `k` newest ones.
//!
//! # Example
//! ```ignore
//! use featurizers::window::{Aggregation, WindowSpec, WindowTransformer};
//!
//! let spec = WindowSpec::new(3, 1, 2)?;
//! let mut transformer = WindowTransformer::new(Aggregation::Mean, spec);
//! let grain = vec!["one".to_string()];
//! transformer.execute(&(grain.clone(), 1.0))?; // [NaN, NaN, NaN]
//! transformer.execute(&(grain.clone(), 2.0))?; // [NaN, NaN, 1.0]
//! ```

use crate::archive::{Archivable, ArchiveReader, ArchiveWriter};
use crate::error::{FeaturizerError, Result};
use crate::transformer::Transformer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Identity of one independent sub-stream.
pub type Grain = Vec<String>;

/// A single windowing record: the grain and its observed value.
pub type GrainedValue = (Grain, f64);

/// Reduce function applied to each window.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Mean = 1,
    Min = 2,
    Max = 3,
}

impl Aggregation {
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Aggregation::Mean),
            2 => Ok(Aggregation::Min),
            3 => Ok(Aggregation::Max),
            other => Err(FeaturizerError::invalid_argument(format!(
                "unknown aggregation code {}",
                other
            ))),
        }
    }

    /// Reduces a non-empty window.
    pub fn apply<I>(self, window: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        match self {
            Aggregation::Mean => {
                let (sum, count) = window
                    .into_iter()
                    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
                if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            }
            Aggregation::Min => window.into_iter().fold(f64::NAN, f64::min),
            Aggregation::Max => window.into_iter().fold(f64::NAN, f64::max),
        }
    }
}

/// Horizon and window bounds shared by every grain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub horizon: u32,
    pub min_window_size: u32,
    pub max_window_size: u32,
}

impl WindowSpec {
    pub fn new(horizon: u32, min_window_size: u32, max_window_size: u32) -> Result<Self> {
        let spec = Self {
            horizon,
            min_window_size,
            max_window_size,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(FeaturizerError::invalid_argument("horizon must be at least 1"));
        }
        if self.max_window_size == 0 {
            return Err(FeaturizerError::invalid_argument(
                "max_window_size must be at least 1",
            ));
        }
        if self.min_window_size == 0 {
            return Err(FeaturizerError::invalid_argument(
                "min_window_size must be at least 1",
            ));
        }
        if self.min_window_size > self.max_window_size {
            return Err(FeaturizerError::invalid_argument(format!(
                "min_window_size ({}) must not exceed max_window_size ({})",
                self.min_window_size, self.max_window_size
            )));
        }
        Ok(())
    }

    /// Number of values a grain must retain.
    pub fn capacity(&self) -> usize {
        self.horizon as usize + self.max_window_size as usize
    }
}

/// Bounded history for a single grain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrainWindow {
    history: VecDeque<f64>,
}

impl GrainWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Appends `value`, evicting the oldest entries beyond `capacity`.
    ///
    /// Storage grows with the observed history rather than with `capacity`,
    /// so large window bounds cost nothing until values arrive.
    pub fn push(&mut self, value: f64, capacity: usize) -> Result<()> {
        while !self.history.is_empty() && self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.try_reserve(1)?;
        self.history.push_back(value);
        Ok(())
    }

    /// One output row of `horizon` columns for the current history.
    pub fn row(&self, spec: &WindowSpec, aggregation: Aggregation) -> Result<Vec<f64>> {
        let len = self.history.len();
        let horizon = spec.horizon as usize;
        let min = spec.min_window_size as usize;
        let max = spec.max_window_size as usize;

        let mut row = Vec::new();
        row.try_reserve_exact(horizon)?;
        for k in (1..=horizon).rev() {
            if len < k + min {
                row.push(f64::NAN);
                continue;
            }
            let end = len - k;
            let start = end.saturating_sub(max);
            row.push(aggregation.apply(self.history.range(start..end).copied()));
        }
        Ok(row)
    }
}

/// Streaming transformer holding one [`GrainWindow`] per grain.
#[derive(Debug, Clone)]
pub struct WindowTransformer {
    aggregation: Aggregation,
    spec: WindowSpec,
    grains: BTreeMap<Grain, GrainWindow>,
    flushed: bool,
}

impl WindowTransformer {
    pub fn new(aggregation: Aggregation, spec: WindowSpec) -> Self {
        Self {
            aggregation,
            spec,
            grains: BTreeMap::new(),
            flushed: false,
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    /// Number of grains observed so far.
    pub fn grain_count(&self) -> usize {
        self.grains.len()
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }
}

impl Transformer for WindowTransformer {
    type Input = GrainedValue;
    type Output = Vec<f64>;

    fn execute(&mut self, input: &GrainedValue) -> Result<Vec<f64>> {
        if self.flushed {
            return Err(FeaturizerError::invalid_state(
                "execute called after flush",
            ));
        }
        let (grain, value) = input;
        if grain.is_empty() {
            return Err(FeaturizerError::invalid_argument("grain must not be empty"));
        }

        let capacity = self.spec.capacity();
        if !self.grains.contains_key(grain) {
            tracing::trace!(?grain, "new grain");
            self.grains
                .insert(grain.clone(), GrainWindow::new());
        }
        let window = self
            .grains
            .get_mut(grain)
            .ok_or_else(|| FeaturizerError::invalid_state("grain window missing"))?;
        window.push(*value, capacity)?;
        window.row(&self.spec, self.aggregation)
    }

    /// Rows are emitted eagerly, so nothing is pending; history is released.
    fn flush(&mut self) -> Result<Vec<Vec<f64>>> {
        tracing::debug!(grains = self.grains.len(), "flushing window transformer");
        self.grains.clear();
        self.flushed = true;
        Ok(Vec::new())
    }

    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        (self.aggregation as u8).save(ar)?;
        self.spec.horizon.save(ar)?;
        self.spec.max_window_size.save(ar)?;
        self.spec.min_window_size.save(ar)?;
        self.flushed.save(ar)?;

        ar.write_len(self.grains.len())?;
        for (grain, window) in &self.grains {
            grain.save(ar)?;
            window.history.save(ar)?;
        }
        Ok(())
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        let aggregation = Aggregation::from_code(u8::load(ar)?)
            .map_err(|e| FeaturizerError::decode(e.to_string()))?;
        let horizon = u32::load(ar)?;
        let max_window_size = u32::load(ar)?;
        let min_window_size = u32::load(ar)?;
        let spec = WindowSpec::new(horizon, min_window_size, max_window_size)
            .map_err(|e| FeaturizerError::decode(e.to_string()))?;
        let flushed = bool::load(ar)?;

        let capacity = spec.capacity();
        let count = ar.read_len()?;
        let mut grains = BTreeMap::new();
        for _ in 0..count {
            let grain = Grain::load(ar)?;
            let history = VecDeque::<f64>::load(ar)?;
            if grain.is_empty() || history.len() > capacity {
                return Err(FeaturizerError::decode(format!(
                    "corrupt grain entry ({} values, capacity {})",
                    history.len(),
                    capacity
                )));
            }
            if grains.insert(grain, GrainWindow { history }).is_some() {
                return Err(FeaturizerError::decode("duplicate grain in archive"));
            }
        }

        Ok(Self {
            aggregation,
            spec,
            grains,
            flushed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const N: f64 = f64::NAN;

    fn grain(name: &str) -> Grain {
        vec![name.to_string()]
    }

    /// NaN-aware bitwise-ish comparison of rows.
    fn normalize(rows: &[Vec<f64>]) -> Vec<Vec<Option<f64>>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|v| if v.is_nan() { None } else { Some(*v) })
                    .collect()
            })
            .collect()
    }

    fn run(
        aggregation: Aggregation,
        horizon: u32,
        min: u32,
        max: u32,
        values: &[f64],
    ) -> Vec<Vec<f64>> {
        let spec = WindowSpec::new(horizon, min, max).unwrap();
        let mut t = WindowTransformer::new(aggregation, spec);
        values
            .iter()
            .map(|v| t.execute(&(grain("one"), *v)).unwrap())
            .collect()
    }

    #[test]
    fn test_mean_horizon_three() {
        let rows = run(Aggregation::Mean, 3, 1, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            normalize(&rows),
            normalize(&[
                vec![N, N, N],
                vec![N, N, 1.0],
                vec![N, 1.0, 1.5],
                vec![1.0, 1.5, 2.5],
            ])
        );
    }

    #[test]
    fn test_mean_window_one_horizon_one() {
        let rows = run(Aggregation::Mean, 1, 1, 1, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            normalize(&rows),
            normalize(&[vec![N], vec![1.0], vec![2.0], vec![3.0]])
        );
    }

    #[test]
    fn test_mean_window_two_horizon_one() {
        let rows = run(Aggregation::Mean, 1, 1, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            normalize(&rows),
            normalize(&[vec![N], vec![1.0], vec![1.5], vec![2.5]])
        );
    }

    #[test]
    fn test_mean_min_window_two() {
        let rows = run(Aggregation::Mean, 1, 2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            normalize(&rows),
            normalize(&[vec![N], vec![N], vec![1.5], vec![2.5]])
        );
    }

    #[test]
    fn test_mean_window_one_horizon_two() {
        let rows = run(Aggregation::Mean, 2, 1, 1, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            normalize(&rows),
            normalize(&[vec![N, N], vec![N, 1.0], vec![1.0, 2.0], vec![2.0, 3.0]])
        );
    }

    #[test]
    fn test_mean_window_two_horizon_two() {
        let rows = run(Aggregation::Mean, 2, 1, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            normalize(&rows),
            normalize(&[vec![N, N], vec![N, 1.0], vec![1.0, 1.5], vec![1.5, 2.5]])
        );
    }

    #[test]
    fn test_mean_window_two_horizon_two_min_two() {
        let rows = run(Aggregation::Mean, 2, 2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            normalize(&rows),
            normalize(&[vec![N, N], vec![N, N], vec![N, 1.5], vec![1.5, 2.5]])
        );
    }

    #[test]
    fn test_min_and_max() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        let mins = run(Aggregation::Min, 1, 1, 3, &values);
        let maxs = run(Aggregation::Max, 1, 1, 3, &values);
        assert_eq!(
            normalize(&mins),
            normalize(&[vec![N], vec![3.0], vec![1.0], vec![1.0], vec![1.0]])
        );
        assert_eq!(
            normalize(&maxs),
            normalize(&[vec![N], vec![3.0], vec![3.0], vec![4.0], vec![4.0]])
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let spec = WindowSpec::new(2, 1, 3).unwrap();
        let mut window = GrainWindow::default();
        for i in 0..20 {
            window.push(i as f64, spec.capacity()).unwrap();
        }
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn test_large_window_bounds_grow_on_demand() {
        let spec = WindowSpec::new(2, 1, u32::MAX).unwrap();
        let mut t = WindowTransformer::new(Aggregation::Max, spec);
        let rows: Vec<Vec<f64>> = [1.0, 5.0, 2.0, 3.0]
            .iter()
            .map(|v| t.execute(&(grain("g"), *v)).unwrap())
            .collect();
        assert_eq!(
            normalize(&rows),
            normalize(&[vec![N, N], vec![N, 1.0], vec![1.0, 5.0], vec![5.0, 5.0]])
        );

        let restored = WindowTransformer::from_bytes(&t.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.spec(), &spec);
        assert_eq!(restored.grain_count(), 1);
    }

    #[test]
    fn test_largest_valid_spec_executes() {
        let spec = WindowSpec::new(1, 1, u32::MAX).unwrap();
        assert_eq!(spec.capacity(), 1 + u32::MAX as usize);
        let mut t = WindowTransformer::new(Aggregation::Mean, spec);
        for i in 0..100 {
            t.execute(&(grain("g"), i as f64)).unwrap();
        }
        let row = t.execute(&(grain("g"), 100.0)).unwrap();
        assert_eq!(row, vec![49.5]);
    }

    #[test]
    fn test_infinite_values_propagate() {
        let values = [f64::INFINITY, f64::NEG_INFINITY, 1.0];
        let means = run(Aggregation::Mean, 1, 1, 2, &values);
        assert!(means[0][0].is_nan());
        assert_eq!(means[1][0], f64::INFINITY);
        assert!(means[2][0].is_nan());

        let mins = run(Aggregation::Min, 1, 1, 2, &values);
        assert_eq!(mins[2][0], f64::NEG_INFINITY);
    }

    #[test]
    fn test_invalid_specs() {
        assert!(matches!(
            WindowSpec::new(0, 1, 1),
            Err(FeaturizerError::InvalidArgument(_))
        ));
        assert!(WindowSpec::new(1, 0, 1).is_err());
        assert!(WindowSpec::new(1, 1, 0).is_err());
        assert!(WindowSpec::new(1, 3, 2).is_err());
        assert!(WindowSpec::new(1, 2, 2).is_ok());
    }

    #[test]
    fn test_empty_grain_rejected() {
        let mut t = WindowTransformer::new(Aggregation::Mean, WindowSpec::new(1, 1, 1).unwrap());
        assert!(matches!(
            t.execute(&(Vec::new(), 1.0)),
            Err(FeaturizerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_flush_is_terminal() {
        let mut t = WindowTransformer::new(Aggregation::Mean, WindowSpec::new(2, 1, 2).unwrap());
        t.execute(&(grain("a"), 1.0)).unwrap();
        assert!(t.flush().unwrap().is_empty());
        assert_eq!(t.grain_count(), 0);
        assert!(matches!(
            t.execute(&(grain("a"), 2.0)),
            Err(FeaturizerError::InvalidState(_))
        ));
    }

    #[test]
    fn test_save_preserves_history() {
        let spec = WindowSpec::new(3, 1, 2).unwrap();
        let mut t = WindowTransformer::new(Aggregation::Mean, spec);
        t.execute(&(grain("one"), 1.0)).unwrap();
        t.execute(&(grain("one"), 2.0)).unwrap();
        t.execute(&(vec!["two".to_string(), "x".to_string()], 9.0)).unwrap();

        let bytes = t.to_bytes().unwrap();
        let mut restored = WindowTransformer::from_bytes(&bytes).unwrap();
        assert_eq!(restored.grain_count(), 2);
        assert_eq!(
            normalize(&[restored.execute(&(grain("one"), 3.0)).unwrap()]),
            normalize(&[vec![N, 1.0, 1.5]])
        );
    }

    #[test]
    fn test_load_rejects_bad_spec() {
        let mut writer = ArchiveWriter::new();
        crate::archive::write_version(&mut writer).unwrap();
        1u8.save(&mut writer).unwrap();
        0u32.save(&mut writer).unwrap(); // horizon
        1u32.save(&mut writer).unwrap();
        1u32.save(&mut writer).unwrap();
        false.save(&mut writer).unwrap();
        writer.write_len(0).unwrap();
        let bytes = writer.commit();
        assert!(matches!(
            WindowTransformer::from_bytes(&bytes),
            Err(FeaturizerError::Decode(_))
        ));
    }

    #[test]
    fn test_truncated_archive_is_decode_error() {
        let mut t = WindowTransformer::new(Aggregation::Max, WindowSpec::new(2, 1, 2).unwrap());
        t.execute(&(grain("g"), 1.0)).unwrap();
        let bytes = t.to_bytes().unwrap();
        for cut in 0..bytes.len() {
            assert!(matches!(
                WindowTransformer::from_bytes(&bytes[..cut]),
                Err(FeaturizerError::Decode(_))
            ));
        }
    }

    /// Unbounded reference model: recompute every column from full history.
    fn reference_row(history: &[f64], horizon: usize, min: usize, max: usize) -> Vec<f64> {
        (1..=horizon)
            .rev()
            .map(|k| {
                if history.len() < k + min {
                    return f64::NAN;
                }
                let end = history.len() - k;
                let start = end.saturating_sub(max);
                let window = &history[start..end];
                window.iter().sum::<f64>() / window.len() as f64
            })
            .collect()
    }

    fn records() -> impl Strategy<Value = Vec<(u8, i16)>> {
        proptest::collection::vec((0u8..3, -100i16..100), 0..40)
    }

    proptest! {
        #[test]
        fn prop_matches_unbounded_reference(
            values in proptest::collection::vec(-1000i32..1000, 0..40),
            horizon in 1u32..5,
            min in 1u32..4,
            extra in 0u32..4,
        ) {
            let max = min + extra;
            let spec = WindowSpec::new(horizon, min, max).unwrap();
            let mut t = WindowTransformer::new(Aggregation::Mean, spec);
            let mut history = Vec::new();
            for v in values {
                let v = v as f64;
                history.push(v);
                let row = t.execute(&(grain("g"), v)).unwrap();
                let expected = reference_row(&history, horizon as usize, min as usize, max as usize);
                prop_assert_eq!(normalize(&[row]), normalize(&[expected]));
            }
        }

        #[test]
        fn prop_grains_are_isolated(records in records()) {
            let spec = WindowSpec::new(2, 1, 3).unwrap();
            let mut mixed = WindowTransformer::new(Aggregation::Mean, spec);
            let mut alone = WindowTransformer::new(Aggregation::Mean, spec);

            for (g, v) in records {
                let name = format!("g{}", g);
                let row = mixed.execute(&(grain(&name), v as f64)).unwrap();
                if g == 0 {
                    let solo = alone.execute(&(grain(&name), v as f64)).unwrap();
                    prop_assert_eq!(normalize(&[row]), normalize(&[solo]));
                }
            }
        }

        #[test]
        fn prop_save_load_matches(records in records(), split in 0usize..40) {
            let spec = WindowSpec::new(3, 1, 2).unwrap();
            let mut original = WindowTransformer::new(Aggregation::Mean, spec);
            let split = split.min(records.len());
            for (g, v) in &records[..split] {
                original.execute(&(grain(&format!("g{}", g)), *v as f64)).unwrap();
            }
            let mut restored = WindowTransformer::from_bytes(&original.to_bytes().unwrap()).unwrap();
            for (g, v) in &records[split..] {
                let input = (grain(&format!("g{}", g)), *v as f64);
                let a = original.execute(&input).unwrap();
                let b = restored.execute(&input).unwrap();
                let a_bits: Vec<u64> = a.iter().map(|x| x.to_bits()).collect();
                let b_bits: Vec<u64> = b.iter().map(|x| x.to_bits()).collect();
                prop_assert_eq!(a_bits, b_bits);
            }
        }

        #[test]
        fn prop_flush_completeness(records in records()) {
            let spec = WindowSpec::new(2, 1, 2).unwrap();
            let mut t = WindowTransformer::new(Aggregation::Mean, spec);
            let mut emitted = 0;
            for (g, v) in &records {
                t.execute(&(grain(&format!("g{}", g)), *v as f64)).unwrap();
                emitted += 1;
            }
            emitted += t.flush().unwrap().len();
            prop_assert_eq!(emitted, records.len());
        }
    }
}
