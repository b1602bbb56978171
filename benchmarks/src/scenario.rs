//! Benchmark scenarios described in JSON.
//!
//! A scenario names a featurizer configuration and the shape of the
//! synthetic stream to push through it:
//!
//! ```json
//! [{"name": "window-mean", "config": {"featurizer": "rolling_window", "horizon": 3, "max_window_size": 4},
//!   "records": 10000, "grains": 16, "iterations": 20}]
//! ```

use crate::utils::{sample_times, BenchmarkStats};
use featurizers::estimator::{train, Accumulator, Estimator};
use featurizers::featurizers::{
    max_normalize_estimator, NumericalizeAccumulator, RollingWindowAccumulator, StringAccumulator,
};
use featurizers::window::GrainedValue;
use featurizers::{FeaturizerConfig, FeaturizerError, Result, Transformer};
use serde::{Deserialize, Serialize};

fn default_grains() -> usize {
    1
}

fn default_iterations() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub config: FeaturizerConfig,
    pub records: usize,
    #[serde(default = "default_grains")]
    pub grains: usize,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default)]
    pub warmup: usize,
}

impl Scenario {
    /// Parses a JSON array of scenarios and validates each one.
    pub fn list_from_json(json: &str) -> Result<Vec<Scenario>> {
        let scenarios: Vec<Scenario> = serde_json::from_str(json)
            .map_err(|e| FeaturizerError::invalid_argument(format!("invalid scenario list: {}", e)))?;
        for scenario in &scenarios {
            scenario.validate()?;
        }
        Ok(scenarios)
    }

    pub fn validate(&self) -> Result<()> {
        if self.records == 0 || self.grains == 0 || self.iterations == 0 {
            return Err(FeaturizerError::invalid_argument(format!(
                "scenario '{}': records, grains and iterations must be positive",
                self.name
            )));
        }
        self.config.validate()
    }
}

/// Measured outcome of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub featurizer: &'static str,
    pub records: usize,
    pub outputs: usize,
    pub saved_bytes: usize,
    pub stats: BenchmarkStats,
    pub records_per_sec: f64,
}

/// What one train-transform-save run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunSummary {
    outputs: usize,
    saved_bytes: usize,
}

/// Deterministic value stream so runs are comparable.
pub fn synthetic_values(count: usize) -> Vec<f64> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (0..count)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 200.0 - 100.0
        })
        .collect()
}

/// `(grain, value)` records cycling through `grains` grains.
pub fn synthetic_grained(count: usize, grains: usize) -> Vec<GrainedValue> {
    synthetic_values(count)
        .into_iter()
        .enumerate()
        .map(|(i, value)| (vec![format!("grain-{}", i % grains.max(1))], value))
        .collect()
}

fn run_featurizer<A: Accumulator>(
    mut estimator: Estimator<A>,
    records: &[A::Input],
) -> Result<RunSummary> {
    train(&mut estimator, records)?;
    let mut transformer = estimator.create_transformer()?;
    let mut outputs = 0;
    for record in records {
        transformer.execute(record)?;
        outputs += 1;
    }
    let saved_bytes = transformer.to_bytes()?.len();
    outputs += transformer.flush()?.len();
    Ok(RunSummary { outputs, saved_bytes })
}

fn run_once(scenario: &Scenario) -> Result<RunSummary> {
    match &scenario.config {
        FeaturizerConfig::RollingWindow(config) => {
            let records = synthetic_grained(scenario.records, scenario.grains);
            run_featurizer(Estimator::standalone(RollingWindowAccumulator::new(*config)?), &records)
        }
        FeaturizerConfig::MaxNormalize(config) => {
            let rows: Vec<Vec<f64>> = synthetic_values(scenario.records)
                .chunks(4)
                .map(<[f64]>::to_vec)
                .collect();
            run_featurizer(max_normalize_estimator(*config)?, &rows)
        }
        FeaturizerConfig::Numericalize(config) => {
            let labels: Vec<String> = synthetic_values(scenario.records)
                .into_iter()
                .map(|v| format!("label-{}", v.abs() as u64 % scenario.grains as u64))
                .collect();
            run_featurizer(
                Estimator::standalone(NumericalizeAccumulator::<String>::new(*config)?),
                &labels,
            )
        }
        FeaturizerConfig::Stringify(config) => {
            let values = synthetic_values(scenario.records);
            run_featurizer(Estimator::standalone(StringAccumulator::<f64>::new(*config)?), &values)
        }
    }
}

/// Runs a scenario `warmup + iterations` times and summarizes the timings.
pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioResult> {
    scenario.validate()?;
    tracing::info!(
        scenario = %scenario.name,
        featurizer = scenario.config.name(),
        records = scenario.records,
        "running scenario"
    );

    let (runs, times) = sample_times(scenario.warmup, scenario.iterations, || run_once(scenario));
    let mut summary = None;
    for run in runs {
        summary = Some(run?);
    }
    let summary = summary.ok_or_else(|| FeaturizerError::invalid_state("scenario produced no runs"))?;

    let stats = BenchmarkStats::from_times(times);
    let records_per_sec = stats.throughput(scenario.records);
    tracing::info!(
        scenario = %scenario.name,
        mean_ms = stats.mean_ms,
        records_per_sec,
        "scenario finished"
    );

    Ok(ScenarioResult {
        name: scenario.name.clone(),
        featurizer: scenario.config.name(),
        records: scenario.records,
        outputs: summary.outputs,
        saved_bytes: summary.saved_bytes,
        stats,
        records_per_sec,
    })
}

/// Scenarios used when no list is given on the command line.
pub fn default_scenarios() -> Vec<Scenario> {
    let scenario = |name: &str, json: &str, records: usize, grains: usize| -> Result<Scenario> {
        Ok(Scenario {
            name: name.to_string(),
            config: FeaturizerConfig::from_json(json)?,
            records,
            grains,
            iterations: 10,
            warmup: 2,
        })
    };
    [
        scenario(
            "window-mean",
            r#"{"featurizer":"rolling_window","aggregation":"mean","horizon":3,"min_window_size":1,"max_window_size":8}"#,
            10_000,
            16,
        ),
        scenario(
            "window-max",
            r#"{"featurizer":"rolling_window","aggregation":"max","horizon":1,"min_window_size":2,"max_window_size":32}"#,
            10_000,
            4,
        ),
        scenario("max-normalize", r#"{"featurizer":"max_normalize"}"#, 10_000, 1),
        scenario("numericalize", r#"{"featurizer":"numericalize"}"#, 10_000, 64),
        scenario("stringify", r#"{"featurizer":"stringify","empty_string_for_nulls":true}"#, 10_000, 1),
    ]
    .into_iter()
    .filter_map(|scenario| match scenario {
        Ok(scenario) => Some(scenario),
        Err(e) => {
            tracing::warn!(error = %e, "skipping built-in scenario");
            None
        }
    })
    .collect()
}
