//! Benchmark harness for the featurizers library.
//!
//! This library provides:
//!
//! - JSON-described benchmark scenarios over synthetic streams
//! - Timing and summary statistics

pub mod scenario;
pub mod utils;

pub use scenario::{default_scenarios, run_scenario, Scenario, ScenarioResult};
pub use utils::{sample_times, time_fn, BenchmarkStats};
