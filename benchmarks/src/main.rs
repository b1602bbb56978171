//! Scenario runner.
//!
//! Usage: `benchmarks [SCENARIOS.json] [RESULTS.json]`
//!
//! Without a scenario file the built-in scenarios run. Results go to
//! `RESULTS.json` when given, otherwise to stdout. Set `RUST_LOG` to control
//! log output.

use benchmarks::{default_scenarios, run_scenario, Scenario, ScenarioResult};
use featurizers::Result;
use tracing_subscriber::EnvFilter;

fn run(scenarios_path: Option<&str>, results_path: Option<&str>) -> Result<()> {
    let scenarios = match scenarios_path {
        Some(path) => Scenario::list_from_json(&std::fs::read_to_string(path)?)?,
        None => default_scenarios(),
    };

    let mut results: Vec<ScenarioResult> = Vec::with_capacity(scenarios.len());
    for scenario in &scenarios {
        match run_scenario(scenario) {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!(scenario = %scenario.name, error = %e, "scenario failed"),
        }
    }

    let json = serde_json::to_string_pretty(&results).map_err(|e| {
        featurizers::FeaturizerError::invalid_state(format!("cannot encode results: {}", e))
    })?;
    match results_path {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(path, scenarios = results.len(), "results written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(args.first().map(String::as_str), args.get(1).map(String::as_str)) {
        tracing::error!(error = %e, "benchmark run failed");
        std::process::exit(1);
    }
}
