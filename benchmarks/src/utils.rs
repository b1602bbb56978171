use serde::Serialize;
use std::time::{Duration, Instant};

/// Run a function and measure its execution time.
///
/// # Returns
///
/// A tuple of (result, elapsed_time)
pub fn time_fn<F, R>(f: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Run a function `warmup + iterations` times and collect the timings of the
/// measured iterations in milliseconds.
pub fn sample_times<F, R>(warmup: usize, iterations: usize, mut f: F) -> (Vec<R>, Vec<f64>)
where
    F: FnMut() -> R,
{
    for _ in 0..warmup {
        let _ = f();
    }

    let mut results = Vec::with_capacity(iterations);
    let mut times = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let (result, elapsed) = time_fn(&mut f);
        results.push(result);
        times.push(elapsed.as_secs_f64() * 1000.0);
    }
    (results, times)
}

/// Summary of a list of timings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchmarkStats {
    pub samples: usize,
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
}

impl BenchmarkStats {
    /// Calculate statistics from a list of times in milliseconds.
    ///
    /// An empty list yields all-zero statistics.
    pub fn from_times(mut times: Vec<f64>) -> Self {
        let n = times.len();
        if n == 0 {
            return Self::default();
        }
        times.sort_by(f64::total_cmp);

        let mean = times.iter().sum::<f64>() / n as f64;
        let variance = times.iter().map(|&t| (t - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (times[n / 2 - 1] + times[n / 2]) / 2.0
        } else {
            times[n / 2]
        };
        let p95 = times[((n as f64 * 0.95) as usize).min(n - 1)];

        Self {
            samples: n,
            mean_ms: mean,
            std_dev_ms: variance.sqrt(),
            min_ms: times[0],
            max_ms: times[n - 1],
            median_ms: median,
            p95_ms: p95,
        }
    }

    /// Records processed per second at the mean timing.
    pub fn throughput(&self, records: usize) -> f64 {
        if self.mean_ms <= 0.0 {
            return 0.0;
        }
        records as f64 / (self.mean_ms / 1000.0)
    }
}
