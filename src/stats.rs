use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Timing aggregates over one sample vector, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
  pub avg_time: f64,
  pub min_time: f64,
  pub max_time: f64,
  pub std_dev: f64,
  pub p50: f64,
  pub p95: f64,
  pub p99: f64,
}

impl Stats {
  pub fn validate(&self) -> Result<()> {
    let fields = [
      ("avgTime", self.avg_time),
      ("minTime", self.min_time),
      ("maxTime", self.max_time),
      ("stdDev", self.std_dev),
      ("p50", self.p50),
      ("p95", self.p95),
      ("p99", self.p99),
    ];

    for (name, value) in fields {
      ensure!(
        value.is_finite() && value >= 0.0,
        "{name} {value} is not a finite non-negative number"
      );
    }

    ensure!(
      self.min_time <= self.max_time,
      "minTime {} exceeds maxTime {}",
      self.min_time,
      self.max_time
    );

    Ok(())
  }
}

/// Computes timing aggregates over a non-empty vector of wall-clock samples.
///
/// Standard deviation uses the population formula (divide by `n`).
///
/// # Errors
///
/// Fails on an empty input, and on any sample that is not a finite
/// non-negative number.
pub fn compute_stats(samples: &[f64]) -> Result<Stats> {
  ensure!(!samples.is_empty(), "cannot compute statistics over zero samples");

  for &sample in samples {
    ensure!(
      sample.is_finite() && sample >= 0.0,
      "sample {sample} is not a finite non-negative number"
    );
  }

  let mut sorted = samples.to_vec();
  sorted.sort_by(|a, b| a.total_cmp(b));

  let n = sorted.len();
  let avg = sorted.iter().sum::<f64>() / n as f64;
  let variance = sorted.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n as f64;

  Ok(Stats {
    avg_time: avg,
    min_time: sorted[0],
    max_time: sorted[n - 1],
    std_dev: variance.sqrt(),
    p50: percentile(&sorted, 50.0),
    p95: percentile(&sorted, 95.0),
    p99: percentile(&sorted, 99.0),
  })
}

/// Nearest-rank percentile over an ascending-sorted, non-empty slice:
/// `index = ceil(p/100 * n) - 1`, clamped to `[0, n-1]`. Historical records
/// were produced with this exact tie-break, so it must not change.
fn percentile(sorted: &[f64], p: f64) -> f64 {
  let n = sorted.len();
  let index = ((p / 100.0 * n as f64).ceil() as isize - 1).clamp(0, n as isize - 1);

  sorted[index as usize]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_input_is_an_error() {
    assert!(compute_stats(&[]).is_err());
  }

  #[test]
  fn rejects_non_finite_and_negative_samples() {
    assert!(compute_stats(&[1.0, f64::NAN]).is_err());
    assert!(compute_stats(&[1.0, f64::INFINITY]).is_err());
    assert!(compute_stats(&[1.0, -0.5]).is_err());
  }

  #[test]
  fn single_sample_collapses_to_that_value() {
    let stats = compute_stats(&[4.2]).unwrap();

    assert_eq!(stats.avg_time, 4.2);
    assert_eq!(stats.min_time, 4.2);
    assert_eq!(stats.max_time, 4.2);
    assert_eq!(stats.std_dev, 0.0);
    assert_eq!(stats.p50, 4.2);
    assert_eq!(stats.p95, 4.2);
    assert_eq!(stats.p99, 4.2);
  }

  #[test]
  fn nearest_rank_percentiles() {
    let stats = compute_stats(&[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();

    // ceil(0.50 * 5) - 1 = 2, ceil(0.95 * 5) - 1 = 4.
    assert_eq!(stats.p50, 30.0);
    assert_eq!(stats.p95, 50.0);
    assert_eq!(stats.p99, 50.0);
    assert_eq!(stats.min_time, 10.0);
    assert_eq!(stats.max_time, 50.0);
    assert_eq!(stats.avg_time, 30.0);
  }

  #[test]
  fn population_std_dev() {
    // mean 3; squared deviations sum to 10; divided by n = 5, not n - 1.
    let stats = compute_stats(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

    assert!((stats.std_dev - 2.0f64.sqrt()).abs() < 1e-12);
  }

  #[test]
  fn order_does_not_matter() {
    let a = compute_stats(&[3.0, 1.0, 2.0, 2.0]).unwrap();
    let b = compute_stats(&[2.0, 2.0, 1.0, 3.0]).unwrap();

    assert_eq!(a, b);
  }

  #[test]
  fn aggregates_are_ordered() {
    let samples = [12.5, 3.0, 88.1, 7.7, 42.0, 19.0, 3.0];
    let stats = compute_stats(&samples).unwrap();

    assert!(stats.min_time <= stats.p50);
    assert!(stats.p50 <= stats.p95);
    assert!(stats.p95 <= stats.p99);
    assert!(stats.p99 <= stats.max_time);
    assert!(stats.min_time <= stats.avg_time && stats.avg_time <= stats.max_time);
  }
}
