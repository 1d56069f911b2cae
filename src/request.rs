use std::collections::BTreeSet;

use anyhow::{ensure, Result};

use crate::{config::ComparisonLibraries, schema::BenchmarkParams, workspace};

/// One benchmark invocation, assembled from CLI arguments and config
/// defaults.
#[derive(Debug, Clone)]
pub struct BenchmarkRequest {
  pub release: String,
  pub runtimes: Vec<String>,
  pub scenarios: Vec<String>,
  pub repeat: u32,
  pub warmup: u32,
  pub depth: u32,
  pub comparison_versions: ComparisonLibraries,
}

impl BenchmarkRequest {
  /// Any violation here is a configuration error: reported immediately, with
  /// no partial execution attempted.
  pub fn validate(&self) -> Result<()> {
    ensure!(!self.release.is_empty(), "release must be non-empty");
    ensure!(!self.runtimes.is_empty(), "at least one runtime is required");

    let unique: BTreeSet<_> = self.runtimes.iter().collect();
    ensure!(
      unique.len() == self.runtimes.len(),
      "duplicate runtimes in {:?}",
      self.runtimes
    );

    ensure!(!self.scenarios.is_empty(), "at least one scenario is required");
    for scenario in &self.scenarios {
      ensure!(
        workspace::SCENARIOS.contains(&scenario.as_str()),
        "unknown scenario {scenario:?}, expected one of {:?}",
        workspace::SCENARIOS
      );
    }

    ensure!(self.repeat >= 1, "repeat must be positive");
    ensure!(self.depth >= 1, "depth must be positive");

    Ok(())
  }

  pub fn params(&self) -> BenchmarkParams {
    BenchmarkParams {
      repeat: self.repeat,
      warmup: self.warmup,
      depth: self.depth,
    }
  }
}
