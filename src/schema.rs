use std::{
  fs,
  path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::stats::Stats;

/// Current result schema revision. Version 1 records carried pre-aggregated
/// statistics; version 2 records carry raw samples.
pub const SCHEMA_VERSION: u32 = 2;
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// The persisted unit of benchmark output: one scenario, one runtime, one
/// release, with per-library measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
  pub schema_version: u32,
  pub metadata: Metadata,
  pub results: Vec<ScenarioResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
  pub release_tag: String,
  pub runtime: String,
  pub runtime_major_version: u32,
  pub timestamp: DateTime<FixedOffset>,
  pub runner: Runner,
  pub scenario: String,
  pub benchmark_params: BenchmarkParams,
}

/// Host that produced the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
  pub os: String,
  pub arch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkParams {
  pub repeat: u32,
  pub warmup: u32,
  pub depth: u32,
}

/// One measured library implementation within a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
  pub name: String,
  #[serde(flatten)]
  pub measurement: Measurement,
}

/// Raw samples under the current schema, or aggregates under the legacy one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measurement {
  Samples { samples: Vec<f64> },
  Stats { stats: Stats },
}

/// The single structured line a harness subprocess prints on success.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessOutput {
  pub results: Vec<ScenarioResult>,
}

impl BenchmarkResult {
  /// Rejects malformed records before they reach disk. Stored results are a
  /// permanent historical record, so nothing is coerced or dropped.
  pub fn validate(&self) -> Result<()> {
    match self.schema_version {
      SCHEMA_VERSION | LEGACY_SCHEMA_VERSION => {}
      other => bail!("unsupported schema version {other}"),
    }

    self.metadata.validate().context("metadata")?;
    ensure!(!self.results.is_empty(), "results must be non-empty");

    for result in &self.results {
      result.validate().with_context(|| format!("result {:?}", result.name))?;

      if self.schema_version == SCHEMA_VERSION {
        ensure!(
          matches!(result.measurement, Measurement::Samples { .. }),
          "schema version {SCHEMA_VERSION} requires raw samples, but result {:?} carries aggregates",
          result.name
        );
      }
    }

    Ok(())
  }

  /// Deterministic file name. Human-readable only; the record's own metadata
  /// is authoritative for querying.
  pub fn file_name(&self) -> String {
    let metadata = &self.metadata;

    format!(
      "{}-{}-{}-{}-{}.json",
      metadata.timestamp.format("%Y-%m-%d"),
      metadata.release_tag,
      metadata.runtime,
      metadata.runtime_major_version,
      metadata.scenario,
    )
  }

  /// Validates and writes the record as pretty-printed JSON. Records are
  /// immutable once written; reruns produce new files, never in-place edits,
  /// so a colliding file name is an error rather than an overwrite.
  pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
    self.validate().context("validate")?;

    fs::create_dir_all(dir).with_context(|| format!("create {dir:?}"))?;

    let path = dir.join(self.file_name());
    ensure!(
      !path.exists(),
      "record {path:?} already exists; written results are immutable"
    );

    let json = serde_json::to_string_pretty(self).context("serialize")?;
    fs::write(&path, json + "\n").with_context(|| format!("write {path:?}"))?;

    Ok(path)
  }
}

impl Metadata {
  fn validate(&self) -> Result<()> {
    ensure!(!self.release_tag.is_empty(), "releaseTag must be non-empty");
    ensure!(!self.runtime.is_empty(), "runtime must be non-empty");
    ensure!(!self.scenario.is_empty(), "scenario must be non-empty");

    Ok(())
  }
}

impl ScenarioResult {
  fn validate(&self) -> Result<()> {
    ensure!(!self.name.is_empty(), "name must be non-empty");

    match &self.measurement {
      Measurement::Samples { samples } => {
        ensure!(!samples.is_empty(), "samples must be non-empty");

        for &sample in samples {
          ensure!(
            sample.is_finite() && sample >= 0.0,
            "sample {sample} is not a finite non-negative number"
          );
        }
      }
      Measurement::Stats { stats } => stats.validate()?,
    }

    Ok(())
  }
}
