use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result};

use crate::{
  request::BenchmarkRequest,
  runtime::{RunScenarioOpts, RuntimeSpec},
  schema::{BenchmarkResult, Measurement},
  stats::compute_stats,
  workspace::{self, WorkspaceConfig},
};

pub struct BenchOpts {
  pub request: BenchmarkRequest,
  pub workspace: WorkspaceConfig,
  /// Stop issuing runtimes after the first failure. In-flight work is never
  /// killed; it finishes or fails on its own.
  pub fail_fast: bool,
  /// Applied to each harness subprocess.
  pub timeout: Duration,
  pub output_dir: PathBuf,
}

/// One runtime that could not produce results, with its diagnostic context.
pub struct RuntimeFailure {
  pub runtime: String,
  pub error: anyhow::Error,
}

#[derive(Default)]
pub struct Summary {
  pub written: Vec<PathBuf>,
  pub failures: Vec<RuntimeFailure>,
}

impl Summary {
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn report(&self) {
    for failure in &self.failures {
      eprintln!("runtime {:?} failed: {:#}", failure.runtime, failure.error);
    }

    println!(
      "{} written, {} runtimes failed",
      self.written.len(),
      self.failures.len()
    );
  }
}

/// Drives one benchmark campaign: a single workspace, every requested
/// runtime, every requested scenario.
pub struct Bench {
  opts: BenchOpts,
  runtimes: Vec<RuntimeSpec>,
}

impl Bench {
  /// Resolves the request's runtime ids against the built-in adapter table.
  pub fn new(opts: BenchOpts) -> Result<Self> {
    let runtimes = opts
      .request
      .runtimes
      .iter()
      .map(|id| RuntimeSpec::builtin(id).with_context(|| format!("unknown runtime {id:?}")))
      .collect::<Result<_>>()?;

    Self::with_runtimes(opts, runtimes)
  }

  /// Uses caller-supplied runtime specs instead of the built-in table.
  pub fn with_runtimes(opts: BenchOpts, runtimes: Vec<RuntimeSpec>) -> Result<Self> {
    opts.request.validate().context("invalid request")?;

    Ok(Self { opts, runtimes })
  }

  /// Provisions the workspace, drives every runtime, persists successes, and
  /// returns the summary.
  ///
  /// Workspace and write errors are fatal to the whole request; per-runtime
  /// errors are collected into the summary without discarding sibling
  /// results.
  pub fn run(&self) -> Result<Summary> {
    // One workspace per request, shared read-only by every runtime.
    let workspace = workspace::provision(&self.opts.workspace).context("provision workspace")?;

    // Runtimes run one at a time: concurrent engines contend for CPU and
    // corrupt each other's timings.
    let mut outcomes: Vec<(String, Result<Vec<BenchmarkResult>>)> = Vec::new();
    for spec in &self.runtimes {
      eprintln!("benchmarking {:?}", spec.id);

      let outcome = self.run_runtime(spec, workspace.path());
      let failed = outcome.is_err();
      outcomes.push((spec.id.clone(), outcome));

      if failed && self.opts.fail_fast {
        break;
      }
    }

    let mut summary = Summary::default();
    for (runtime, outcome) in outcomes {
      match outcome {
        Ok(results) => {
          for result in results {
            let path = result
              .write_to_dir(&self.opts.output_dir)
              .with_context(|| format!("write result for {runtime:?}"))?;

            summary.written.push(path);
          }
        }
        Err(error) => summary.failures.push(RuntimeFailure { runtime, error }),
      }
    }

    Ok(summary)
  }

  fn run_runtime(&self, spec: &RuntimeSpec, workspace: &Path) -> Result<Vec<BenchmarkResult>> {
    if !spec.detect() {
      anyhow::bail!("runtime binary {:?} is unavailable", spec.binary);
    }

    let request = &self.opts.request;

    let mut results = Vec::with_capacity(request.scenarios.len());
    for scenario in &request.scenarios {
      eprintln!("  running {scenario:?}");

      let result = spec
        .run_scenario(&RunScenarioOpts {
          workspace,
          scenario,
          params: request.params(),
          release_tag: &request.release,
          timeout: self.opts.timeout,
        })
        .with_context(|| format!("scenario {scenario:?}"))?;

      for library in &result.results {
        if let Measurement::Samples { samples } = &library.measurement {
          let stats = compute_stats(samples).with_context(|| format!("aggregate {:?}", library.name))?;
          eprintln!(
            "    {}: avg {:.3}ms p95 {:.3}ms over {} runs",
            library.name,
            stats.avg_time,
            stats.p95,
            samples.len()
          );
        }
      }

      results.push(result);
    }

    Ok(results)
  }
}
