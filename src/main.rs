use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use effection_bench::{
  bench::{Bench, BenchOpts},
  config::BenchConfig,
  request::BenchmarkRequest,
  workspace::{self, WorkspaceConfig},
};

#[derive(Parser)]
#[command(about = "Benchmarks effection releases across JavaScript runtimes.")]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run one benchmark campaign and write result records.
  Run {
    /// Effection release to benchmark.
    #[arg(long)]
    release: String,
    /// Target runtime id (node, deno, bun). Repeatable.
    #[arg(short, long = "runtime", required = true)]
    runtime: Vec<String>,
    /// Scenario to run; defaults to every known scenario. Repeatable.
    #[arg(short, long = "scenario")]
    scenario: Vec<String>,
    /// Measured iterations per scenario.
    #[arg(long, default_value_t = 30)]
    repeat: u32,
    /// Discarded priming iterations before measurement.
    #[arg(long, default_value_t = 5)]
    warmup: u32,
    /// Workload depth passed through to scenarios.
    #[arg(long, default_value_t = 100)]
    depth: u32,
    /// Override the pinned rxjs version.
    #[arg(long)]
    rxjs: Option<String>,
    /// Override the pinned effect version.
    #[arg(long)]
    effect: Option<String>,
    /// Override the pinned co version.
    #[arg(long)]
    co: Option<String>,
    /// Reuse a cached workspace keyed by the exact version set.
    #[arg(long)]
    cache_workspace: bool,
    /// Directory holding cached workspaces.
    #[arg(long, default_value = ".workspace-cache")]
    cache_root: PathBuf,
    /// Stop issuing runtimes after the first failure.
    #[arg(long)]
    fail_fast: bool,
    /// Kill a harness subprocess that runs longer than this.
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
    /// Config file supplying comparison-library defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory receiving result records.
    #[arg(long, default_value = "./results")]
    output_dir: PathBuf,
  },
}

fn main() -> Result<ExitCode> {
  match Args::parse().command {
    Command::Run {
      release,
      runtime,
      scenario,
      repeat,
      warmup,
      depth,
      rxjs,
      effect,
      co,
      cache_workspace,
      cache_root,
      fail_fast,
      timeout_secs,
      config,
      output_dir,
    } => {
      let defaults = BenchConfig::load_or_default(config.as_deref()).context("load config")?;

      let mut comparison = defaults.comparison_libraries;
      if let Some(version) = rxjs {
        comparison.rxjs = version;
      }
      if let Some(version) = effect {
        comparison.effect = version;
      }
      if let Some(version) = co {
        comparison.co = version;
      }

      let scenarios = if scenario.is_empty() {
        workspace::SCENARIOS.iter().map(ToString::to_string).collect()
      } else {
        scenario
      };

      let mut workspace_config = WorkspaceConfig::new(&release, comparison.clone());
      workspace_config.cache = cache_workspace;
      workspace_config.cache_root = cache_root;

      let request = BenchmarkRequest {
        release,
        runtimes: runtime,
        scenarios,
        repeat,
        warmup,
        depth,
        comparison_versions: comparison,
      };

      let bench = Bench::new(BenchOpts {
        request,
        workspace: workspace_config,
        fail_fast,
        timeout: Duration::from_secs(timeout_secs),
        output_dir,
      })
      .context("bench")?;

      let summary = bench.run().context("run")?;
      summary.report();

      Ok(if summary.is_success() {
        ExitCode::SUCCESS
      } else {
        ExitCode::FAILURE
      })
    }
  }
}
