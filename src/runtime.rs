use std::{
  env,
  path::Path,
  process::{Command, Stdio},
  time::Duration,
};

use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::{
  ext::{CommandExt, ExitStatusExt},
  schema::{BenchmarkParams, BenchmarkResult, HarnessOutput, Metadata, Runner, SCHEMA_VERSION},
  workspace::HARNESS_FILE,
};

/// How to invoke one target runtime: its binary plus whatever arguments it
/// needs before the harness file. Resolved from the built-in table for the
/// known runtimes; tests supply their own specs.
#[derive(Debug, Clone)]
pub struct RuntimeSpec {
  pub id: String,
  pub binary: String,
  pub prefix_args: Vec<String>,
  pub version_args: Vec<String>,
}

pub fn builtin_ids() -> &'static [&'static str] {
  &["node", "deno", "bun"]
}

impl RuntimeSpec {
  pub fn builtin(id: &str) -> Option<Self> {
    let (binary, prefix_args): (&str, &[&str]) = match id {
      "node" => ("node", &[]),
      "deno" => ("deno", &["run", "--quiet", "--allow-read"]),
      "bun" => ("bun", &["run"]),
      _ => return None,
    };

    Some(Self {
      id: id.to_string(),
      binary: binary.to_string(),
      prefix_args: prefix_args.iter().map(ToString::to_string).collect(),
      version_args: vec!["--version".to_string()],
    })
  }

  /// Best-effort availability probe. Launch failures of any kind mean
  /// "unavailable"; this never errors.
  pub fn detect(&self) -> bool {
    Command::new(&self.binary)
      .args(&self.version_args)
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .map(|status| status.success())
      .unwrap_or(false)
  }

  /// Reported runtime version, e.g. `22.3.0`.
  pub fn version(&self) -> Result<String> {
    let captured = Command::new(&self.binary)
      .args(&self.version_args)
      .capture()
      .with_context(|| format!("run {}", self.binary))?;

    captured
      .status
      .check_success()
      .with_context(|| format!("{} {}", self.binary, self.version_args.join(" ")))?;

    parse_version(&captured.stdout)
  }

  /// Invokes the harness for one scenario inside the workspace and turns its
  /// structured stdout into a validated result record.
  ///
  /// # Errors
  ///
  /// Non-zero exit surfaces the captured stderr; a timeout kills the child;
  /// unparseable or schema-invalid output is a hard failure carrying the raw
  /// stdout for diagnosis.
  pub fn run_scenario(&self, opts: &RunScenarioOpts) -> Result<BenchmarkResult> {
    let mut command = Command::new(&self.binary);
    command
      .current_dir(opts.workspace)
      .args(&self.prefix_args)
      .arg(HARNESS_FILE)
      .args(["--scenario", opts.scenario])
      .args(["--repeat", &opts.params.repeat.to_string()])
      .args(["--warmup", &opts.params.warmup.to_string()])
      .args(["--depth", &opts.params.depth.to_string()])
      .arg("--json");

    let captured = command
      .capture_timeout(opts.timeout)
      .context("run harness")?
      .with_context(|| format!("harness timed out after {}s", opts.timeout.as_secs()))?;

    if !captured.status.success() {
      bail!(
        "harness exited with {}:\n{}",
        captured.status,
        captured.stderr.trim_end()
      );
    }

    let Some(line) = captured.stdout.lines().find(|line| line.starts_with('{')) else {
      bail!("no structured line in harness stdout:\n{}", captured.stdout);
    };

    let output: HarnessOutput =
      serde_json::from_str(line).with_context(|| format!("parse harness output: {line}"))?;

    let version = self.version().context("version")?;

    let result = BenchmarkResult {
      schema_version: SCHEMA_VERSION,
      metadata: Metadata {
        release_tag: opts.release_tag.to_string(),
        runtime: self.id.clone(),
        runtime_major_version: major_version(&version)?,
        timestamp: Utc::now().fixed_offset(),
        runner: Runner {
          os: env::consts::OS.to_string(),
          arch: env::consts::ARCH.to_string(),
        },
        scenario: opts.scenario.to_string(),
        benchmark_params: opts.params,
      },
      results: output.results,
    };

    result
      .validate()
      .with_context(|| format!("validate harness output:\n{line}"))?;

    Ok(result)
  }
}

pub struct RunScenarioOpts<'a> {
  pub workspace: &'a Path,
  pub scenario: &'a str,
  pub params: BenchmarkParams,
  pub release_tag: &'a str,
  pub timeout: Duration,
}

/// Extracts a version number from a `--version` banner. Handles bare numbers
/// (`1.1.12`), `v`-prefixed ones (`v22.3.0`), and name-prefixed banners
/// (`deno 1.44.4 (release, ...)`), looking only at the first line.
fn parse_version(raw: &str) -> Result<String> {
  let line = raw.lines().next().unwrap_or("").trim();

  line
    .split_whitespace()
    .find_map(|token| {
      let token = token.strip_prefix('v').unwrap_or(token);

      token
        .chars()
        .next()
        .filter(|c| c.is_ascii_digit())
        .map(|_| token.to_string())
    })
    .with_context(|| format!("no version number in {line:?}"))
}

pub fn major_version(version: &str) -> Result<u32> {
  let major = version.split('.').next().unwrap_or(version);

  major
    .parse()
    .with_context(|| format!("invalid major version in {version:?}"))
}
