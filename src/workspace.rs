use std::{
  fs,
  path::{Path, PathBuf},
  process::Command,
};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use crate::{config::ComparisonLibraries, ext::CommandExt};

/// Harness file name inside a provisioned workspace.
pub const HARNESS_FILE: &str = "harness.mjs";
pub const SCENARIOS_FILE: &str = "scenarios.mjs";

/// Scenario names the embedded harness understands.
pub const SCENARIOS: &[&str] = &["call-chain", "event-chain", "spawn-chain"];

const HARNESS_SOURCE: &str = include_str!("../assets/harness.mjs");
const SCENARIOS_SOURCE: &str = include_str!("../assets/scenarios.mjs");

/// How a workspace is provisioned for one request.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
  /// Effection release to pin.
  pub release: String,
  pub comparison: ComparisonLibraries,
  /// Reuse a persistent directory keyed by the version set instead of a
  /// throwaway tempdir.
  pub cache: bool,
  pub cache_root: PathBuf,
  /// Dependency-install command, run with the workspace as working
  /// directory.
  pub install_command: Vec<String>,
}

impl WorkspaceConfig {
  pub fn new(release: impl Into<String>, comparison: ComparisonLibraries) -> Self {
    Self {
      release: release.into(),
      comparison,
      cache: false,
      cache_root: PathBuf::from(".workspace-cache"),
      install_command: ["npm", "install", "--no-audit", "--no-fund"]
        .iter()
        .map(ToString::to_string)
        .collect(),
    }
  }
}

/// An isolated directory holding pinned dependencies plus harness and
/// scenario sources. Ephemeral workspaces delete themselves on drop
/// (best-effort, via `TempDir`); cached workspaces persist under the cache
/// root. Adapters only ever receive the read path.
pub struct Workspace {
  root: PathBuf,
  _tempdir: Option<TempDir>,
}

impl Workspace {
  pub fn path(&self) -> &Path {
    &self.root
  }
}

/// Provisions a workspace, running the dependency-install step as needed.
///
/// # Errors
///
/// A failed install is fatal: the workspace is never handed to the caller
/// half-built.
pub fn provision(config: &WorkspaceConfig) -> Result<Workspace> {
  if config.cache {
    provision_cached(config)
  } else {
    provision_ephemeral(config)
  }
}

fn provision_ephemeral(config: &WorkspaceConfig) -> Result<Workspace> {
  let tempdir = TempDir::with_prefix("effection-bench-").context("tempdir")?;
  let root = tempdir.path().to_path_buf();

  write_manifest(&root, config).context("write manifest")?;
  install(&root, config).context("install dependencies")?;
  copy_sources(&root).context("copy sources")?;

  Ok(Workspace {
    root,
    _tempdir: Some(tempdir),
  })
}

fn provision_cached(config: &WorkspaceConfig) -> Result<Workspace> {
  let key = cache_key(&config.release, &config.comparison);
  let root = config.cache_root.join(key);

  fs::create_dir_all(&root).with_context(|| format!("create {root:?}"))?;
  write_manifest(&root, config).context("write manifest")?;

  // node_modules doubles as the completed-install marker. Two concurrent
  // provisions of the same key can race on the install step; the key scheme
  // is the only guard. Accepted limitation.
  if !root.join("node_modules").exists() {
    install(&root, config).context("install dependencies")?;
  }

  copy_sources(&root).context("copy sources")?;

  Ok(Workspace { root, _tempdir: None })
}

/// First 16 hex characters of SHA-256 over the canonical JSON encoding of the
/// version set. serde_json orders map keys, so the encoding is stable.
pub fn cache_key(release: &str, comparison: &ComparisonLibraries) -> String {
  let canonical = serde_json::json!({
    "targetVersion": release,
    "comparisonVersions": {
      "rxjs": comparison.rxjs,
      "effect": comparison.effect,
      "co": comparison.co,
    },
  });

  let digest = Sha256::digest(canonical.to_string());

  hex::encode(digest)[..16].to_string()
}

fn write_manifest(root: &Path, config: &WorkspaceConfig) -> Result<()> {
  let manifest = serde_json::json!({
    "name": "effection-bench-workspace",
    "private": true,
    "type": "module",
    "dependencies": {
      "effection": config.release,
      "rxjs": config.comparison.rxjs,
      "effect": config.comparison.effect,
      "co": config.comparison.co,
    },
  });

  let json = serde_json::to_string_pretty(&manifest).context("serialize")?;
  fs::write(root.join("package.json"), json + "\n").context("write package.json")
}

fn install(root: &Path, config: &WorkspaceConfig) -> Result<()> {
  eprintln!("installing dependencies in {root:?}");

  let (binary, args) = config.install_command.split_first().context("empty install command")?;

  Command::new(binary)
    .current_dir(root)
    .args(args)
    .check_success()
    .with_context(|| format!("{binary} {}", args.join(" ")))
}

/// Harness and scenario sources are refreshed on every provision, so cached
/// workspaces always track the current benchmark definitions even when the
/// install step was skipped.
fn copy_sources(root: &Path) -> Result<()> {
  fs::write(root.join(HARNESS_FILE), HARNESS_SOURCE).context("write harness")?;
  fs::write(root.join(SCENARIOS_FILE), SCENARIOS_SOURCE).context("write scenarios")?;

  Ok(())
}
