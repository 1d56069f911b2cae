use std::{fs, path::Path, process::Command};

use effection_bench::{ext::CommandExt, schema::HarnessOutput};
use tempfile::TempDir;

const HARNESS_SOURCE: &str = include_str!("../assets/harness.mjs");

// A scenario table with no package dependencies, so the harness can run in a
// bare directory without an npm install.
const STUB_SCENARIOS: &str = r#"
export const scenarios = {
  "call-chain": {
    stub: async (depth) => depth,
  },
};
"#;

fn node_available() -> bool {
  Command::new("node")
    .arg("--version")
    .output()
    .map(|output| output.status.success())
    .unwrap_or(false)
}

fn harness_dir() -> TempDir {
  let dir = TempDir::with_prefix("harness-").unwrap();

  fs::write(dir.path().join("harness.mjs"), HARNESS_SOURCE).unwrap();
  fs::write(dir.path().join("scenarios.mjs"), STUB_SCENARIOS).unwrap();

  dir
}

fn run_harness(dir: &Path, args: &[&str]) -> effection_bench::ext::Captured {
  Command::new("node")
    .current_dir(dir)
    .arg("harness.mjs")
    .args(args)
    .capture()
    .unwrap()
}

fn structured_lines(stdout: &str) -> Vec<&str> {
  stdout.lines().filter(|line| line.starts_with('{')).collect()
}

#[test]
fn unknown_scenario_exits_1_with_no_structured_line() {
  if !node_available() {
    eprintln!("skipping: node not on PATH");
    return;
  }

  let dir = harness_dir();
  let captured = run_harness(dir.path(), &["--scenario", "nope", "--json"]);

  assert!(!captured.status.success());
  assert!(structured_lines(&captured.stdout).is_empty());
  assert!(captured.stderr.contains("available scenarios"));
  assert!(captured.stderr.contains("call-chain"));
}

#[test]
fn missing_scenario_flag_exits_1() {
  if !node_available() {
    eprintln!("skipping: node not on PATH");
    return;
  }

  let dir = harness_dir();
  let captured = run_harness(dir.path(), &["--json"]);

  assert!(!captured.status.success());
  assert!(structured_lines(&captured.stdout).is_empty());
}

#[test]
fn invalid_parameters_exit_1() {
  if !node_available() {
    eprintln!("skipping: node not on PATH");
    return;
  }

  let dir = harness_dir();
  let captured = run_harness(
    dir.path(),
    &["--scenario", "call-chain", "--repeat", "0", "--json"],
  );

  assert!(!captured.status.success());
  assert!(structured_lines(&captured.stdout).is_empty());
}

#[test]
fn known_scenario_writes_exactly_one_structured_line() {
  if !node_available() {
    eprintln!("skipping: node not on PATH");
    return;
  }

  let dir = harness_dir();
  let captured = run_harness(
    dir.path(),
    &[
      "--scenario", "call-chain",
      "--repeat", "3",
      "--warmup", "1",
      "--depth", "5",
      "--json",
    ],
  );

  assert!(captured.status.success());

  let lines = structured_lines(&captured.stdout);
  assert_eq!(lines.len(), 1);

  let output: HarnessOutput = serde_json::from_str(lines[0]).unwrap();
  assert_eq!(output.results.len(), 1);
  assert_eq!(output.results[0].name, "stub");

  match &output.results[0].measurement {
    effection_bench::schema::Measurement::Samples { samples } => {
      assert_eq!(samples.len(), 3);
      assert!(samples.iter().all(|s| s.is_finite() && *s >= 0.0));
    }
    other => panic!("expected raw samples, got {other:?}"),
  }
}
