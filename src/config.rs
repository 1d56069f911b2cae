use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// On-disk configuration supplying defaults the CLI does not override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BenchConfig {
  /// Releases covered by scheduled campaigns. Unused for single-release
  /// runs, where the release comes from the command line.
  pub effection_versions: Vec<String>,
  pub comparison_libraries: ComparisonLibraries,
}

/// Pinned versions of the libraries effection is compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonLibraries {
  pub rxjs: String,
  pub effect: String,
  pub co: String,
}

impl Default for ComparisonLibraries {
  fn default() -> Self {
    Self {
      rxjs: "7.8.1".to_string(),
      effect: "3.3.2".to_string(),
      co: "4.6.0".to_string(),
    }
  }
}

impl BenchConfig {
  pub fn load(path: &Path) -> Result<Self> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;

    serde_json::from_str(&raw).with_context(|| format!("parse {path:?}"))
  }

  pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
    match path {
      Some(path) => Self::load(path),
      None => Ok(Self::default()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_camel_case_config() {
    let raw = r#"{
      "effectionVersions": ["3.0.0", "3.1.0"],
      "comparisonLibraries": { "rxjs": "8.0.0", "effect": "3.5.0", "co": "4.6.0" }
    }"#;

    let config: BenchConfig = serde_json::from_str(raw).unwrap();

    assert_eq!(config.effection_versions, vec!["3.0.0", "3.1.0"]);
    assert_eq!(config.comparison_libraries.rxjs, "8.0.0");
    assert_eq!(config.comparison_libraries.effect, "3.5.0");
  }

  #[test]
  fn missing_fields_fall_back_to_defaults() {
    let config: BenchConfig = serde_json::from_str("{}").unwrap();

    assert!(config.effection_versions.is_empty());
    assert_eq!(config.comparison_libraries, ComparisonLibraries::default());
  }

  #[test]
  fn no_path_means_defaults() {
    let config = BenchConfig::load_or_default(None).unwrap();

    assert_eq!(config.comparison_libraries, ComparisonLibraries::default());
  }
}
