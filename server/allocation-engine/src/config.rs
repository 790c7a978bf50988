//! Engine configuration with sane defaults.

use serde::Deserialize;

/// Tunable thresholds and model parameters.
///
/// Every field has a default, so a request may override any subset:
/// `{"config": {"risk_high_days": 90}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Days-to-close strictly above this is `high` risk.
  pub risk_high_days: i64,
  /// Label count strictly above this is `high` risk.
  pub risk_high_labels: usize,
  /// Days-to-close strictly above this is `medium` risk.
  pub risk_medium_days: i64,
  /// Label count strictly above this is `medium` risk.
  pub risk_medium_labels: usize,
  /// Number of trees in each random forest.
  pub forest_trees: usize,
  /// Maximum depth of a single tree (root is depth 0).
  pub forest_max_depth: usize,
  /// A node with fewer samples than this becomes a leaf.
  pub forest_min_samples_split: usize,
  /// Seed for bootstrap sampling and feature subsampling.
  pub forest_seed: u64,
  /// Reuse trained forests for identical training sets within one engine.
  pub cache_models: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      risk_high_days: 60,
      risk_high_labels: 5,
      risk_medium_days: 30,
      risk_medium_labels: 3,
      forest_trees: 100,
      forest_max_depth: 8,
      forest_min_samples_split: 2,
      forest_seed: 42,
      cache_models: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_override_keeps_other_defaults() {
    let config: Config =
      serde_json::from_str(r#"{"risk_high_days": 90, "cache_models": true}"#).unwrap();
    assert_eq!(config.risk_high_days, 90);
    assert!(config.cache_models);
    assert_eq!(config.risk_medium_days, 30);
    assert_eq!(config.forest_trees, 100);
  }
}
