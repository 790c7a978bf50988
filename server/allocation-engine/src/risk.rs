//! Risk bucketing: threshold labels for history, forest predictions for open
//! issues, and per-bucket tallies.

use std::sync::Arc;

use crate::cache::ForestCache;
use crate::config::Config;
use crate::features::{history_sample, TrainingSet};
use crate::forest::Forest;
use crate::types::{FeatureVector, Issue, RiskBucket, RiskCounts};

/// Ground-truth bucket for a closed issue, using the default thresholds.
pub fn classify_risk(days_to_close: u64, label_count: usize) -> RiskBucket {
  classify_risk_with(&Config::default(), days_to_close, label_count)
}

/// Ground-truth bucket for a closed issue. `high` is checked first.
pub fn classify_risk_with(config: &Config, days_to_close: u64, label_count: usize) -> RiskBucket {
  let days = i64::try_from(days_to_close).unwrap_or(i64::MAX);
  if days > config.risk_high_days || label_count > config.risk_high_labels {
    RiskBucket::High
  } else if days > config.risk_medium_days || label_count > config.risk_medium_labels {
    RiskBucket::Medium
  } else {
    RiskBucket::Low
  }
}

/// Training set of closed issues labeled by [`classify_risk_with`].
///
/// Malformed history is left out or clamped, with a note in `notes`.
pub fn risk_training_set(
  history: &[Issue],
  config: &Config,
  notes: &mut Vec<String>,
) -> TrainingSet<RiskBucket> {
  let mut set = TrainingSet::new();
  for issue in history {
    let Some(vector) = history_sample(issue, notes) else {
      continue;
    };
    // History vectors are taken at closing time, so age is days-to-close.
    let bucket = classify_risk_with(config, vector.age_days, issue.labels.len());
    set.push(vector, bucket);
  }
  set
}

/// Train the risk model, or `None` when the history cannot support one.
pub fn train_risk_model(
  set: &TrainingSet<RiskBucket>,
  models: &mut ForestCache<RiskBucket>,
) -> Option<Arc<Forest<RiskBucket>>> {
  if set.is_empty() {
    tracing::debug!("no closed history, risk left unscored");
    return None;
  }
  match models.get_or_fit(set) {
    Ok(forest) => Some(forest),
    Err(e) => {
      tracing::warn!(samples = set.len(), error = %e, "risk model unavailable");
      None
    }
  }
}

pub fn predict_risk(features: &FeatureVector, model: &Forest<RiskBucket>) -> RiskBucket {
  *model.predict(features)
}

/// Count predictions per bucket; `None` counts as unscored.
pub fn tally<I>(predictions: I) -> RiskCounts
where
  I: IntoIterator<Item = Option<RiskBucket>>,
{
  let mut counts = RiskCounts::default();
  for p in predictions {
    match p {
      Some(RiskBucket::High) => counts.high += 1,
      Some(RiskBucket::Medium) => counts.medium += 1,
      Some(RiskBucket::Low) => counts.low += 1,
      None => counts.unscored += 1,
    }
  }
  counts
}
