//! Assignee recommendation: direct skill overlap first, classifier fallback.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::cache::ForestCache;
use crate::error::EngineError;
use crate::features::{featurize, TrainingSet};
use crate::profile::SkillProfiles;
use crate::types::{Issue, Recommendation, Strategy};

/// Developer with the highest skill-overlap score for `issue`.
///
/// Score = sum of the developer's counts over the issue's distinct skill
/// tokens. Returns `None` unless some developer scores above zero. Ties go to
/// the developer seen first in the profiles.
pub fn skill_overlap(issue: &Issue, profiles: &SkillProfiles) -> Option<(String, u64)> {
  let tokens: BTreeSet<String> = issue.skill_tokens().collect();
  let mut best: Option<(&str, u64)> = None;

  for (developer, counts) in profiles.iter() {
    let score: u64 = tokens.iter().filter_map(|t| counts.get(t)).sum();
    if score > 0 && best.map_or(true, |(_, top)| score > top) {
      best = Some((developer, score));
    }
  }

  best.map(|(dev, score)| (dev.to_string(), score))
}

/// Recommend an assignee for `issue`.
///
/// Falls back to a forest trained on `training_set` (features as of
/// `reference_time`) when no developer has overlapping skills. Classifier
/// construction failures yield `Ok(None)`; an issue that cannot be featurized
/// for the fallback is an error.
pub fn recommend(
  issue: &Issue,
  profiles: &SkillProfiles,
  training_set: &TrainingSet<String>,
  reference_time: DateTime<Utc>,
  models: &mut ForestCache<String>,
) -> Result<Option<Recommendation>, EngineError> {
  if let Some((developer, score)) = skill_overlap(issue, profiles) {
    tracing::debug!(issue = issue.id, %developer, score, "skill overlap match");
    return Ok(Some(Recommendation {
      developer,
      strategy: Strategy::SkillOverlap,
      score: Some(score),
    }));
  }

  if training_set.is_empty() {
    tracing::debug!(issue = issue.id, "no overlap and no training data");
    return Ok(None);
  }

  let features = featurize(issue, reference_time)?;
  let forest = match models.get_or_fit(training_set) {
    Ok(forest) => forest,
    Err(e) => {
      tracing::warn!(issue = issue.id, error = %e, "assignment model unavailable");
      return Ok(None);
    }
  };

  let developer = forest.predict(&features.vector).clone();
  tracing::debug!(issue = issue.id, %developer, "classifier match");
  Ok(Some(Recommendation {
    developer,
    strategy: Strategy::Classifier,
    score: None,
  }))
}
