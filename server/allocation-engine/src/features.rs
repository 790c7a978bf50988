//! Issue featurization and training-set construction.

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::types::{FeatureVector, Issue};

/// Result of featurizing one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Featurized {
  pub vector: FeatureVector,
  /// Creation time was after the reference time; age was clamped to 0.
  pub clamped: bool,
}

/// Whole days from `from` to `to`, clamped at zero. The flag is set when
/// clamping happened.
pub fn whole_days(from: DateTime<Utc>, to: DateTime<Utc>) -> (u64, bool) {
  let days = (to - from).num_days();
  if to < from {
    (0, true)
  } else {
    (days as u64, false)
  }
}

/// Convert an issue into its feature vector as seen at `reference_time`.
///
/// Fails with `InvalidIssue` when `created_at` is missing.
pub fn featurize(issue: &Issue, reference_time: DateTime<Utc>) -> Result<Featurized, EngineError> {
  let created_at = issue
    .created_at
    .ok_or_else(|| EngineError::invalid_issue(issue.id, "created_at"))?;
  let (age_days, clamped) = whole_days(created_at, reference_time);

  let label_has = |needle: &str| issue.skill_tokens().any(|t| t.contains(needle));

  Ok(Featurized {
    vector: FeatureVector {
      label_count: issue.labels.len() as u64,
      comment_count: issue.comments,
      body_length: issue.body.chars().count() as u64,
      age_days,
      has_bug_label: label_has("bug"),
      has_feature_label: label_has("feature"),
    },
    clamped,
  })
}

/// Parallel feature/target sequences. Length equality is kept by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet<T> {
  features: Vec<FeatureVector>,
  targets: Vec<T>,
}

impl<T> Default for TrainingSet<T> {
  fn default() -> Self {
    Self {
      features: Vec::new(),
      targets: Vec::new(),
    }
  }
}

impl<T> TrainingSet<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, features: FeatureVector, target: T) {
    self.features.push(features);
    self.targets.push(target);
  }

  pub fn len(&self) -> usize {
    self.features.len()
  }

  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }

  pub fn features(&self) -> &[FeatureVector] {
    &self.features
  }

  pub fn targets(&self) -> &[T] {
    &self.targets
  }

  pub fn iter(&self) -> impl Iterator<Item = (&FeatureVector, &T)> {
    self.features.iter().zip(self.targets.iter())
  }
}

impl<T> FromIterator<(FeatureVector, T)> for TrainingSet<T> {
  fn from_iter<I: IntoIterator<Item = (FeatureVector, T)>>(iter: I) -> Self {
    let mut set = Self::new();
    for (f, t) in iter {
      set.push(f, t);
    }
    set
  }
}

/// Featurize a closed history issue as of its closing time, so the age
/// component is days-to-close.
///
/// Open issues give `None` silently. A closed issue without `created_at` is
/// left out of training and a note is pushed to `notes`; one closed before it
/// was created is kept with age 0, also with a note.
pub(crate) fn history_sample(issue: &Issue, notes: &mut Vec<String>) -> Option<FeatureVector> {
  let closed_at = issue.closed_at?;
  let Ok(f) = featurize(issue, closed_at) else {
    tracing::warn!(issue_id = issue.id, "history issue without created_at left out of training");
    let message = format!("history issue #{} has no created_at; excluded from training", issue.id);
    note(notes, message);
    return None;
  };
  if f.clamped {
    tracing::warn!(issue_id = issue.id, "history issue closed before creation, age clamped");
    let message = format!(
      "history issue #{} closed before it was created; age clamped to 0",
      issue.id
    );
    note(notes, message);
  }
  Some(f.vector)
}

fn note(notes: &mut Vec<String>, message: String) {
  if !notes.contains(&message) {
    notes.push(message);
  }
}

/// Training set mapping closed, assigned issues to their assignee.
///
/// Open or unassigned issues are skipped. Malformed history is reported
/// through `notes` (see [`history_sample`]).
pub fn assignment_training_set(history: &[Issue], notes: &mut Vec<String>) -> TrainingSet<String> {
  let mut set = TrainingSet::new();
  for issue in history {
    let Some(assignee) = issue.assignee.as_ref() else {
      continue;
    };
    if let Some(vector) = history_sample(issue, notes) {
      set.push(vector, assignee.clone());
    }
  }
  set
}
