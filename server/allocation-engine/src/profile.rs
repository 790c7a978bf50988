//! Per-developer skill histograms built from closed-issue labels.
//!
//! A profile is a lifetime count of how often each developer closed an issue
//! carrying a given (case-folded) label. No decay, no recency weighting.

use std::collections::{BTreeMap, HashMap};

use crate::types::Issue;

/// Skill counts for one developer, keyed by skill token.
pub type SkillCounts = BTreeMap<String, u64>;

/// Developer -> skill token -> count, remembering first-seen developer order.
///
/// Order only matters for tie-breaking in the recommender; equality ignores it.
#[derive(Debug, Clone, Default)]
pub struct SkillProfiles {
  order: Vec<String>,
  counts: HashMap<String, SkillCounts>,
}

impl SkillProfiles {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  /// Skill counts for `developer`, or `None` if they never closed an issue.
  pub fn get(&self, developer: &str) -> Option<&SkillCounts> {
    self.counts.get(developer)
  }

  /// Developers in first-seen order with their counts.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &SkillCounts)> {
    self
      .order
      .iter()
      .filter_map(|dev| self.counts.get(dev).map(|c| (dev.as_str(), c)))
  }

  /// Record one closed issue. Issues without an assignee contribute nothing.
  pub fn record(&mut self, issue: &Issue) {
    let Some(developer) = issue.assignee.as_deref() else {
      return;
    };
    let counts = self.entry(developer);
    for token in issue.skill_tokens() {
      *counts.entry(token).or_insert(0) += 1;
    }
  }

  /// Sum `other` into `self`. Developers new to `self` are appended in
  /// `other`'s order.
  pub fn merge(&mut self, other: &SkillProfiles) {
    for (developer, theirs) in other.iter() {
      let ours = self.entry(developer);
      for (token, n) in theirs {
        *ours.entry(token.clone()).or_insert(0) += n;
      }
    }
  }

  fn entry(&mut self, developer: &str) -> &mut SkillCounts {
    if !self.counts.contains_key(developer) {
      self.order.push(developer.to_string());
    }
    self.counts.entry(developer.to_string()).or_default()
  }
}

impl PartialEq for SkillProfiles {
  fn eq(&self, other: &Self) -> bool {
    self.counts == other.counts
  }
}

impl Eq for SkillProfiles {}

/// Build profiles from closed issues.
///
/// Callers pass closed issues only; an assignee with no labels still gets an
/// (empty) entry because they did close work.
pub fn build_skill_profiles<'a, I>(historical_closed: I) -> SkillProfiles
where
  I: IntoIterator<Item = &'a Issue>,
{
  let mut profiles = SkillProfiles::new();
  for issue in historical_closed {
    profiles.record(issue);
  }
  tracing::debug!(developers = profiles.len(), "built skill profiles");
  profiles
}
