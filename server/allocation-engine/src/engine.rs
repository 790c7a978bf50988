//! Core engine: rebuilds profiles and models from history, then scores open issues.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::cache::ForestCache;
use crate::config::Config;
use crate::error::EngineError;
use crate::features::{assignment_training_set, featurize};
use crate::forest::ForestParams;
use crate::profile::build_skill_profiles;
use crate::recommend::recommend;
use crate::risk::{predict_risk, risk_training_set, tally, train_risk_model};
use crate::types::*;

/// The allocation engine. Holds configuration and (optionally) trained models.
pub struct Engine {
  config: Config,
  assignment_models: ForestCache<String>,
  risk_models: ForestCache<RiskBucket>,
}

impl Engine {
  pub fn new(config: Config) -> Self {
    let params = ForestParams::from(&config);
    Self {
      assignment_models: ForestCache::new(params, config.cache_models),
      risk_models: ForestCache::new(params, config.cache_models),
      config,
    }
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default())
  }

  /// Score every open issue against `history`.
  ///
  /// Nothing is carried over from earlier calls except cached forests, which
  /// only exist when `cache_models` is set and do not change results.
  pub fn evaluate(
    &mut self,
    reference_time: DateTime<Utc>,
    history: &[Issue],
    open_issues: &[Issue],
  ) -> Result<EngineOutput, EngineError> {
    let profiles = build_skill_profiles(history.iter().filter(|i| i.is_closed()));
    // Both builders see the same history; a note is only recorded once.
    let mut warnings = Vec::new();
    let assignment_set = assignment_training_set(history, &mut warnings);
    let risk_set = risk_training_set(history, &self.config, &mut warnings);
    let risk_model = train_risk_model(&risk_set, &mut self.risk_models);

    let mut assignments = Vec::new();
    let mut risk_details = Vec::with_capacity(open_issues.len());
    let mut workload: BTreeMap<String, u64> = BTreeMap::new();

    for issue in open_issues {
      let features = featurize(issue, reference_time)?;
      if features.clamped {
        tracing::warn!(issue = issue.id, "created after reference time; age clamped to 0");
        warnings.push(format!(
          "issue #{} created after reference time; age clamped to 0",
          issue.id
        ));
      }

      let predicted_risk = risk_model.as_deref().map(|m| predict_risk(&features.vector, m));
      risk_details.push(RiskDetail {
        issue_id: issue.id,
        title: issue.title.clone(),
        predicted_risk,
      });

      match &issue.assignee {
        Some(assignee) => *workload.entry(assignee.clone()).or_insert(0) += 1,
        None => {
          let rec = recommend(
            issue,
            &profiles,
            &assignment_set,
            reference_time,
            &mut self.assignment_models,
          )?;
          assignments.push(AssignmentOutput {
            issue_id: issue.id,
            title: issue.title.clone(),
            assigned_to: rec.as_ref().map(|r| r.developer.clone()),
            strategy: rec.as_ref().map(|r| r.strategy),
            score: rec.and_then(|r| r.score),
          });
        }
      }
    }

    let risk_assessment = tally(risk_details.iter().map(|d| d.predicted_risk));
    tracing::info!(
      developers = profiles.len(),
      assignment_samples = assignment_set.len(),
      risk_samples = risk_set.len(),
      open = open_issues.len(),
      recommended = assignments.iter().filter(|a| a.assigned_to.is_some()).count(),
      high = risk_assessment.high,
      "evaluation complete"
    );

    Ok(EngineOutput {
      generated_at: reference_time.to_rfc3339(),
      developers_profiled: profiles.len(),
      assignment_samples: assignment_set.len(),
      risk_samples: risk_set.len(),
      assignments,
      risk_assessment,
      risk_details,
      workload,
      warnings,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(n)
  }

  fn issue(
    id: u64,
    labels: &[&str],
    assignee: Option<&str>,
    created: i64,
    closed: Option<i64>,
  ) -> Issue {
    Issue {
      id,
      title: format!("issue {}", id),
      body: "body".into(),
      labels: labels.iter().map(|l| l.to_string()).collect(),
      comments: 0,
      created_at: Some(day(created)),
      closed_at: closed.map(day),
      assignee: assignee.map(str::to_string),
    }
  }

  fn history() -> Vec<Issue> {
    vec![
      issue(1, &["backend"], Some("alice"), 0, Some(3)),
      issue(2, &["frontend"], Some("bob"), 0, Some(70)),
      issue(3, &["backend", "db"], Some("alice"), 5, Some(9)),
      issue(4, &["frontend", "ui", "a11y", "css"], Some("bob"), 10, Some(50)),
      // Open issues in the history feed are ignored.
      issue(5, &["backend"], Some("carol"), 0, None),
    ]
  }

  #[test]
  fn unassigned_open_issues_get_recommendations() {
    let mut engine = Engine::with_defaults();
    let open = vec![
      issue(10, &["Backend"], None, 95, None),
      issue(11, &["frontend"], Some("bob"), 90, None),
    ];
    let out = engine.evaluate(day(100), &history(), &open).unwrap();

    assert_eq!(out.developers_profiled, 2);
    assert_eq!(out.assignment_samples, 4);
    assert_eq!(out.risk_samples, 4);
    assert_eq!(out.assignments.len(), 1);
    assert_eq!(out.assignments[0].assigned_to.as_deref(), Some("alice"));
    assert_eq!(out.assignments[0].strategy, Some(Strategy::SkillOverlap));
    assert_eq!(out.workload.get("bob"), Some(&1));
    assert_eq!(out.risk_details.len(), 2);
    let c = &out.risk_assessment;
    assert_eq!(c.high + c.medium + c.low + c.unscored, 2);
    assert_eq!(c.unscored, 0);
  }

  #[test]
  fn empty_history_is_not_an_error() {
    let mut engine = Engine::with_defaults();
    let open = vec![issue(10, &["backend"], None, 0, None)];
    let out = engine.evaluate(day(1), &[], &open).unwrap();
    assert_eq!(out.assignments[0].assigned_to, None);
    assert_eq!(out.risk_assessment.unscored, 1);
    assert_eq!(out.risk_details[0].predicted_risk, None);
  }

  #[test]
  fn future_created_issue_is_warned_not_rejected() {
    let mut engine = Engine::with_defaults();
    let open = vec![issue(10, &[], Some("alice"), 30, None)];
    let out = engine.evaluate(day(1), &history(), &open).unwrap();
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].contains("#10"));
  }

  #[test]
  fn malformed_history_is_excluded_not_fatal() {
    let mut engine = Engine::with_defaults();
    let mut undated = issue(2, &["frontend"], Some("bob"), 0, Some(4));
    undated.created_at = None;
    let history = vec![issue(1, &["backend"], Some("alice"), 0, Some(3)), undated];
    let open = vec![issue(10, &["backend"], None, 5, None)];

    let out = engine.evaluate(day(10), &history, &open).unwrap();
    assert_eq!(out.assignments[0].assigned_to.as_deref(), Some("alice"));
    assert_eq!(out.assignment_samples, 1);
    assert_eq!(out.risk_samples, 1);
    // Both training sets skip #2, but it is reported once.
    assert_eq!(out.warnings, ["history issue #2 has no created_at; excluded from training"]);
  }

  #[test]
  fn history_closed_before_creation_is_warned() {
    let mut engine = Engine::with_defaults();
    let history = vec![issue(3, &["backend"], None, 31, Some(1))];
    let open = vec![issue(10, &["backend"], None, 40, None)];

    let out = engine.evaluate(day(45), &history, &open).unwrap();
    assert_eq!(out.risk_samples, 1);
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].contains("#3 closed before it was created"));
  }

  #[test]
  fn open_issue_without_created_at_fails() {
    let mut engine = Engine::with_defaults();
    let mut bad = issue(10, &["backend"], None, 0, None);
    bad.created_at = None;
    let err = engine.evaluate(day(1), &history(), &[bad]).unwrap_err();
    assert!(err.to_string().contains("created_at"));
  }

  #[test]
  fn cached_and_uncached_runs_agree() {
    let open = vec![
      issue(10, &["security"], None, 95, None),
      issue(11, &["mobile"], None, 60, None),
    ];
    let mut plain = Engine::with_defaults();
    let mut cached = Engine::new(Config {
      cache_models: true,
      ..Config::default()
    });
    let a = serde_json::to_string(&plain.evaluate(day(100), &history(), &open).unwrap()).unwrap();
    let b = serde_json::to_string(&cached.evaluate(day(100), &history(), &open).unwrap()).unwrap();
    assert_eq!(a, b);
    // Second call reuses the trained forests.
    cached.evaluate(day(100), &history(), &open).unwrap();
    assert!(cached.assignment_models.hits() > 0);
    assert!(cached.risk_models.hits() > 0);
  }
}
