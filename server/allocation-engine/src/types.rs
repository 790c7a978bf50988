//! Core types for the allocation engine (JSON contracts + internal models).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;

// ---------------------------------------------------------------------------
// Inbound types (JSON contract — what the caller sends)
// ---------------------------------------------------------------------------

/// One request object from stdin. Unknown fields are silently ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineInput {
  pub reference_time: String,
  #[serde(default)]
  pub history: Vec<InboundIssue>,
  #[serde(default)]
  pub open_issues: Vec<InboundIssue>,
  #[serde(default)]
  pub config: Option<Config>,
}

/// Issue record as exported by the tracker client.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundIssue {
  pub id: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub body: Option<String>,
  #[serde(default)]
  pub labels: Vec<String>,
  #[serde(default)]
  pub comments: u64,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub closed_at: Option<String>,
  #[serde(default)]
  pub assignee: Option<String>,
}

// ---------------------------------------------------------------------------
// Internal normalized types
// ---------------------------------------------------------------------------

/// Canonical issue record after timestamp parsing.
///
/// `created_at` stays optional here: whether its absence is fatal depends on
/// whether the issue is ever featurized.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
  pub id: u64,
  pub title: String,
  pub body: String,
  pub labels: Vec<String>,
  pub comments: u64,
  pub created_at: Option<DateTime<Utc>>,
  pub closed_at: Option<DateTime<Utc>>,
  pub assignee: Option<String>,
}

impl Issue {
  /// Case-folded label names, in label order.
  pub fn skill_tokens(&self) -> impl Iterator<Item = String> + '_ {
    self.labels.iter().map(|l| l.to_lowercase())
  }

  pub fn is_closed(&self) -> bool {
    self.closed_at.is_some()
  }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

pub const FEATURE_COUNT: usize = 6;

/// Fixed-order numeric description of an issue.
///
/// Order: label_count, comment_count, body_length, age_days, has_bug_label,
/// has_feature_label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureVector {
  pub label_count: u64,
  pub comment_count: u64,
  pub body_length: u64,
  pub age_days: u64,
  pub has_bug_label: bool,
  pub has_feature_label: bool,
}

impl FeatureVector {
  pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
    [
      self.label_count as f64,
      self.comment_count as f64,
      self.body_length as f64,
      self.age_days as f64,
      if self.has_bug_label { 1.0 } else { 0.0 },
      if self.has_feature_label { 1.0 } else { 0.0 },
    ]
  }
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBucket {
  Low,
  Medium,
  High,
}

impl RiskBucket {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
    }
  }
}

impl fmt::Display for RiskBucket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
  SkillOverlap,
  Classifier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
  pub developer: String,
  pub strategy: Strategy,
  /// Overlap score; `None` for classifier picks.
  pub score: Option<u64>,
}

// ---------------------------------------------------------------------------
// Output types (JSON contract — what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutput {
  pub issue_id: u64,
  pub title: String,
  pub assigned_to: Option<String>,
  pub strategy: Option<Strategy>,
  pub score: Option<u64>,
}

/// Per-bucket counts over open issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
  pub high: u64,
  pub medium: u64,
  pub low: u64,
  /// Issues for which no risk model could be built.
  pub unscored: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskDetail {
  pub issue_id: u64,
  pub title: String,
  pub predicted_risk: Option<RiskBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineOutput {
  pub generated_at: String,
  pub developers_profiled: usize,
  pub assignment_samples: usize,
  pub risk_samples: usize,
  pub assignments: Vec<AssignmentOutput>,
  pub risk_assessment: RiskCounts,
  pub risk_details: Vec<RiskDetail>,
  pub workload: BTreeMap<String, u64>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for an invalid request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
