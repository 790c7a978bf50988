//! Structured error types for the allocation engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  /// The issue lacks a field the featurizer needs. Never zero-filled.
  #[error("invalid issue #{issue_id}: missing {field}")]
  InvalidIssue { issue_id: u64, field: &'static str },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn invalid_issue(issue_id: u64, field: &'static str) -> Self {
    Self::InvalidIssue { issue_id, field }
  }

  /// Field name to report alongside the error, when there is one.
  pub fn field(&self) -> Option<String> {
    match self {
      Self::Validation { field, .. } => Some(field.clone()),
      Self::InvalidIssue { field, .. } => Some((*field).to_string()),
      Self::Json(_) => None,
    }
  }
}

/// Classifier construction failures. Always caught by the callers of
/// [`crate::forest::Forest::fit`] and turned into "no prediction".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
  #[error("training set is empty")]
  EmptyTrainingSet,

  #[error("training set has a single class: {class}")]
  SingleClass { class: String },
}
