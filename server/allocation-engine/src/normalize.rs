//! Normalize inbound issue records into canonical internal Issue models.

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::types::{InboundIssue, Issue};

/// Parse an RFC3339 timestamp, reporting `field` on failure.
pub fn parse_time(raw: &str, field: &str) -> Result<DateTime<Utc>, EngineError> {
  DateTime::parse_from_rfc3339(raw)
    .map(|t| t.with_timezone(&Utc))
    .map_err(|e| EngineError::validation(field, &format!("invalid RFC3339: {}", e)))
}

/// Parse timestamps and trim labels of an InboundIssue.
///
/// `context` prefixes reported field names (e.g. `history[3]`).
pub fn normalize(raw: &InboundIssue, context: &str) -> Result<Issue, EngineError> {
  let created_at = raw
    .created_at
    .as_deref()
    .map(|t| parse_time(t, &format!("{}.created_at", context)))
    .transpose()?;
  let closed_at = raw
    .closed_at
    .as_deref()
    .map(|t| parse_time(t, &format!("{}.closed_at", context)))
    .transpose()?;

  let labels = raw
    .labels
    .iter()
    .map(|l| l.trim())
    .filter(|l| !l.is_empty())
    .map(str::to_string)
    .collect();

  let assignee = raw
    .assignee
    .as_deref()
    .map(str::trim)
    .filter(|a| !a.is_empty())
    .map(str::to_string);

  Ok(Issue {
    id: raw.id,
    title: raw.title.clone(),
    body: raw.body.clone().unwrap_or_default(),
    labels,
    comments: raw.comments,
    created_at,
    closed_at,
    assignee,
  })
}

/// Normalize a whole collection, naming each entry `{name}[{index}]` in errors.
pub fn normalize_all(raw: &[InboundIssue], name: &str) -> Result<Vec<Issue>, EngineError> {
  raw
    .iter()
    .enumerate()
    .map(|(i, issue)| normalize(issue, &format!("{}[{}]", name, i)))
    .collect()
}
