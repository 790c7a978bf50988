//! Task Allocation & Risk Scoring Engine — deterministic, history-driven.
//!
//! Builds per-developer skill profiles from closed issues, recommends an
//! assignee for each unassigned open issue (skill overlap first, random-forest
//! fallback) and buckets open issues into low/medium/high risk.
//!
//! No network, no DB; the caller applies the results to its issue tracker.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod forest;
pub mod normalize;
pub mod profile;
pub mod recommend;
pub mod risk;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::{EngineError, ModelError};
pub use features::{featurize, TrainingSet};
pub use profile::{build_skill_profiles, SkillProfiles};
pub use recommend::recommend;
pub use risk::{classify_risk, predict_risk};
pub use types::{EngineInput, EngineOutput, FeatureVector, InboundIssue, Issue, RiskBucket};

/// Run the engine on a parsed request (no I/O).
///
/// Profiles and models are rebuilt from `input.history` on every call.
pub fn run(input: &EngineInput) -> Result<EngineOutput, EngineError> {
  let reference_time = normalize::parse_time(&input.reference_time, "reference_time")?;
  let history = normalize::normalize_all(&input.history, "history")?;
  let open_issues = normalize::normalize_all(&input.open_issues, "open_issues")?;

  let mut engine = Engine::new(input.config.clone().unwrap_or_default());
  engine.evaluate(reference_time, &history, &open_issues)
}
