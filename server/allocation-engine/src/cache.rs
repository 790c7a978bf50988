//! Opt-in memoization of trained forests, keyed by a blake3 digest of the
//! training set and forest parameters.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ModelError;
use crate::features::TrainingSet;
use crate::forest::{ClassLabel, Forest, ForestParams};

/// Stable digest of everything that determines a trained forest.
pub fn training_key<T: ClassLabel>(set: &TrainingSet<T>, params: &ForestParams) -> blake3::Hash {
  let mut hasher = blake3::Hasher::new();
  hasher.update(&(params.trees as u64).to_le_bytes());
  hasher.update(&(params.max_depth as u64).to_le_bytes());
  hasher.update(&(params.min_samples_split as u64).to_le_bytes());
  hasher.update(&params.seed.to_le_bytes());
  for (features, target) in set.iter() {
    for value in features.to_array() {
      hasher.update(&value.to_le_bytes());
    }
    let label = target.to_string();
    hasher.update(&(label.len() as u64).to_le_bytes());
    hasher.update(label.as_bytes());
  }
  hasher.finalize()
}

/// Trains forests, reusing earlier results when enabled.
///
/// Disabled, every call retrains. Failed fits are never stored.
#[derive(Debug)]
pub struct ForestCache<T> {
  params: ForestParams,
  enabled: bool,
  entries: HashMap<blake3::Hash, Arc<Forest<T>>>,
  hits: u64,
}

impl<T: ClassLabel> ForestCache<T> {
  pub fn new(params: ForestParams, enabled: bool) -> Self {
    Self {
      params,
      enabled,
      entries: HashMap::new(),
      hits: 0,
    }
  }

  /// Retrain on every call.
  pub fn uncached(params: ForestParams) -> Self {
    Self::new(params, false)
  }

  pub fn hits(&self) -> u64 {
    self.hits
  }

  pub fn get_or_fit(&mut self, set: &TrainingSet<T>) -> Result<Arc<Forest<T>>, ModelError> {
    if !self.enabled {
      return Forest::fit(set, &self.params).map(Arc::new);
    }
    let key = training_key(set, &self.params);
    if let Some(forest) = self.entries.get(&key) {
      self.hits += 1;
      return Ok(Arc::clone(forest));
    }
    let forest = Arc::new(Forest::fit(set, &self.params)?);
    self.entries.insert(key, Arc::clone(&forest));
    Ok(forest)
  }
}
