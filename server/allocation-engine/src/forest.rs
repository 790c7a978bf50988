//! Small deterministic random-forest classifier.
//!
//! CART trees on Gini impurity, each grown on a bootstrap sample with a random
//! subset of features considered at every split. All randomness comes from a
//! blake3 output stream keyed by (seed, tree index), so a fixed training set
//! and seed always yield the same forest.

use std::collections::BTreeSet;
use std::fmt;

use crate::config::Config;
use crate::error::ModelError;
use crate::features::TrainingSet;
use crate::types::{FeatureVector, FEATURE_COUNT};

/// Anything usable as a class label.
pub trait ClassLabel: Clone + Ord + fmt::Display {}

impl<T: Clone + Ord + fmt::Display> ClassLabel for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForestParams {
  pub trees: usize,
  pub max_depth: usize,
  pub min_samples_split: usize,
  pub seed: u64,
}

impl From<&Config> for ForestParams {
  fn from(config: &Config) -> Self {
    Self {
      trees: config.forest_trees.max(1),
      max_depth: config.forest_max_depth,
      min_samples_split: config.forest_min_samples_split.max(2),
      seed: config.forest_seed,
    }
  }
}

impl Default for ForestParams {
  fn default() -> Self {
    Self::from(&Config::default())
  }
}

#[derive(Debug, Clone)]
enum Node {
  Leaf(usize),
  Split {
    feature: usize,
    threshold: f64,
    left: Box<Node>,
    right: Box<Node>,
  },
}

impl Node {
  fn classify(&self, x: &[f64; FEATURE_COUNT]) -> usize {
    let mut node = self;
    loop {
      match node {
        Node::Leaf(class) => return *class,
        Node::Split {
          feature,
          threshold,
          left,
          right,
        } => {
          node = if x[*feature] <= *threshold { left } else { right };
        }
      }
    }
  }
}

/// Deterministic pseudo-random stream.
struct Stream(blake3::OutputReader);

impl Stream {
  fn new(seed: u64, tree: usize) -> Self {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"forest|");
    hasher.update(&seed.to_le_bytes());
    hasher.update(b"|");
    hasher.update(&(tree as u64).to_le_bytes());
    Self(hasher.finalize_xof())
  }

  /// Uniform draw from `0..n`. Draws at or above the largest multiple of `n`
  /// are discarded, so no residue is favored.
  fn below(&mut self, n: usize) -> usize {
    let n = n as u64;
    let zone = u64::MAX - u64::MAX % n;
    loop {
      let mut buf = [0u8; 8];
      self.0.fill(&mut buf);
      let v = u64::from_le_bytes(buf);
      if v < zone {
        return (v % n) as usize;
      }
    }
  }
}

/// Training data in index form, shared by every tree.
struct Samples<'a> {
  x: &'a [[f64; FEATURE_COUNT]],
  y: &'a [usize],
  classes: usize,
}

#[derive(Debug, Clone)]
pub struct Forest<T> {
  classes: Vec<T>,
  trees: Vec<Node>,
}

impl<T: ClassLabel> Forest<T> {
  /// Train a forest.
  ///
  /// Rejects an empty set and a set with a single distinct target.
  pub fn fit(set: &TrainingSet<T>, params: &ForestParams) -> Result<Self, ModelError> {
    if set.is_empty() {
      return Err(ModelError::EmptyTrainingSet);
    }
    let classes: Vec<T> = set
      .targets()
      .iter()
      .cloned()
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();
    if classes.len() == 1 {
      return Err(ModelError::SingleClass {
        class: classes[0].to_string(),
      });
    }

    let x: Vec<[f64; FEATURE_COUNT]> = set.features().iter().map(FeatureVector::to_array).collect();
    let y: Vec<usize> = set
      .targets()
      .iter()
      .map(|t| classes.binary_search(t).unwrap_or(0))
      .collect();
    let samples = Samples {
      x: &x,
      y: &y,
      classes: classes.len(),
    };

    let n = set.len();
    let trees = (0..params.trees)
      .map(|t| {
        let mut stream = Stream::new(params.seed, t);
        let bootstrap: Vec<usize> = (0..n).map(|_| stream.below(n)).collect();
        grow(&samples, &bootstrap, 0, params, &mut stream)
      })
      .collect();

    tracing::debug!(samples = n, classes = classes.len(), trees = params.trees, "fitted forest");
    Ok(Self { classes, trees })
  }

  /// Majority vote over all trees; ties go to the smallest label.
  pub fn predict(&self, features: &FeatureVector) -> &T {
    let x = features.to_array();
    let mut votes = vec![0usize; self.classes.len()];
    for tree in &self.trees {
      votes[tree.classify(&x)] += 1;
    }
    &self.classes[argmax(&votes)]
  }

  pub fn classes(&self) -> &[T] {
    &self.classes
  }
}

/// Index of the largest count; earliest index wins ties.
fn argmax(counts: &[usize]) -> usize {
  let mut best = 0;
  for (i, &c) in counts.iter().enumerate() {
    if c > counts[best] {
      best = i;
    }
  }
  best
}

fn gini(counts: &[usize], total: usize) -> f64 {
  if total == 0 {
    return 0.0;
  }
  let total = total as f64;
  1.0 - counts.iter().map(|&c| (c as f64 / total).powi(2)).sum::<f64>()
}

fn grow(
  samples: &Samples<'_>,
  idx: &[usize],
  depth: usize,
  params: &ForestParams,
  stream: &mut Stream,
) -> Node {
  let mut counts = vec![0usize; samples.classes];
  for &i in idx {
    counts[samples.y[i]] += 1;
  }
  let majority = argmax(&counts);
  let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
  if pure || depth >= params.max_depth || idx.len() < params.min_samples_split {
    return Node::Leaf(majority);
  }

  let Some((feature, threshold)) = best_split(samples, idx, &counts, stream) else {
    return Node::Leaf(majority);
  };

  let (left, right): (Vec<usize>, Vec<usize>) = idx
    .iter()
    .copied()
    .partition(|&i| samples.x[i][feature] <= threshold);
  Node::Split {
    feature,
    threshold,
    left: Box::new(grow(samples, &left, depth + 1, params, stream)),
    right: Box::new(grow(samples, &right, depth + 1, params, stream)),
  }
}

/// Best (feature, threshold) among a random subset of ⌈√d⌉ features, or
/// `None` when no feature lowers impurity.
///
/// Features are visited in a shuffled order; the search continues past the
/// subset size until at least one usable split has been found.
fn best_split(
  samples: &Samples<'_>,
  idx: &[usize],
  counts: &[usize],
  stream: &mut Stream,
) -> Option<(usize, f64)> {
  let n = idx.len();
  let parent = gini(counts, n);
  let tried = (FEATURE_COUNT as f64).sqrt().ceil() as usize;

  let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
  for i in 0..FEATURE_COUNT - 1 {
    let j = i + stream.below(FEATURE_COUNT - i);
    features.swap(i, j);
  }

  let mut best: Option<(usize, f64, f64)> = None;
  for (visited, &f) in features.iter().enumerate() {
    if visited >= tried && best.is_some() {
      break;
    }
    let mut order = idx.to_vec();
    order.sort_by(|&a, &b| samples.x[a][f].total_cmp(&samples.x[b][f]));

    let mut left = vec![0usize; samples.classes];
    let mut right = counts.to_vec();
    for k in 0..n - 1 {
      let class = samples.y[order[k]];
      left[class] += 1;
      right[class] -= 1;

      let here = samples.x[order[k]][f];
      let next = samples.x[order[k + 1]][f];
      if here == next {
        continue;
      }
      let (nl, nr) = (k + 1, n - k - 1);
      let score = (nl as f64 * gini(&left, nl) + nr as f64 * gini(&right, nr)) / n as f64;
      if score < parent - 1e-12 && best.map_or(true, |(_, _, s)| score < s - 1e-12) {
        best = Some((f, (here + next) / 2.0, score));
      }
    }
  }
  best.map(|(f, t, _)| (f, t))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn vector(label_count: u64, age_days: u64, bug: bool) -> FeatureVector {
    FeatureVector {
      label_count,
      comment_count: 0,
      body_length: 100,
      age_days,
      has_bug_label: bug,
      has_feature_label: false,
    }
  }

  fn two_groups() -> TrainingSet<String> {
    let mut set = TrainingSet::new();
    for age in 0..6 {
      set.push(vector(1, age, true), "alice".to_string());
      set.push(vector(4, 50 + age, false), "bob".to_string());
    }
    set
  }

  #[test]
  fn empty_set_is_rejected() {
    let set: TrainingSet<String> = TrainingSet::new();
    let err = Forest::fit(&set, &ForestParams::default()).unwrap_err();
    assert_eq!(err, ModelError::EmptyTrainingSet);
  }

  #[test]
  fn single_class_is_rejected() {
    let mut set = TrainingSet::new();
    set.push(vector(1, 1, true), "alice".to_string());
    set.push(vector(2, 9, false), "alice".to_string());
    let err = Forest::fit(&set, &ForestParams::default()).unwrap_err();
    assert_eq!(err, ModelError::SingleClass { class: "alice".into() });
  }

  #[test]
  fn separable_groups_are_learned() {
    let forest = Forest::fit(&two_groups(), &ForestParams::default()).unwrap();
    assert_eq!(forest.classes(), &["alice".to_string(), "bob".to_string()]);
    assert_eq!(forest.predict(&vector(1, 2, true)), "alice");
    assert_eq!(forest.predict(&vector(4, 55, false)), "bob");
  }

  #[test]
  fn same_seed_same_predictions() {
    let params = ForestParams {
      trees: 15,
      ..ForestParams::default()
    };
    let a = Forest::fit(&two_groups(), &params).unwrap();
    let b = Forest::fit(&two_groups(), &params).unwrap();
    for v in [vector(2, 20, true), vector(3, 30, false), vector(0, 0, false)] {
      assert_eq!(a.predict(&v), b.predict(&v));
    }
  }

  #[test]
  fn identical_features_vote_for_the_majority() {
    let mut set = TrainingSet::new();
    for _ in 0..3 {
      set.push(vector(1, 1, false), "bob".to_string());
    }
    set.push(vector(1, 1, false), "alice".to_string());
    let forest = Forest::fit(&set, &ForestParams::default()).unwrap();
    assert_eq!(forest.predict(&vector(1, 1, false)), "bob");
  }

  #[test]
  fn stream_draws_are_in_range_and_repeatable() {
    let mut a = Stream::new(7, 3);
    let mut b = Stream::new(7, 3);
    let mut seen = [false; 6];
    for _ in 0..200 {
      let v = a.below(6);
      assert!(v < 6);
      assert_eq!(v, b.below(6));
      seen[v] = true;
    }
    assert!(seen.iter().all(|&s| s));
    assert_eq!(a.below(1), 0);
  }

  #[test]
  fn argmax_prefers_earliest_on_tie() {
    assert_eq!(argmax(&[2, 3, 3]), 1);
    assert_eq!(argmax(&[0, 0]), 0);
  }
}
