use std::cmp::Ordering;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::MaxFeatures;
use crate::error::{NutriError, Result};
use crate::models::classifier_trait::ClassifierModel;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        /// Fraction of class-1 samples that reached this leaf.
        proba: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn predict_row(&self, x: &Array2<f64>, row: usize) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { proba } => return *proba,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[[row, *feature]] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let TreeNode::Split { left, right, .. } = &self.nodes[idx] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }
}

struct TreeParams {
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: usize,
}

struct SplitCandidate {
    impurity: f64,
    feature: usize,
    threshold: f64,
}

fn gini(positives: f64, total: f64) -> f64 {
    let p = positives / total;
    2.0 * p * (1.0 - p)
}

/// Exhaustive threshold search over a random subset of features, minimising
/// the weighted Gini impurity of the two children.
fn best_split(
    x: &Array2<f64>,
    y: &[u8],
    samples: &[usize],
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let n = samples.len() as f64;
    let total_pos = samples.iter().filter(|&&i| y[i] == 1).count() as f64;
    let candidates = rand::seq::index::sample(rng, x.ncols(), params.max_features);

    let mut best: Option<SplitCandidate> = None;
    let mut pairs: Vec<(f64, u8)> = Vec::with_capacity(samples.len());
    for feature in candidates.iter() {
        pairs.clear();
        pairs.extend(samples.iter().map(|&i| (x[[i, feature]], y[i])));
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut left_n = 0.0;
        let mut left_pos = 0.0;
        for w in 0..pairs.len() - 1 {
            left_n += 1.0;
            left_pos += pairs[w].1 as f64;
            let (current, next) = (pairs[w].0, pairs[w + 1].0);
            if current >= next {
                continue;
            }
            let right_n = n - left_n;
            let impurity =
                left_n * gini(left_pos, left_n) + right_n * gini(total_pos - left_pos, right_n);
            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mut threshold = current + (next - current) / 2.0;
                if threshold >= next {
                    threshold = current;
                }
                best = Some(SplitCandidate {
                    impurity,
                    feature,
                    threshold,
                });
            }
        }
    }
    best
}

fn grow_tree(x: &Array2<f64>, y: &[u8], samples: Vec<usize>, params: &TreeParams, rng: &mut StdRng) -> DecisionTree {
    let mut nodes = vec![TreeNode::Leaf { proba: 0.0 }];
    let mut stack = vec![(0usize, samples, 0usize)];

    while let Some((idx, samples, depth)) = stack.pop() {
        let positives = samples.iter().filter(|&&i| y[i] == 1).count();
        let proba = positives as f64 / samples.len() as f64;
        let splittable = samples.len() >= params.min_samples_split
            && positives > 0
            && positives < samples.len()
            && params.max_depth.map_or(true, |d| depth < d);

        let split = if splittable {
            best_split(x, y, &samples, params, rng)
        } else {
            None
        };

        match split {
            None => nodes[idx] = TreeNode::Leaf { proba },
            Some(split) => {
                let (left, right): (Vec<usize>, Vec<usize>) = samples
                    .into_iter()
                    .partition(|&i| x[[i, split.feature]] <= split.threshold);
                let left_idx = nodes.len();
                nodes.push(TreeNode::Leaf { proba: 0.0 });
                let right_idx = nodes.len();
                nodes.push(TreeNode::Leaf { proba: 0.0 });
                nodes[idx] = TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: left_idx,
                    right: right_idx,
                };
                stack.push((right_idx, right, depth + 1));
                stack.push((left_idx, left, depth + 1));
            }
        }
    }

    DecisionTree { nodes }
}

/// Bagged ensemble of CART trees with per-split feature subsampling.
///
/// Every tree gets its own seed drawn from `seed`, so the fitted forest is
/// identical across runs even though trees are grown in parallel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: MaxFeatures,
    seed: u64,
    trees: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    pub fn new(
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        max_features: MaxFeatures,
        seed: u64,
    ) -> Self {
        RandomForestClassifier {
            n_estimators,
            max_depth,
            min_samples_split: min_samples_split.max(2),
            max_features,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn probabilities(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(NutriError::NotFitted("random forest"));
        }
        let n_trees = self.trees.len() as f64;
        Ok((0..x.nrows())
            .map(|row| self.trees.iter().map(|t| t.predict_row(x, row)).sum::<f64>() / n_trees)
            .collect())
    }
}

impl ClassifierModel for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples == 0 || x.ncols() == 0 {
            return Err(NutriError::Data("cannot fit a forest on an empty matrix".to_string()));
        }
        if y.len() != n_samples {
            return Err(NutriError::Data(format!(
                "{} labels for {} feature rows",
                y.len(),
                n_samples
            )));
        }

        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: self.max_features.resolve(x.ncols()),
        };

        let mut master = StdRng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.n_estimators).map(|_| master.gen()).collect();

        self.trees = tree_seeds
            .into_par_iter()
            .map(|tree_seed| {
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let bootstrap: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                grow_tree(x, y, bootstrap, &params, &mut rng)
            })
            .collect();

        log::debug!(
            "Fitted random forest: {} trees, max depth {}",
            self.trees.len(),
            self.trees.iter().map(|t| t.depth()).max().unwrap_or(0)
        );
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>> {
        Ok(self
            .probabilities(x)?
            .into_iter()
            .map(|p| u8::from(p > 0.5))
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Vec<f64>>> {
        self.probabilities(x).map(Some)
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Array2<f64>, Vec<u8>) {
        let x = Array2::from_shape_vec(
            (8, 2),
            vec![
                0.1, 5.0, 0.2, 4.0, 0.3, 6.0, 0.4, 5.5, //
                1.1, 5.0, 1.2, 4.5, 1.3, 6.0, 1.4, 5.2,
            ],
        )
        .unwrap();
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn forest_learns_separable_data() {
        let (x, y) = separable();
        let mut rf = RandomForestClassifier::new(25, None, 2, MaxFeatures::All, 42);
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.predict(&x).unwrap(), y);
        let proba = rf.predict_proba(&x).unwrap().unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn same_seed_gives_same_probabilities() {
        let (x, y) = separable();
        let mut a = RandomForestClassifier::new(10, None, 2, MaxFeatures::Sqrt, 7);
        let mut b = RandomForestClassifier::new(10, None, 2, MaxFeatures::Sqrt, 7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn max_depth_is_respected() {
        let (x, y) = separable();
        let mut rf = RandomForestClassifier::new(5, Some(1), 2, MaxFeatures::All, 1);
        rf.fit(&x, &y).unwrap();
        assert!(rf.trees().iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn single_class_training_predicts_that_class() {
        let (x, _) = separable();
        let y = vec![1; 8];
        let mut rf = RandomForestClassifier::new(3, None, 2, MaxFeatures::Sqrt, 3);
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.predict(&x).unwrap(), y);
        assert!(rf.trees().iter().all(|t| t.n_nodes() == 1));
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let (x, _) = separable();
        let rf = RandomForestClassifier::new(3, None, 2, MaxFeatures::Sqrt, 3);
        assert!(matches!(rf.predict(&x), Err(NutriError::NotFitted(_))));
    }
}
