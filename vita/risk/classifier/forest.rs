use anyhow::{bail, Result};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{argmax, DecisionTree, TreeParams};

/// Ensemble configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of bagged trees.
    pub trees: usize,
    /// Master seed; each tree derives its bootstrap seed from it.
    pub seed: u64,
    /// Per-tree growth bounds.
    pub tree: TreeParams,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: 100,
            seed: 42,
            tree: TreeParams::default(),
        }
    }
}

/// Bagged ensemble of CART trees voting over the risk classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskForest {
    trees: Vec<DecisionTree>,
    class_count: usize,
}

impl RiskForest {
    /// Fits the ensemble: each tree trains on a seeded bootstrap draw of
    /// the row set, so repeated runs with one seed are identical.
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        class_count: usize,
        params: ForestParams,
    ) -> Result<Self> {
        if rows.is_empty() {
            bail!("cannot fit a forest over an empty row set");
        }
        if rows.len() != labels.len() {
            bail!(
                "row/label count mismatch: {} rows, {} labels",
                rows.len(),
                labels.len()
            );
        }
        if params.trees == 0 {
            bail!("forest requires at least one tree");
        }

        let count = rows.len();
        let trees = (0..params.trees)
            .map(|tree_idx| {
                let mut rng = SmallRng::seed_from_u64(params.seed.wrapping_add(tree_idx as u64));
                let samples: Vec<usize> =
                    (0..count).map(|_| rng.gen_range(0..count)).collect();
                DecisionTree::fit(rows, labels, &samples, class_count, params.tree)
            })
            .collect();
        Ok(Self { trees, class_count })
    }

    /// Per-class probability as the fraction of tree votes, summing to 1.
    #[must_use]
    pub fn probabilities(&self, row: &[f64]) -> Vec<f64> {
        let mut votes = vec![0usize; self.class_count];
        for tree in &self.trees {
            votes[tree.predict(row)] += 1;
        }
        let total = self.trees.len() as f64;
        votes.iter().map(|count| *count as f64 / total).collect()
    }

    /// Majority class over the ensemble.
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.probabilities(row))
    }

    /// Per-feature importance summed over trees and normalized to sum 1.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let dim = self
            .trees
            .first()
            .map_or(0, |tree| tree.importances().len());
        let mut totals = vec![0.0; dim];
        for tree in &self.trees {
            for (total, value) in totals.iter_mut().zip(tree.importances()) {
                *total += value;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            for total in &mut totals {
                *total /= sum;
            }
        }
        totals
    }

    /// Number of trees in the ensemble.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}
