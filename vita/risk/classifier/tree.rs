use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Growth bounds for a single tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum number of samples required to attempt a split.
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 24,
            min_samples_split: 2,
        }
    }
}

/// One node of a fitted tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal split: rows with `feature <= threshold` go left.
    Split {
        /// Column index the split tests.
        feature: usize,
        /// Split threshold (midpoint between adjacent observed values).
        threshold: f64,
        /// Index of the left child node.
        left: usize,
        /// Index of the right child node.
        right: usize,
    },
    /// Terminal node holding a class distribution.
    Leaf {
        /// Per-class probability, summing to 1.
        distribution: Vec<f64>,
    },
}

/// CART classification tree using Gini impurity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    class_count: usize,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Fits a tree over the sample indices drawn from `rows`/`labels`.
    ///
    /// `samples` may repeat indices (bootstrap draws). Per-feature
    /// impurity decreases are accumulated into the tree's importances,
    /// weighted by the fraction of samples reaching each split.
    #[must_use]
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        samples: &[usize],
        class_count: usize,
        params: TreeParams,
    ) -> Self {
        let dim = rows.first().map_or(0, Vec::len);
        let mut builder = TreeBuilder {
            rows,
            labels,
            class_count,
            params,
            total: samples.len() as f64,
            nodes: Vec::new(),
            importances: vec![0.0; dim],
        };
        builder.grow(samples.to_vec(), 0);
        Self {
            nodes: builder.nodes,
            class_count,
            importances: builder.importances,
        }
    }

    /// Class distribution at the leaf this row lands in.
    #[must_use]
    pub fn probabilities(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Majority class for the row.
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(self.probabilities(row))
    }

    /// Raw (unnormalized) per-feature impurity decreases.
    #[must_use]
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    /// Number of classes the tree was fit over.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.class_count
    }
}

/// Index of the largest value, first match winning ties.
#[must_use]
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [usize],
    class_count: usize,
    params: TreeParams,
    total: f64,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&indices);
        let node_gini = gini(&counts, indices.len());

        let splittable = depth < self.params.max_depth
            && indices.len() >= self.params.min_samples_split
            && node_gini > 0.0;
        let best = if splittable {
            self.best_split(&indices, &counts, node_gini)
        } else {
            None
        };

        let Some(split) = best else {
            let len = indices.len() as f64;
            let distribution = counts.iter().map(|c| *c as f64 / len).collect();
            self.nodes.push(TreeNode::Leaf { distribution });
            return self.nodes.len() - 1;
        };

        self.importances[split.feature] +=
            (indices.len() as f64 / self.total) * split.decrease;

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|idx| self.rows[*idx][split.feature] <= split.threshold);

        let slot = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            distribution: Vec::new(),
        });
        let left_idx = self.grow(left, depth + 1);
        let right_idx = self.grow(right, depth + 1);
        self.nodes[slot] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_idx,
            right: right_idx,
        };
        slot
    }

    fn best_split(
        &self,
        indices: &[usize],
        counts: &[usize],
        node_gini: f64,
    ) -> Option<BestSplit> {
        let dim = self.rows[indices[0]].len();
        let len = indices.len();
        let mut best: Option<BestSplit> = None;

        for feature in 0..dim {
            let mut order = indices.to_vec();
            order.sort_by(|a, b| {
                self.rows[*a][feature]
                    .partial_cmp(&self.rows[*b][feature])
                    .unwrap_or(Ordering::Equal)
            });

            let mut left_counts = vec![0usize; self.class_count];
            let mut right_counts = counts.to_vec();
            for boundary in 1..len {
                let moved = order[boundary - 1];
                left_counts[self.labels[moved]] += 1;
                right_counts[self.labels[moved]] -= 1;

                let prev = self.rows[moved][feature];
                let next = self.rows[order[boundary]][feature];
                if next - prev < 1e-12 {
                    continue;
                }

                let left_gini = gini(&left_counts, boundary);
                let right_gini = gini(&right_counts, len - boundary);
                let weighted = (boundary as f64 * left_gini
                    + (len - boundary) as f64 * right_gini)
                    / len as f64;
                let decrease = node_gini - weighted;
                if decrease > best.as_ref().map_or(1e-12, |b| b.decrease) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (prev + next) / 2.0,
                        decrease,
                    });
                }
            }
        }
        best
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.class_count];
        for idx in indices {
            counts[self.labels[*idx]] += 1;
        }
        counts
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|count| (*count as f64 / total).powi(2))
        .sum::<f64>()
}
