//! Random-forest regressor used as a non-linear benchmark.
//!
//! Seeded bootstrap samples feed variance-reduction CART trees with
//! per-split feature subsampling; predictions average over the ensemble and
//! feature importances accumulate the impurity (variance) decrease of every
//! split, normalized to sum to one.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::models::RegressionModel;

/// Hyper-parameters for the forest benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` means p/3 (regression default).
    pub mtry: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 12,
            min_samples_leaf: 5,
            mtry: None,
        }
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict_one(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// A fitted random-forest regressor.
#[derive(Debug, Clone)]
pub struct ForestRegressor {
    trees: Vec<TreeNode>,
    n_features: usize,
    /// Normalized variance-decrease importance per feature.
    pub importances: Vec<f64>,
}

impl ForestRegressor {
    /// Fit a forest on the given rows with an explicit seed. Each tree draws
    /// its own bootstrap sample from a per-tree RNG derived from the seed.
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        params: &ForestParams,
        seed: u64,
    ) -> Result<ForestRegressor, AnalysisError> {
        let n = x.nrows();
        let p = x.ncols();
        if n < 2 * params.min_samples_leaf {
            return Err(AnalysisError::InsufficientData {
                rows: n,
                required: 2 * params.min_samples_leaf,
            });
        }

        let mtry = params.mtry.unwrap_or_else(|| (p / 3).max(1)).min(p);

        let mut trees = Vec::with_capacity(params.n_trees);
        let mut importance_acc = vec![0.0; p];

        for t in 0..params.n_trees {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

            let tree = grow_tree(
                x,
                y,
                &sample,
                0,
                params,
                mtry,
                &mut rng,
                &mut importance_acc,
            );
            trees.push(tree);
        }

        let total: f64 = importance_acc.iter().sum();
        if total > 0.0 {
            for v in importance_acc.iter_mut() {
                *v /= total;
            }
        }

        Ok(ForestRegressor {
            trees,
            n_features: p,
            importances: importance_acc,
        })
    }
}

impl RegressionModel for ForestRegressor {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, AnalysisError> {
        self.check_schema(x)?;
        let n = x.nrows();
        let mut predictions = Array1::<f64>::zeros(n);
        let mut row_buf = vec![0.0; self.n_features];
        for i in 0..n {
            for (j, v) in row_buf.iter_mut().enumerate() {
                *v = x[(i, j)];
            }
            let sum: f64 = self.trees.iter().map(|t| t.predict_one(&row_buf)).sum();
            predictions[i] = sum / self.trees.len() as f64;
        }
        Ok(predictions)
    }

    fn n_inputs(&self) -> usize {
        self.n_features
    }

    fn name(&self) -> &str {
        "random-forest"
    }
}

fn mean_of(y: &Array1<f64>, rows: &[usize]) -> f64 {
    rows.iter().map(|&i| y[i]).sum::<f64>() / rows.len() as f64
}

fn sse_of(y: &Array1<f64>, rows: &[usize], mean: f64) -> f64 {
    rows.iter().map(|&i| (y[i] - mean).powi(2)).sum()
}

#[allow(clippy::too_many_arguments)]
fn grow_tree(
    x: &Array2<f64>,
    y: &Array1<f64>,
    rows: &[usize],
    depth: usize,
    params: &ForestParams,
    mtry: usize,
    rng: &mut StdRng,
    importance_acc: &mut [f64],
) -> TreeNode {
    let node_mean = mean_of(y, rows);
    if depth >= params.max_depth || rows.len() < 2 * params.min_samples_leaf {
        return TreeNode::Leaf { value: node_mean };
    }

    let node_sse = sse_of(y, rows, node_mean);
    if node_sse <= f64::EPSILON {
        return TreeNode::Leaf { value: node_mean };
    }

    let p = x.ncols();
    let mut candidates: Vec<usize> = (0..p).collect();
    // Partial Fisher-Yates draw of mtry distinct features.
    for i in 0..mtry {
        let j = rng.gen_range(i..p);
        candidates.swap(i, j);
    }

    let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, child sse)
    for &feature in candidates[..mtry].iter() {
        let mut ordered: Vec<usize> = rows.to_vec();
        ordered.sort_by(|&a, &b| {
            x[(a, feature)]
                .partial_cmp(&x[(b, feature)])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Prefix sums let every cut be scored in one pass.
        let total_sum: f64 = ordered.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = ordered.iter().map(|&i| y[i] * y[i]).sum();
        let n_total = ordered.len();

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for cut in 1..n_total {
            let idx = ordered[cut - 1];
            left_sum += y[idx];
            left_sq += y[idx] * y[idx];

            if cut < params.min_samples_leaf || n_total - cut < params.min_samples_leaf {
                continue;
            }
            let lo = x[(ordered[cut - 1], feature)];
            let hi = x[(ordered[cut], feature)];
            if lo == hi {
                continue;
            }

            let left_n = cut as f64;
            let right_n = (n_total - cut) as f64;
            let left_sse = left_sq - left_sum * left_sum / left_n;
            let right_sum = total_sum - left_sum;
            let right_sse = (total_sq - left_sq) - right_sum * right_sum / right_n;
            let child_sse = left_sse + right_sse;

            if best.map_or(true, |(_, _, b)| child_sse < b) {
                best = Some((feature, (lo + hi) / 2.0, child_sse));
            }
        }
    }

    let Some((feature, threshold, child_sse)) = best else {
        return TreeNode::Leaf { value: node_mean };
    };
    if child_sse >= node_sse {
        return TreeNode::Leaf { value: node_mean };
    }

    importance_acc[feature] += node_sse - child_sse;

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .partition(|&&i| x[(i, feature)] <= threshold);

    let left = grow_tree(x, y, &left_rows, depth + 1, params, mtry, rng, importance_acc);
    let right = grow_tree(x, y, &right_rows, depth + 1, params, mtry, rng, importance_acc);

    TreeNode::Split {
        feature,
        threshold,
        left: Box::new(left),
        right: Box::new(right),
    }
}
