//! L1-regularized linear benchmark, solved by coordinate descent.
//!
//! The penalty is swept over a fixed grid of 100 log-spaced values from 1e-3
//! to 1e3 (fixed for reproducibility); the sweep reuses each fold's previous
//! solution as a warm start, the winning penalty is the one with the lowest
//! cross-validated RMSE, and the returned model is refit on all training rows
//! at that penalty. Predictors are standardized internally and coefficients
//! mapped back to the original scale.

use itertools_num::linspace;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::models::RegressionModel;

/// Hyper-parameters for the lasso benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoParams {
    /// Number of grid points; log-spaced between the two exponents below.
    pub n_penalties: usize,
    pub min_exponent: f64,
    pub max_exponent: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LassoParams {
    fn default() -> Self {
        Self {
            n_penalties: 100,
            min_exponent: -3.0,
            max_exponent: 3.0,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

/// The fixed penalty grid, descending so warm starts shrink gradually.
pub fn penalty_grid(params: &LassoParams) -> Vec<f64> {
    let mut grid: Vec<f64> = linspace(params.min_exponent, params.max_exponent, params.n_penalties)
        .map(|e: f64| 10f64.powf(e))
        .collect();
    grid.reverse();
    grid
}

/// A fitted lasso model at its cross-validation-selected penalty.
#[derive(Debug, Clone)]
pub struct LassoFit {
    pub penalty: f64,
    pub intercept: f64,
    pub coefficients: Array1<f64>,
    /// Mean held-out RMSE per grid penalty, aligned with `penalty_grid`.
    pub cv_rmse: Vec<f64>,
}

impl RegressionModel for LassoFit {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, AnalysisError> {
        self.check_schema(x)?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }

    fn n_inputs(&self) -> usize {
        self.coefficients.len()
    }

    fn name(&self) -> &str {
        "lasso"
    }
}

struct Standardized {
    x: Array2<f64>,
    y_centered: Array1<f64>,
    x_means: Vec<f64>,
    x_stds: Vec<f64>,
    y_mean: f64,
}

fn standardize(x: &Array2<f64>, y: &Array1<f64>) -> Standardized {
    let (n, p) = (x.nrows(), x.ncols());
    let n_f = n as f64;

    let mut x_means = vec![0.0; p];
    let mut x_stds = vec![0.0; p];
    let mut xs = x.clone();
    for j in 0..p {
        let mean = x.column(j).sum() / n_f;
        let var = x.column(j).iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n_f;
        let std = var.sqrt().max(1e-12);
        x_means[j] = mean;
        x_stds[j] = std;
        for i in 0..n {
            xs[(i, j)] = (x[(i, j)] - mean) / std;
        }
    }

    let y_mean = y.sum() / n_f;
    let y_centered = y.mapv(|v| v - y_mean);

    Standardized {
        x: xs,
        y_centered,
        x_means,
        x_stds,
        y_mean,
    }
}

fn soft_threshold(value: f64, penalty: f64) -> f64 {
    if value > penalty {
        value - penalty
    } else if value < -penalty {
        value + penalty
    } else {
        0.0
    }
}

/// Coordinate descent on standardized data; `beta` is the warm start and is
/// updated in place. Objective: (1/2n)·RSS + penalty·‖β‖₁.
fn descend(std: &Standardized, penalty: f64, beta: &mut Array1<f64>, params: &LassoParams) {
    let n = std.x.nrows();
    let p = std.x.ncols();
    let n_f = n as f64;

    let mut residual = &std.y_centered - &std.x.dot(beta);

    for _ in 0..params.max_iter {
        let mut max_delta = 0.0f64;
        for j in 0..p {
            let old = beta[j];
            // rho_j = (1/n) x_j' (r + x_j * old)
            let mut rho = 0.0;
            for i in 0..n {
                rho += std.x[(i, j)] * (residual[i] + std.x[(i, j)] * old);
            }
            rho /= n_f;

            let new = soft_threshold(rho, penalty);
            if new != old {
                let delta = new - old;
                for i in 0..n {
                    residual[i] -= std.x[(i, j)] * delta;
                }
                beta[j] = new;
                max_delta = max_delta.max(delta.abs());
            }
        }
        if max_delta < params.tol {
            break;
        }
    }
}

/// Fit at one fixed penalty, warm-started along the grid prefix down to it.
/// Used to rescore folds at a penalty that was already selected elsewhere.
pub fn fit_lasso_at(
    x: &Array2<f64>,
    y: &Array1<f64>,
    penalty: f64,
    params: &LassoParams,
) -> LassoFit {
    let p = x.ncols();
    let std = standardize(x, y);

    let mut beta = Array1::<f64>::zeros(p);
    for &grid_penalty in penalty_grid(params).iter().filter(|&&g| g >= penalty) {
        descend(&std, grid_penalty, &mut beta, params);
    }
    descend(&std, penalty, &mut beta, params);

    let mut coefficients = Array1::<f64>::zeros(p);
    let mut intercept = std.y_mean;
    for j in 0..p {
        let coef = beta[j] / std.x_stds[j];
        coefficients[j] = coef;
        intercept -= coef * std.x_means[j];
    }

    LassoFit {
        penalty,
        intercept,
        coefficients,
        cv_rmse: Vec::new(),
    }
}

/// Sweep the penalty grid under the supplied fold assignment, pick the
/// penalty with the lowest mean held-out RMSE, and refit on all rows.
pub fn fit_lasso_cv(
    x: &Array2<f64>,
    y: &Array1<f64>,
    params: &LassoParams,
    fold_labels: &[usize],
    n_folds: usize,
) -> Result<LassoFit, AnalysisError> {
    let n = x.nrows();
    let p = x.ncols();
    if fold_labels.len() != n {
        return Err(AnalysisError::DimensionMismatch {
            expected: n,
            found: fold_labels.len(),
        });
    }

    let grid = penalty_grid(params);
    let mut sq_err = vec![0.0f64; grid.len()];
    let mut counts = vec![0usize; grid.len()];

    for fold in 0..n_folds {
        let train_rows: Vec<usize> = (0..n).filter(|&i| fold_labels[i] != fold).collect();
        let val_rows: Vec<usize> = (0..n).filter(|&i| fold_labels[i] == fold).collect();
        if train_rows.is_empty() || val_rows.is_empty() {
            continue;
        }

        let x_train = x.select(ndarray::Axis(0), &train_rows);
        let y_train = y.select(ndarray::Axis(0), &train_rows);
        let std = standardize(&x_train, &y_train);

        let mut beta = Array1::<f64>::zeros(p);
        for (g, &penalty) in grid.iter().enumerate() {
            descend(&std, penalty, &mut beta, params);
            // Score the current solution on the held-out rows in original units.
            for &row in &val_rows {
                let mut pred = std.y_mean;
                for j in 0..p {
                    let coef = beta[j] / std.x_stds[j];
                    pred += coef * (x[(row, j)] - std.x_means[j]);
                }
                sq_err[g] += (pred - y[row]).powi(2);
                counts[g] += 1;
            }
        }
    }

    let cv_rmse: Vec<f64> = sq_err
        .iter()
        .zip(counts.iter())
        .map(|(&s, &c)| if c > 0 { (s / c as f64).sqrt() } else { f64::INFINITY })
        .collect();

    let best = cv_rmse
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx)
        .ok_or(AnalysisError::NonConvergent)?;
    let best_penalty = grid[best];

    // Final fit on all rows at the selected penalty, warmed along the grid.
    let std = standardize(x, y);
    let mut beta = Array1::<f64>::zeros(p);
    for &penalty in grid.iter().take(best + 1) {
        descend(&std, penalty, &mut beta, params);
    }

    let mut coefficients = Array1::<f64>::zeros(p);
    let mut intercept = std.y_mean;
    for j in 0..p {
        let coef = beta[j] / std.x_stds[j];
        coefficients[j] = coef;
        intercept -= coef * std.x_means[j];
    }

    log::debug!(
        "Lasso selected penalty {:.4} (grid index {}) with CV RMSE {:.4}",
        best_penalty,
        best,
        cv_rmse[best]
    );

    Ok(LassoFit {
        penalty: best_penalty,
        intercept,
        coefficients,
        cv_rmse,
    })
}
