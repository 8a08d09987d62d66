//! Cross-validated stepwise model selection and the benchmark fitters.
//!
//! The selector preserves the two-level structure of the original analysis:
//! a greedy bidirectional AIC search runs inside each of the k folds, every
//! fold's final model is scored on its held-out rows, the formula from the
//! best-performing fold is accepted, and fold metrics are averaged into the
//! reported cross-validation summary. The accepted predictor list is returned
//! structurally; nothing round-trips through a formula string.

use ndarray::Axis;
use rayon::prelude::*;

use crate::data::ObservationTable;
use crate::error::AnalysisError;
use crate::evaluation::{evaluate, TestMetrics};
use crate::models::forest::{ForestParams, ForestRegressor};
use crate::models::lasso::{fit_lasso_at, fit_lasso_cv, LassoFit, LassoParams};
use crate::models::linear::{fit_ols, LinearFit};
use crate::partition::fold_assignments;

/// Mean held-out performance across the k folds.
#[derive(Debug, Clone, Copy)]
pub struct CvSummary {
    pub rmse: f64,
    pub r_squared: f64,
    pub mae: f64,
    pub folds: usize,
}

impl CvSummary {
    fn from_fold_metrics(metrics: &[TestMetrics]) -> CvSummary {
        let n = metrics.len() as f64;
        CvSummary {
            rmse: metrics.iter().map(|m| m.rmse).sum::<f64>() / n,
            r_squared: metrics.iter().map(|m| m.r_squared).sum::<f64>() / n,
            mae: metrics.iter().map(|m| m.mae).sum::<f64>() / n,
            folds: metrics.len(),
        }
    }
}

/// A single accepted move of the stepwise search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepMove {
    Add(String),
    Drop(String),
}

/// Result of one greedy bidirectional search.
#[derive(Debug, Clone)]
pub struct StepwiseFit {
    /// Selected predictor names, in table order.
    pub predictors: Vec<String>,
    /// AIC after each accepted move, starting with the null model's AIC.
    pub aic_trace: Vec<f64>,
    pub moves: Vec<StepMove>,
}

/// Greedy bidirectional stepwise search by AIC on the given rows.
///
/// At each step every single add or drop move is scored; the move with the
/// lowest AIC is accepted only if it strictly improves on the current model,
/// so the trace is strictly decreasing and the search cannot cycle.
/// Candidate fits that are singular (collinear additions) are skipped rather
/// than failing the search. Fails with `NonConvergent` when no move ever
/// improves on the intercept-only model.
pub fn stepwise_search(table: &ObservationTable) -> Result<StepwiseFit, AnalysisError> {
    let p = table.n_predictors();
    let y = &table.outcome;

    let null_fit = fit_ols(&table.predictors.select(Axis(1), &[]), y, &[])?;
    let mut current_aic = null_fit.aic;
    let mut included = vec![false; p];
    let mut aic_trace = vec![current_aic];
    let mut moves = Vec::new();

    loop {
        let mut best: Option<(usize, bool, f64)> = None; // (index, adding, aic)

        for j in 0..p {
            let adding = !included[j];
            // Build the candidate index set.
            let candidate: Vec<usize> = (0..p)
                .filter(|&i| if i == j { adding } else { included[i] })
                .collect();

            let names: Vec<String> = candidate
                .iter()
                .map(|&i| table.predictor_names[i].clone())
                .collect();
            let x = table.predictors.select(Axis(1), &candidate);

            let aic = match fit_ols(&x, y, &names) {
                Ok(fit) => fit.aic,
                Err(AnalysisError::SingularFit(_)) => continue,
                Err(e) => return Err(e),
            };

            if best.map_or(true, |(_, _, b)| aic < b) {
                best = Some((j, adding, aic));
            }
        }

        match best {
            Some((j, adding, aic)) if aic < current_aic - 1e-10 => {
                included[j] = adding;
                current_aic = aic;
                aic_trace.push(aic);
                let name = table.predictor_names[j].clone();
                moves.push(if adding {
                    StepMove::Add(name)
                } else {
                    StepMove::Drop(name)
                });
            }
            _ => break,
        }
    }

    let predictors: Vec<String> = (0..p)
        .filter(|&i| included[i])
        .map(|i| table.predictor_names[i].clone())
        .collect();

    if predictors.is_empty() {
        return Err(AnalysisError::NonConvergent);
    }

    Ok(StepwiseFit {
        predictors,
        aic_trace,
        moves,
    })
}

/// The selected stepwise model with its cross-validation summary.
#[derive(Debug, Clone)]
pub struct SelectedModel {
    /// Predictors of the accepted formula (from the best-performing fold).
    pub predictors: Vec<String>,
    /// The accepted formula refit on all training rows.
    pub model: LinearFit,
    pub cv: CvSummary,
    /// Index of the fold whose formula was accepted.
    pub best_fold: usize,
}

fn worker_count(workers: Option<usize>) -> usize {
    workers.unwrap_or_else(|| num_cpus::get().saturating_sub(1).max(1))
}

fn scoped_pool(workers: Option<usize>) -> Result<rayon::ThreadPool, AnalysisError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count(workers))
        .build()
        .map_err(|e| AnalysisError::WorkerPool(e.to_string()))
}

/// Run the cross-validated stepwise selector on the training rows.
///
/// Fold work fans out on a pool scoped to this call; each fold owns an
/// immutable copy of its rows. Folds whose internal search is non-convergent
/// are logged and dropped from the aggregate; if every fold is
/// non-convergent the selector fails with `NonConvergent`.
pub fn select_stepwise_model(
    train: &ObservationTable,
    n_folds: usize,
    seed: u64,
    workers: Option<usize>,
) -> Result<SelectedModel, AnalysisError> {
    let labels = fold_assignments(train.n_rows(), n_folds, seed)?;
    let pool = scoped_pool(workers)?;

    struct FoldOutcome {
        fold: usize,
        predictors: Vec<String>,
        metrics: TestMetrics,
    }

    let outcomes: Result<Vec<Option<FoldOutcome>>, AnalysisError> = pool.install(|| {
        (0..n_folds)
            .into_par_iter()
            .map(|fold| {
                let train_rows: Vec<usize> = (0..train.n_rows())
                    .filter(|&i| labels[i] != fold)
                    .collect();
                let val_rows: Vec<usize> = (0..train.n_rows())
                    .filter(|&i| labels[i] == fold)
                    .collect();

                let fold_train = train.select_rows(&train_rows);
                let fold_val = train.select_rows(&val_rows);

                let search = match stepwise_search(&fold_train) {
                    Ok(s) => s,
                    Err(AnalysisError::NonConvergent) => {
                        log::warn!("Fold {}: stepwise search was non-convergent", fold);
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                };

                let x_fit = fold_train.predictor_subset(&search.predictors)?;
                let fit = fit_ols(&x_fit, &fold_train.outcome, &search.predictors)?;

                let x_val = fold_val.predictor_subset(&search.predictors)?;
                let metrics = evaluate(&fit, &x_val, &fold_val.outcome)?;

                log::debug!(
                    "Fold {}: {} predictors, validation RMSE {:.4}",
                    fold,
                    search.predictors.len(),
                    metrics.rmse
                );

                Ok(Some(FoldOutcome {
                    fold,
                    predictors: search.predictors,
                    metrics,
                }))
            })
            .collect()
    });

    let outcomes: Vec<FoldOutcome> = outcomes?.into_iter().flatten().collect();
    if outcomes.is_empty() {
        return Err(AnalysisError::NonConvergent);
    }

    let cv = CvSummary::from_fold_metrics(
        &outcomes.iter().map(|o| o.metrics).collect::<Vec<_>>(),
    );

    let best = outcomes
        .iter()
        .min_by(|a, b| {
            a.metrics
                .rmse
                .partial_cmp(&b.metrics.rmse)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .ok_or(AnalysisError::NonConvergent)?;

    log::info!(
        "Accepted formula from fold {} ({} predictors, validation RMSE {:.4})",
        best.fold,
        best.predictors.len(),
        best.metrics.rmse
    );

    // Refit the accepted formula on all training rows.
    let x_train = train.predictor_subset(&best.predictors)?;
    let model = fit_ols(&x_train, &train.outcome, &best.predictors)?;

    Ok(SelectedModel {
        predictors: best.predictors.clone(),
        model,
        cv,
        best_fold: best.fold,
    })
}

/// Refit the selected formula on the entire table (train ∪ test) for the
/// final, reportable coefficient table. Cross-validation is used only for
/// selection; inference comes from this full-data fit.
pub fn refit_full(
    full: &ObservationTable,
    predictors: &[String],
) -> Result<LinearFit, AnalysisError> {
    let x = full.predictor_subset(predictors)?;
    fit_ols(&x, &full.outcome, predictors)
}

/// Fit the random-forest benchmark under the same fold assignments.
pub fn benchmark_forest(
    train: &ObservationTable,
    params: &ForestParams,
    n_folds: usize,
    seed: u64,
    workers: Option<usize>,
) -> Result<(ForestRegressor, CvSummary), AnalysisError> {
    let labels = fold_assignments(train.n_rows(), n_folds, seed)?;
    let pool = scoped_pool(workers)?;

    let metrics: Result<Vec<TestMetrics>, AnalysisError> = pool.install(|| {
        (0..n_folds)
            .into_par_iter()
            .map(|fold| {
                let train_rows: Vec<usize> = (0..train.n_rows())
                    .filter(|&i| labels[i] != fold)
                    .collect();
                let val_rows: Vec<usize> = (0..train.n_rows())
                    .filter(|&i| labels[i] == fold)
                    .collect();

                let fold_train = train.select_rows(&train_rows);
                let fold_val = train.select_rows(&val_rows);

                let forest = ForestRegressor::fit(
                    &fold_train.predictors,
                    &fold_train.outcome,
                    params,
                    seed.wrapping_add(fold as u64 + 1),
                )?;
                evaluate(&forest, &fold_val.predictors, &fold_val.outcome)
            })
            .collect()
    });
    let metrics = metrics?;

    let forest = ForestRegressor::fit(&train.predictors, &train.outcome, params, seed)?;
    Ok((forest, CvSummary::from_fold_metrics(&metrics)))
}

/// Fit the lasso benchmark: the penalty grid is swept under the shared fold
/// assignment, then each fold is rescored at the selected penalty for a
/// summary comparable to the other fitters.
pub fn benchmark_lasso(
    train: &ObservationTable,
    params: &LassoParams,
    n_folds: usize,
    seed: u64,
    workers: Option<usize>,
) -> Result<(LassoFit, CvSummary), AnalysisError> {
    let labels = fold_assignments(train.n_rows(), n_folds, seed)?;

    let fit = fit_lasso_cv(&train.predictors, &train.outcome, params, &labels, n_folds)?;
    let penalty = fit.penalty;

    let pool = scoped_pool(workers)?;
    let metrics: Result<Vec<TestMetrics>, AnalysisError> = pool.install(|| {
        (0..n_folds)
            .into_par_iter()
            .map(|fold| {
                let train_rows: Vec<usize> = (0..train.n_rows())
                    .filter(|&i| labels[i] != fold)
                    .collect();
                let val_rows: Vec<usize> = (0..train.n_rows())
                    .filter(|&i| labels[i] == fold)
                    .collect();

                let fold_train = train.select_rows(&train_rows);
                let fold_val = train.select_rows(&val_rows);

                let fold_fit =
                    fit_lasso_at(&fold_train.predictors, &fold_train.outcome, penalty, params);
                evaluate(&fold_fit, &fold_val.predictors, &fold_val.outcome)
            })
            .collect()
    });
    let metrics = metrics?;

    Ok((fit, CvSummary::from_fold_metrics(&metrics)))
}
