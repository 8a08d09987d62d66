//! Internal-consistency reliability for the item-level distress scale.
//!
//! Reverse-keyed items are flipped about the scale midpoint before anything
//! else. Cronbach's alpha comes from the item covariance matrix; the omega
//! coefficients come from a single-general-factor principal-axis solution on
//! the item correlation matrix, with communalities iterated to convergence.
//! A correlation matrix that is not positive definite fails with
//! `SingularFit`, matching the batch-abort policy of the rest of the
//! pipeline.

use ndarray::{Array1, Array2};

use crate::data::ItemTable;
use crate::error::AnalysisError;
use crate::math::jacobi_eigh;

/// Reliability coefficients for one scale.
#[derive(Debug, Clone)]
pub struct ReliabilityReport {
    pub alpha: f64,
    pub omega_total: f64,
    pub omega_hierarchical: f64,
    /// Standardized general-factor loading per item, aligned with the table's
    /// item order.
    pub loadings: Array1<f64>,
    pub n_items: usize,
    pub n_subjects: usize,
}

const FACTOR_MAX_ITER: usize = 200;
const FACTOR_TOL: f64 = 1e-8;

/// Flip reverse-keyed items about the scale midpoint, leaving other columns
/// untouched.
pub fn apply_reverse_keys(
    table: &ItemTable,
    reverse_keyed: &[String],
    scale_min: f64,
    scale_max: f64,
) -> Result<Array2<f64>, AnalysisError> {
    let mut items = table.items.clone();
    let pivot = scale_min + scale_max;
    for name in reverse_keyed {
        let idx = table.item_index(name)?;
        for v in items.column_mut(idx).iter_mut() {
            *v = pivot - *v;
        }
    }
    Ok(items)
}

fn covariance_matrix(items: &Array2<f64>) -> Array2<f64> {
    let n = items.nrows();
    let k = items.ncols();
    let n_f = n as f64;

    let means: Vec<f64> = (0..k).map(|j| items.column(j).sum() / n_f).collect();

    let mut cov = Array2::<f64>::zeros((k, k));
    for a in 0..k {
        for b in a..k {
            let mut s = 0.0;
            for i in 0..n {
                s += (items[(i, a)] - means[a]) * (items[(i, b)] - means[b]);
            }
            let value = s / (n_f - 1.0);
            cov[(a, b)] = value;
            cov[(b, a)] = value;
        }
    }
    cov
}

fn correlation_from_covariance(cov: &Array2<f64>) -> Result<Array2<f64>, AnalysisError> {
    let k = cov.nrows();
    let mut corr = Array2::<f64>::zeros((k, k));
    for a in 0..k {
        for b in 0..k {
            let denom = (cov[(a, a)] * cov[(b, b)]).sqrt();
            if denom <= 0.0 {
                return Err(AnalysisError::SingularFit(
                    "zero-variance item in the reliability scale".to_string(),
                ));
            }
            corr[(a, b)] = cov[(a, b)] / denom;
        }
    }
    Ok(corr)
}

/// Cronbach's alpha from an item covariance matrix.
pub fn cronbach_alpha(cov: &Array2<f64>) -> Result<f64, AnalysisError> {
    let k = cov.nrows() as f64;
    let total: f64 = cov.iter().sum();
    if total <= 0.0 {
        return Err(AnalysisError::SingularFit(
            "non-positive total scale variance".to_string(),
        ));
    }
    let trace: f64 = (0..cov.nrows()).map(|i| cov[(i, i)]).sum();
    Ok(k / (k - 1.0) * (1.0 - trace / total))
}

/// One-factor principal-axis loadings on a correlation matrix, iterating
/// communalities until they stabilize.
fn general_factor_loadings(corr: &Array2<f64>) -> Result<Array1<f64>, AnalysisError> {
    let k = corr.nrows();

    // Initial communalities: largest absolute off-diagonal correlation per
    // item, a standard principal-axis starting point.
    let mut communality: Vec<f64> = (0..k)
        .map(|i| {
            (0..k)
                .filter(|&j| j != i)
                .map(|j| corr[(i, j)].abs())
                .fold(0.0, f64::max)
        })
        .collect();

    let mut loadings = Array1::<f64>::zeros(k);
    for _ in 0..FACTOR_MAX_ITER {
        let mut reduced = corr.clone();
        for i in 0..k {
            reduced[(i, i)] = communality[i];
        }

        let (eigenvalues, eigenvectors) = jacobi_eigh(&reduced);
        let leading = eigenvalues[0];
        if leading <= 0.0 {
            return Err(AnalysisError::SingularFit(
                "item correlation matrix has no positive leading eigenvalue".to_string(),
            ));
        }

        let scale = leading.sqrt();
        for i in 0..k {
            loadings[i] = eigenvectors[(i, 0)] * scale;
        }
        // Orient the factor so the average loading is positive.
        if loadings.sum() < 0.0 {
            loadings.mapv_inplace(|v| -v);
        }

        let mut max_delta = 0.0f64;
        for i in 0..k {
            let updated = (loadings[i] * loadings[i]).min(1.0);
            max_delta = max_delta.max((updated - communality[i]).abs());
            communality[i] = updated;
        }
        if max_delta < FACTOR_TOL {
            break;
        }
    }

    Ok(loadings)
}

/// Compute alpha and the omega coefficients for the scale.
pub fn assess_reliability(
    table: &ItemTable,
    reverse_keyed: &[String],
    scale_min: f64,
    scale_max: f64,
) -> Result<ReliabilityReport, AnalysisError> {
    let n = table.n_rows();
    let k = table.n_items();
    if k < 2 {
        return Err(AnalysisError::InsufficientData { rows: k, required: 2 });
    }
    if n < k + 1 {
        return Err(AnalysisError::InsufficientData { rows: n, required: k + 1 });
    }

    let items = apply_reverse_keys(table, reverse_keyed, scale_min, scale_max)?;
    let cov = covariance_matrix(&items);
    let alpha = cronbach_alpha(&cov)?;

    let corr = correlation_from_covariance(&cov)?;
    let loadings = general_factor_loadings(&corr)?;

    // Total standardized scale variance, including inter-item correlation.
    let total_variance: f64 = corr.iter().sum();
    let loading_sum: f64 = loadings.sum();
    let uniqueness: f64 = loadings.iter().map(|l| 1.0 - (l * l).min(1.0)).sum();

    let omega_hierarchical = (loading_sum * loading_sum) / total_variance;
    let omega_total = 1.0 - uniqueness / total_variance;

    log::info!(
        "Reliability over {} items, {} subjects: alpha {:.3}, omega-total {:.3}, omega-h {:.3}",
        k,
        n,
        alpha,
        omega_total,
        omega_hierarchical
    );

    Ok(ReliabilityReport {
        alpha,
        omega_total,
        omega_hierarchical,
        loadings,
        n_items: k,
        n_subjects: n,
    })
}
