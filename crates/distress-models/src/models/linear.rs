//! Ordinary least squares with the inference statistics the manuscript
//! reports: estimates, standard errors, t statistics, two-tailed p values,
//! significance bands, R², and AIC for the stepwise search.

use ndarray::{Array1, Array2, Axis};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::AnalysisError;
use crate::models::RegressionModel;

/// Significance band for a p value. The .05 boundary is inclusive.
pub fn significance_band(p: f64) -> &'static str {
    if p <= 0.001 {
        "***"
    } else if p <= 0.01 {
        "**"
    } else if p <= 0.05 {
        "*"
    } else {
        "n.s."
    }
}

/// One row of a coefficient table.
#[derive(Debug, Clone)]
pub struct CoefficientEntry {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    pub band: &'static str,
}

/// A fitted OLS model together with its inference summary.
#[derive(Debug, Clone)]
pub struct LinearFit {
    /// Names of the predictor columns, aligned with `coefficients`.
    pub predictor_names: Vec<String>,
    pub intercept: f64,
    pub coefficients: Array1<f64>,
    /// Coefficient table including the intercept as the first entry.
    pub entries: Vec<CoefficientEntry>,
    pub residual_sum_squares: f64,
    pub r_squared: f64,
    pub aic: f64,
    pub df_residual: f64,
}

impl LinearFit {
    /// Coefficient entries excluding the intercept, for downstream
    /// comparison against marginal estimates.
    pub fn slope_entries(&self) -> &[CoefficientEntry] {
        &self.entries[1..]
    }
}

impl RegressionModel for LinearFit {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, AnalysisError> {
        self.check_schema(x)?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }

    fn n_inputs(&self) -> usize {
        self.coefficients.len()
    }

    fn name(&self) -> &str {
        "stepwise-ols"
    }
}

/// Fit OLS of `y` on the columns of `x` (plus an intercept).
///
/// `x` may have zero columns, which fits the intercept-only (null) model the
/// stepwise search starts from. Collinear predictor sets fail with
/// `SingularFit` out of the Cholesky solve.
pub fn fit_ols(
    x: &Array2<f64>,
    y: &Array1<f64>,
    predictor_names: &[String],
) -> Result<LinearFit, AnalysisError> {
    let n = y.len();
    let k = x.ncols();
    assert_eq!(x.nrows(), n, "design matrix and outcome must align");
    assert_eq!(k, predictor_names.len());

    let n_params = k + 1;
    if n <= n_params + 1 {
        return Err(AnalysisError::InsufficientData {
            rows: n,
            required: n_params + 2,
        });
    }

    // Design matrix with a leading intercept column.
    let mut design = Array2::<f64>::ones((n, n_params));
    for j in 0..k {
        design.column_mut(j + 1).assign(&x.column(j));
    }

    let xtx = design.t().dot(&design);
    let xty = design.t().dot(y);
    let xtx_inv = crate::math::inverse_spd(&xtx)?;
    let beta = xtx_inv.dot(&xty);

    let fitted = design.dot(&beta);
    let residuals = y - &fitted;
    let rss: f64 = residuals.iter().map(|r| r * r).sum();

    let y_mean = y.sum() / n as f64;
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

    let df_residual = (n - n_params) as f64;
    let mse = rss / df_residual;

    let t_dist = StudentsT::new(0.0, 1.0, df_residual)
        .map_err(|e| AnalysisError::SingularFit(format!("t distribution: {}", e)))?;

    let term_names: Vec<String> = std::iter::once("(Intercept)".to_string())
        .chain(predictor_names.iter().cloned())
        .collect();

    let mut entries = Vec::with_capacity(n_params);
    for (j, name) in term_names.iter().enumerate() {
        let variance = mse * xtx_inv[(j, j)];
        let std_error = if variance >= 0.0 { variance.sqrt() } else { f64::NAN };
        let t_value = if std_error > 0.0 {
            beta[j] / std_error
        } else {
            f64::NAN
        };
        let p_value = if t_value.is_finite() {
            2.0 * (1.0 - t_dist.cdf(t_value.abs()))
        } else {
            f64::NAN
        };
        entries.push(CoefficientEntry {
            name: name.clone(),
            estimate: beta[j],
            std_error,
            t_value,
            p_value,
            band: significance_band(p_value),
        });
    }

    // AIC on the stepwise scale: n·ln(RSS/n) + 2·(params + 1), the +1 for
    // the error variance. The RSS floor keeps a near-perfect fit finite.
    let aic = n as f64 * (rss.max(1e-12) / n as f64).ln() + 2.0 * (n_params as f64 + 1.0);

    let coefficients = beta.slice_axis(Axis(0), ndarray::Slice::from(1..)).to_owned();

    Ok(LinearFit {
        predictor_names: predictor_names.to_vec(),
        intercept: beta[0],
        coefficients,
        entries,
        residual_sum_squares: rss,
        r_squared,
        aic,
        df_residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn synthetic(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((n, 2), |_| rng.gen_range(-1.0..1.0));
        let y = Array1::from_shape_fn(n, |i| {
            2.0 * x[(i, 0)] - 1.0 * x[(i, 1)] + rng.gen_range(-0.001..0.001)
        });
        (x, y)
    }

    #[test]
    fn recovers_known_coefficients() {
        let (x, y) = synthetic(200, 3);
        let names = vec!["x1".to_string(), "x2".to_string()];
        let fit = fit_ols(&x, &y, &names).unwrap();

        assert_abs_diff_eq!(fit.coefficients[0], 2.0, epsilon = 0.01);
        assert_abs_diff_eq!(fit.coefficients[1], -1.0, epsilon = 0.01);
        assert_abs_diff_eq!(fit.intercept, 0.0, epsilon = 0.01);
        assert!(fit.r_squared > 0.99);
    }

    #[test]
    fn intercept_only_model_fits() {
        let (_, y) = synthetic(50, 4);
        let x = Array2::<f64>::zeros((50, 0));
        let fit = fit_ols(&x, &y, &[]).unwrap();
        assert_eq!(fit.n_inputs(), 0);
        assert_abs_diff_eq!(fit.intercept, y.sum() / 50.0, epsilon = 1e-9);
    }

    #[test]
    fn collinear_predictors_fail() {
        let mut x = Array2::<f64>::zeros((30, 2));
        for i in 0..30 {
            x[(i, 0)] = i as f64;
            x[(i, 1)] = 2.0 * i as f64; // exact multiple of column 0
        }
        let y = Array1::from_shape_fn(30, |i| i as f64);
        let names = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            fit_ols(&x, &y, &names),
            Err(AnalysisError::SingularFit(_))
        ));
    }

    #[test]
    fn predict_rejects_wrong_width() {
        let (x, y) = synthetic(100, 5);
        let names = vec!["x1".to_string(), "x2".to_string()];
        let fit = fit_ols(&x, &y, &names).unwrap();
        let narrow = Array2::<f64>::zeros((10, 1));
        assert!(matches!(
            fit.predict(&narrow),
            Err(AnalysisError::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn banding_boundaries() {
        assert_eq!(significance_band(0.0009), "***");
        assert_eq!(significance_band(0.005), "**");
        assert_eq!(significance_band(0.02), "*");
        assert_eq!(significance_band(0.05), "*");
        assert_eq!(significance_band(0.2), "n.s.");
    }

    #[test]
    fn aic_prefers_the_true_model() {
        let (x, y) = synthetic(200, 6);
        let names = vec!["x1".to_string(), "x2".to_string()];
        let full = fit_ols(&x, &y, &names).unwrap();

        let null = fit_ols(&Array2::<f64>::zeros((200, 0)), &y, &[]).unwrap();
        assert!(full.aic < null.aic);
    }
}
