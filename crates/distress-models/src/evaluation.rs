//! Held-out evaluation of fitted models.
//!
//! Applies a fitted model to disjoint test rows and summarizes agreement
//! between predictions and observations. Never refits or mutates the model.

use ndarray::{Array1, Array2};

use crate::error::AnalysisError;
use crate::models::RegressionModel;

/// Test-set performance summary.
#[derive(Debug, Clone, Copy)]
pub struct TestMetrics {
    /// Pearson correlation between predicted and observed outcome.
    pub pearson_r: f64,
    /// Squared correlation.
    pub r_squared: f64,
    pub rmse: f64,
    pub mae: f64,
}

/// Pearson correlation between two equally long vectors.
///
/// Returns 0.0 when either vector is constant, mirroring the force-finite
/// convention used for univariate feature scoring.
pub fn pearson(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    assert_eq!(a.len(), b.len(), "pearson requires equal lengths");
    let n = a.len() as f64;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom > 0.0 {
        cov / denom
    } else {
        0.0
    }
}

/// Score a fitted model on held-out rows. An empty test set is an error,
/// not a set of NaN metrics.
pub fn evaluate(
    model: &dyn RegressionModel,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
) -> Result<TestMetrics, AnalysisError> {
    if y_test.is_empty() {
        return Err(AnalysisError::InsufficientData { rows: 0, required: 1 });
    }
    let predictions = model.predict(x_test)?;
    Ok(metrics_from(&predictions, y_test))
}

/// Metrics from a prediction/observation pair.
pub fn metrics_from(predictions: &Array1<f64>, observed: &Array1<f64>) -> TestMetrics {
    let n = observed.len() as f64;
    let mut sq_sum = 0.0;
    let mut abs_sum = 0.0;
    for (p, o) in predictions.iter().zip(observed.iter()) {
        let e = p - o;
        sq_sum += e * e;
        abs_sum += e.abs();
    }

    let r = pearson(predictions, observed);
    TestMetrics {
        pearson_r: r,
        r_squared: r * r,
        rmse: (sq_sum / n).sqrt(),
        mae: abs_sum / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::linear::fit_ols;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn pearson_of_identical_vectors_is_one() {
        let a = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        assert_abs_diff_eq!(pearson(&a, &a), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn pearson_of_constant_vector_is_zero() {
        let a = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let b = Array1::from_vec(vec![5.0, 5.0, 5.0]);
        assert_eq!(pearson(&a, &b), 0.0);
    }

    #[test]
    fn linear_model_recovers_synthetic_signal() {
        // outcome = 2*x1 - 1*x2 with negligible noise: test R² must exceed
        // 0.99 and the prediction correlation must be positive.
        let mut rng = StdRng::seed_from_u64(21);
        let n_train = 300;
        let n_test = 100;
        let make = |rng: &mut StdRng, n: usize| {
            let x = Array2::from_shape_fn((n, 2), |_| rng.gen_range(-1.0..1.0));
            let y = Array1::from_shape_fn(n, |i| {
                2.0 * x[(i, 0)] - 1.0 * x[(i, 1)] + rng.gen_range(-1e-4..1e-4)
            });
            (x, y)
        };
        let (x_train, y_train) = make(&mut rng, n_train);
        let (x_test, y_test) = make(&mut rng, n_test);

        let names = vec!["x1".to_string(), "x2".to_string()];
        let fit = fit_ols(&x_train, &y_train, &names).unwrap();

        let metrics = evaluate(&fit, &x_test, &y_test).unwrap();
        assert!(metrics.r_squared > 0.99);
        assert!(metrics.pearson_r > 0.0);
        assert!(metrics.rmse < 0.01);
        assert!(metrics.mae <= metrics.rmse);
    }

    #[test]
    fn empty_test_set_is_an_error() {
        let mut rng = StdRng::seed_from_u64(23);
        let x = Array2::from_shape_fn((40, 2), |_| rng.gen_range(-1.0..1.0));
        let y = Array1::from_shape_fn(40, |i| x[(i, 0)] + 0.01 * i as f64);
        let names = vec!["a".to_string(), "b".to_string()];
        let fit = fit_ols(&x, &y, &names).unwrap();

        let empty_x = Array2::<f64>::zeros((0, 2));
        let empty_y = Array1::<f64>::zeros(0);
        assert!(matches!(
            evaluate(&fit, &empty_x, &empty_y),
            Err(crate::error::AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn schema_mismatch_is_surfaced() {
        let mut rng = StdRng::seed_from_u64(22);
        let x = Array2::from_shape_fn((50, 2), |_| rng.gen_range(-1.0..1.0));
        let y = Array1::from_shape_fn(50, |i| i as f64);
        let names = vec!["a".to_string(), "b".to_string()];
        let fit = fit_ols(&x, &y, &names).unwrap();

        let bad = Array2::<f64>::zeros((10, 3));
        let err = evaluate(&fit, &bad, &Array1::zeros(10)).unwrap_err();
        assert!(matches!(err, crate::error::AnalysisError::DimensionMismatch { .. }));
    }
}
