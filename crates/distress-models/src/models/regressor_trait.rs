use ndarray::{Array1, Array2};

use crate::error::AnalysisError;

/// A small trait abstraction over the fitted regression models so the
/// evaluator can score any of them against held-out rows. Fitting stays on
/// the concrete types; a fitted model is immutable from here on.
pub trait RegressionModel {
    /// Predict the outcome for each row of `x`. Fails with
    /// `DimensionMismatch` when `x` does not have the column count the model
    /// was trained on.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, AnalysisError>;

    /// Number of predictor columns the model expects.
    fn n_inputs(&self) -> usize;

    /// Human readable name for logs and reports.
    fn name(&self) -> &str {
        "regressor"
    }

    /// Shared schema check for implementations.
    fn check_schema(&self, x: &Array2<f64>) -> Result<(), AnalysisError> {
        if x.ncols() != self.n_inputs() {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.n_inputs(),
                found: x.ncols(),
            });
        }
        Ok(())
    }
}
