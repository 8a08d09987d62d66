use std::error::Error;
use std::fmt;

/// Custom error type for analysis-pipeline failures.
///
/// Every variant is unrecoverable for the run that triggers it: the pipeline
/// is a batch analysis with no partial-failure semantics, so the stage aborts
/// and the operator sees the offending table or column.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Train fraction outside the open interval (0, 1).
    InvalidFraction(f64),
    /// Too few rows to stratify or to fill the requested folds.
    InsufficientData { rows: usize, required: usize },
    /// Stepwise search never improved on the intercept-only model.
    NonConvergent,
    /// Test-set predictor columns do not match the model's expected schema.
    DimensionMismatch { expected: usize, found: usize },
    /// Expected predictor or outcome column absent from an input table.
    MissingColumn(String),
    /// Collinear predictors prevented a stable least-squares solve.
    SingularFit(String),
    /// The scoped worker pool for a fitting call could not be built.
    WorkerPool(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnalysisError::InvalidFraction(p) => {
                write!(
                    f,
                    "Train fraction {} must lie strictly between 0 and 1 and leave both partitions non-empty",
                    p
                )
            }
            AnalysisError::InsufficientData { rows, required } => {
                write!(f, "Found {} rows but at least {} are required", rows, required)
            }
            AnalysisError::NonConvergent => {
                write!(f, "Stepwise search could not improve on the intercept-only model")
            }
            AnalysisError::DimensionMismatch { expected, found } => {
                write!(f, "Model expects {} predictor columns, got {}", expected, found)
            }
            AnalysisError::MissingColumn(name) => {
                write!(f, "Column '{}' not found in input table", name)
            }
            AnalysisError::SingularFit(what) => {
                write!(f, "Singular fit: {}", what)
            }
            AnalysisError::WorkerPool(what) => {
                write!(f, "Failed to build worker pool: {}", what)
            }
        }
    }
}

impl Error for AnalysisError {}
