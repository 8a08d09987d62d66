//! In-memory tables for the two survey inputs.
//!
//! This module defines `ObservationTable` (one row per subject, scaled numeric
//! predictors plus the distress outcome) and `ItemTable` (raw item responses
//! used only for reliability estimation), along with the row/column selection
//! helpers the partitioner and fitters operate on. Identifier columns are
//! dropped by the loader before either table is constructed.

use ndarray::{Array1, Array2, Axis};

use crate::error::AnalysisError;

/// Predictor/outcome table: one row per subject, every column numeric.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    /// Predictor matrix, shape (n_subjects, n_predictors).
    pub predictors: Array2<f64>,
    /// Outcome vector, shape (n_subjects,).
    pub outcome: Array1<f64>,
    /// Predictor column names, aligned with `predictors` columns.
    pub predictor_names: Vec<String>,
    /// Name of the outcome column (e.g. `distress_score`).
    pub outcome_name: String,
}

impl ObservationTable {
    pub fn new(
        predictors: Array2<f64>,
        outcome: Array1<f64>,
        predictor_names: Vec<String>,
        outcome_name: String,
    ) -> Self {
        assert_eq!(predictors.nrows(), outcome.len());
        assert_eq!(predictors.ncols(), predictor_names.len());
        ObservationTable {
            predictors,
            outcome,
            predictor_names,
            outcome_name,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.predictors.nrows()
    }

    pub fn n_predictors(&self) -> usize {
        self.predictors.ncols()
    }

    /// Index of a predictor column by name.
    pub fn predictor_index(&self, name: &str) -> Result<usize, AnalysisError> {
        self.predictor_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    /// A single predictor column by name.
    pub fn predictor_column(&self, name: &str) -> Result<Array1<f64>, AnalysisError> {
        let idx = self.predictor_index(name)?;
        Ok(self.predictors.column(idx).to_owned())
    }

    /// New table containing only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> ObservationTable {
        ObservationTable {
            predictors: self.predictors.select(Axis(0), indices),
            outcome: self.outcome.select(Axis(0), indices),
            predictor_names: self.predictor_names.clone(),
            outcome_name: self.outcome_name.clone(),
        }
    }

    /// Predictor matrix restricted to a named subset of columns, in the order
    /// given. Fails with `MissingColumn` on any unknown name.
    pub fn predictor_subset(&self, names: &[String]) -> Result<Array2<f64>, AnalysisError> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            indices.push(self.predictor_index(name)?);
        }
        Ok(self.predictors.select(Axis(1), &indices))
    }

    pub fn log_input_summary(&self) {
        log::info!(
            "Observation table: {} subjects, {} predictors, outcome '{}'",
            self.n_rows(),
            self.n_predictors(),
            self.outcome_name
        );
    }
}

/// Item-level scale responses: one row per subject, one column per item.
#[derive(Debug, Clone)]
pub struct ItemTable {
    /// Item response matrix, shape (n_subjects, n_items).
    pub items: Array2<f64>,
    /// Item column names, aligned with `items` columns.
    pub item_names: Vec<String>,
}

impl ItemTable {
    pub fn new(items: Array2<f64>, item_names: Vec<String>) -> Self {
        assert_eq!(items.ncols(), item_names.len());
        ItemTable { items, item_names }
    }

    pub fn n_rows(&self) -> usize {
        self.items.nrows()
    }

    pub fn n_items(&self) -> usize {
        self.items.ncols()
    }

    pub fn item_index(&self, name: &str) -> Result<usize, AnalysisError> {
        self.item_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn toy_table() -> ObservationTable {
        let x = Array2::from_shape_vec(
            (4, 2),
            vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0],
        )
        .unwrap();
        let y = array![0.1, 0.2, 0.3, 0.4];
        ObservationTable::new(
            x,
            y,
            vec!["a".to_string(), "b".to_string()],
            "distress_score".to_string(),
        )
    }

    #[test]
    fn select_rows_keeps_alignment() {
        let table = toy_table();
        let sub = table.select_rows(&[2, 0]);
        assert_eq!(sub.n_rows(), 2);
        assert_eq!(sub.predictors[(0, 0)], 3.0);
        assert_eq!(sub.outcome[0], 0.3);
        assert_eq!(sub.predictors[(1, 1)], 10.0);
    }

    #[test]
    fn predictor_subset_orders_columns() {
        let table = toy_table();
        let sub = table
            .predictor_subset(&["b".to_string(), "a".to_string()])
            .unwrap();
        assert_eq!(sub[(0, 0)], 10.0);
        assert_eq!(sub[(0, 1)], 1.0);
    }

    #[test]
    fn missing_predictor_is_an_error() {
        let table = toy_table();
        let err = table.predictor_column("nope").unwrap_err();
        assert_eq!(err, AnalysisError::MissingColumn("nope".to_string()));
    }
}
