//! CSV readers for the two survey input files.
//!
//! Both tables arrive as comma-separated files with a header row and a
//! subject-identifier column that is dropped on load; every remaining cell
//! must parse as a number. Predictor scaling is the caller's responsibility
//! and is not validated here.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use ndarray::{Array1, Array2};

use crate::data::{ItemTable, ObservationTable};
use crate::error::AnalysisError;

/// Configuration for reading the observation (predictor/outcome) CSV.
#[derive(Debug, Clone)]
pub struct ObservationReaderConfig {
    /// Column name of the numeric outcome.
    pub outcome_column: String,
    /// Identifier columns dropped before modeling (matched case-insensitively).
    pub id_columns: Vec<String>,
}

impl Default for ObservationReaderConfig {
    fn default() -> Self {
        Self {
            outcome_column: "distress_score".to_string(),
            id_columns: vec![
                "subject_id".to_string(),
                "participant_id".to_string(),
                "id".to_string(),
            ],
        }
    }
}

/// Read the observation table, dropping identifier columns and splitting off
/// the outcome column.
pub fn read_observation_csv<P: AsRef<Path>>(path: P) -> Result<ObservationTable> {
    read_observation_csv_with_config(path, &ObservationReaderConfig::default())
}

/// Read the observation table using a custom configuration.
pub fn read_observation_csv_with_config<P: AsRef<Path>>(
    path: P,
    config: &ObservationReaderConfig,
) -> Result<ObservationTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open observation file: {}", path.as_ref().display()))?;

    let headers = reader
        .headers()
        .context("Failed to read observation header row")?
        .clone();

    let outcome_idx = find_column(&headers, &config.outcome_column)
        .ok_or_else(|| AnalysisError::MissingColumn(config.outcome_column.clone()))?;

    let id_set: HashSet<String> = config
        .id_columns
        .iter()
        .map(|name| name.to_ascii_lowercase())
        .collect();

    let mut predictor_indices = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if idx == outcome_idx || id_set.contains(&header.to_ascii_lowercase()) {
            continue;
        }
        predictor_indices.push(idx);
    }
    if predictor_indices.is_empty() {
        return Err(anyhow!("No predictor columns left after dropping identifiers"));
    }

    let mut values = Vec::new();
    let mut outcome = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        outcome.push(parse_cell(&record, &headers, outcome_idx, row_idx)?);
        for &idx in &predictor_indices {
            values.push(parse_cell(&record, &headers, idx, row_idx)?);
        }
    }

    let n_rows = outcome.len();
    let n_predictors = predictor_indices.len();
    let predictors = Array2::from_shape_vec((n_rows, n_predictors), values)
        .context("Failed to build predictor matrix")?;

    let predictor_names = predictor_indices
        .iter()
        .map(|&idx| headers.get(idx).unwrap_or("").to_string())
        .collect();

    Ok(ObservationTable::new(
        predictors,
        Array1::from_vec(outcome),
        predictor_names,
        headers.get(outcome_idx).unwrap_or("").to_string(),
    ))
}

/// Read the item-response table, dropping identifier columns.
pub fn read_item_csv<P: AsRef<Path>>(path: P, id_columns: &[String]) -> Result<ItemTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open item file: {}", path.as_ref().display()))?;

    let headers = reader
        .headers()
        .context("Failed to read item header row")?
        .clone();

    let id_set: HashSet<String> = id_columns
        .iter()
        .map(|name| name.to_ascii_lowercase())
        .collect();

    let mut item_indices = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if id_set.contains(&header.to_ascii_lowercase()) {
            continue;
        }
        item_indices.push(idx);
    }
    if item_indices.is_empty() {
        return Err(anyhow!("No item columns left after dropping identifiers"));
    }

    let mut values = Vec::new();
    let mut n_rows = 0;
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        for &idx in &item_indices {
            values.push(parse_cell(&record, &headers, idx, row_idx)?);
        }
        n_rows += 1;
    }

    let items = Array2::from_shape_vec((n_rows, item_indices.len()), values)
        .context("Failed to build item matrix")?;

    let item_names = item_indices
        .iter()
        .map(|&idx| headers.get(idx).unwrap_or("").to_string())
        .collect();

    Ok(ItemTable::new(items, item_names))
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
}

fn parse_cell(
    record: &StringRecord,
    headers: &StringRecord,
    idx: usize,
    row_idx: usize,
) -> Result<f64> {
    let value = record
        .get(idx)
        .ok_or_else(|| anyhow!("Missing value at row {}", row_idx + 1))?;
    value.trim().parse::<f64>().with_context(|| {
        format!(
            "Invalid numeric value '{}' in column '{}' at row {}",
            value,
            headers.get(idx).unwrap_or(""),
            row_idx + 1
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        let unique = format!(
            "distress_io_test_{}_{}.csv",
            std::process::id(),
            contents.len()
        );
        path.push(unique);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_observation_table_and_drops_id() {
        let path = write_temp(
            "subject_id,anxiety,neuroticism,distress_score\n\
             s1,0.5,-0.2,1.1\n\
             s2,-0.1,0.3,0.2\n",
        );
        let table = read_observation_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.predictor_names, vec!["anxiety", "neuroticism"]);
        assert_eq!(table.outcome_name, "distress_score");
        assert_eq!(table.outcome[1], 0.2);
        assert_eq!(table.predictors[(0, 1)], -0.2);
    }

    #[test]
    fn missing_outcome_column_is_reported() {
        let path = write_temp("subject_id,a,b\ns1,1,2\n");
        let err = read_observation_csv(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(err.to_string().contains("distress_score"));
    }

    #[test]
    fn reads_item_table() {
        let path = write_temp("id,item1,item2,item3\ns1,1,2,3\ns2,4,5,6\n");
        let table = read_item_csv(&path, &["id".to_string()]).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_items(), 3);
        assert_eq!(table.items[(1, 2)], 6.0);
    }
}
