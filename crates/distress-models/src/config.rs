//! Central configuration for one analysis run.
//!
//! Everything that controls the pipeline is carried here explicitly: the one
//! upstream seed, the partition fraction, fold count, worker-pool size, the
//! benchmark hyper-parameters, the domain-category and display-label lookups
//! for the comparison step, and the reverse-key list for the reliability
//! scale. There is no process-global state; every fitting call receives what
//! it needs from this value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::comparison::DomainCategory;
use crate::models::forest::ForestParams;
use crate::models::lasso::LassoParams;

/// Parameters for a full analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Single upstream seed; the partition, fold assignments, and every
    /// bootstrap draw derive from it.
    pub seed: u64,
    /// Target train share of the partition, in (0, 1).
    pub train_fraction: f64,
    pub folds: usize,
    /// Worker threads per fitting call; `None` means available cores minus
    /// one.
    pub workers: Option<usize>,
    pub outcome_column: String,
    /// Identifier columns dropped on load.
    pub id_columns: Vec<String>,
    pub forest: ForestParams,
    pub lasso: LassoParams,
    /// Predictor name → domain category, for the estimate comparison.
    pub categories: HashMap<String, DomainCategory>,
    /// Predictor name → figure label; unlisted predictors keep their name.
    pub labels: HashMap<String, String>,
    /// Item names scored in the reverse direction.
    pub reverse_keyed_items: Vec<String>,
    pub scale_min: f64,
    pub scale_max: f64,
    /// Write the HTML/APA regression tables.
    pub export_regression_tables: bool,
    /// Write the predictor correlation network figure.
    pub export_correlation_graph: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: 123,
            train_fraction: 0.75,
            folds: 10,
            workers: None,
            outcome_column: "distress_score".to_string(),
            id_columns: vec![
                "subject_id".to_string(),
                "participant_id".to_string(),
                "id".to_string(),
            ],
            forest: ForestParams::default(),
            lasso: LassoParams::default(),
            categories: HashMap::new(),
            labels: HashMap::new(),
            reverse_keyed_items: Vec::new(),
            scale_min: 1.0,
            scale_max: 5.0,
            export_regression_tables: false,
            export_correlation_graph: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_manuscript_protocol() {
        let config = AnalysisConfig::default();
        assert_eq!(config.seed, 123);
        assert_eq!(config.train_fraction, 0.75);
        assert_eq!(config.folds, 10);
        assert_eq!(config.outcome_column, "distress_score");
        assert!(!config.export_regression_tables);
        assert!(!config.export_correlation_graph);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let parsed: AnalysisConfig = serde_json::from_str(
            r#"{
                "seed": 7,
                "folds": 5,
                "categories": { "anxiety": "mental-health" }
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.seed, 7);
        assert_eq!(parsed.folds, 5);
        assert_eq!(parsed.train_fraction, 0.75);
        assert_eq!(
            parsed.categories.get("anxiety"),
            Some(&DomainCategory::MentalHealth)
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut config = AnalysisConfig::default();
        config
            .labels
            .insert("neuroticism".to_string(), "Neuroticism (BFI)".to_string());
        config.reverse_keyed_items.push("item3".to_string());

        let json = serde_json::to_string(&config).unwrap();
        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seed, config.seed);
        assert_eq!(back.labels, config.labels);
        assert_eq!(back.reverse_keyed_items, config.reverse_keyed_items);
    }
}
