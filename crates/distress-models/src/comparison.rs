//! Comparison of cross-validated coefficients against marginal estimates.
//!
//! For every predictor in the final full-data model, a univariate Pearson
//! correlation with the outcome is computed over the whole table, with a
//! Fisher-z 95% confidence interval and the same significance banding as the
//! coefficient table. Records are joined with the domain-category lookup by
//! predictor name; predictors without a category are dropped (inner join), so
//! the comparison set only contains categorized predictors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::data::ObservationTable;
use crate::error::AnalysisError;
use crate::evaluation::pearson;
use crate::models::linear::{significance_band, LinearFit};

/// Fixed domain category for a predictor, from the configuration lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainCategory {
    MentalHealth,
    Personality,
    Media,
    EmotionRegulation,
    CovidMeasure,
    Demographic,
    Social,
}

impl DomainCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainCategory::MentalHealth => "mental-health",
            DomainCategory::Personality => "personality",
            DomainCategory::Media => "media",
            DomainCategory::EmotionRegulation => "emotion-regulation",
            DomainCategory::CovidMeasure => "covid-measure",
            DomainCategory::Demographic => "demographic",
            DomainCategory::Social => "social",
        }
    }
}

/// Over-/under-estimation flag for a predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateClass {
    OverEstimate,
    UnderEstimate,
}

/// A predictor's marginal association with the outcome.
#[derive(Debug, Clone)]
pub struct MarginalEstimate {
    pub r: f64,
    /// Fisher-z 95% confidence interval for `r`.
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub p_value: f64,
    pub band: &'static str,
}

/// One row of the comparison table: a predictor's cross-validated coefficient
/// next to its marginal correlation.
#[derive(Debug, Clone)]
pub struct EstimateRecord {
    pub predictor: String,
    /// Human-readable label for figures; falls back to the predictor name.
    pub display_label: String,
    pub category: DomainCategory,
    pub cv_estimate: f64,
    pub cv_std_error: f64,
    pub cv_band: &'static str,
    pub marginal: MarginalEstimate,
    /// `None` when the two estimates disagree in sign.
    pub classification: Option<EstimateClass>,
}

/// Classify a predictor by comparing estimate magnitudes.
///
/// Smaller cross-validated magnitude at the same sign means the marginal view
/// over-estimates the association; larger means it under-estimates.
/// Sign-flipping pairs are left unclassified.
pub fn classify(cv_estimate: f64, marginal_estimate: f64) -> Option<EstimateClass> {
    if cv_estimate * marginal_estimate <= 0.0 {
        return None;
    }
    let cv_mag = cv_estimate.abs();
    let marginal_mag = marginal_estimate.abs();
    if cv_mag < marginal_mag {
        Some(EstimateClass::OverEstimate)
    } else if cv_mag > marginal_mag {
        Some(EstimateClass::UnderEstimate)
    } else {
        None
    }
}

/// Univariate Pearson test of one predictor column against the outcome.
///
/// The confidence interval uses the Fisher z transform with the standard
/// 1/√(n−3) error; the p value is the two-tailed t test with n−2 degrees of
/// freedom.
pub fn marginal_estimate(
    table: &ObservationTable,
    predictor: &str,
) -> Result<MarginalEstimate, AnalysisError> {
    let n = table.n_rows();
    if n < 4 {
        return Err(AnalysisError::InsufficientData { rows: n, required: 4 });
    }

    let column = table.predictor_column(predictor)?;
    let r = pearson(&column, &table.outcome);

    let z = 0.5 * ((1.0 + r) / (1.0 - r)).ln();
    let z_se = 1.0 / ((n as f64) - 3.0).sqrt();
    let ci_lower = (z - 1.96 * z_se).tanh();
    let ci_upper = (z + 1.96 * z_se).tanh();

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r).max(1e-12)).sqrt();
    let t_dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::SingularFit(format!("t distribution: {}", e)))?;
    let p_value = 2.0 * (1.0 - t_dist.cdf(t.abs()));

    Ok(MarginalEstimate {
        r,
        ci_lower,
        ci_upper,
        p_value,
        band: significance_band(p_value),
    })
}

/// Build the comparison table for every categorized predictor of the
/// full-data model. Predictors missing from `categories` are logged and
/// dropped.
pub fn compare_estimates(
    fit: &LinearFit,
    table: &ObservationTable,
    categories: &HashMap<String, DomainCategory>,
    labels: &HashMap<String, String>,
) -> Result<Vec<EstimateRecord>, AnalysisError> {
    let mut records = Vec::new();

    for entry in fit.slope_entries() {
        let Some(&category) = categories.get(&entry.name) else {
            log::warn!(
                "Predictor '{}' has no domain category and is excluded from the comparison",
                entry.name
            );
            continue;
        };

        let marginal = marginal_estimate(table, &entry.name)?;
        let classification = classify(entry.estimate, marginal.r);

        records.push(EstimateRecord {
            predictor: entry.name.clone(),
            display_label: labels
                .get(&entry.name)
                .cloned()
                .unwrap_or_else(|| entry.name.clone()),
            category,
            cv_estimate: entry.estimate,
            cv_std_error: entry.std_error,
            cv_band: entry.band,
            marginal,
            classification,
        });
    }

    Ok(records)
}
