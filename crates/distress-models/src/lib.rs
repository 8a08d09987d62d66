//! distress-models: model fitting and comparison for the distress survey study.
//!
//! This crate implements the analysis pipeline behind the manuscript: loading
//! the two survey tables, a seeded stratified train/test partition,
//! cross-validated bidirectional stepwise OLS selection by AIC, random-forest
//! and lasso baselines under the same fold protocol, held-out evaluation, a
//! full-data refit of the selected formula, the cross-validated-vs-marginal
//! estimate comparison, scale reliability coefficients, and the plotly/HTML
//! reporting layer.
//!
//! The design favors small, testable modules; every fitting call takes its
//! seed and fold count explicitly so a run is a pure function of its inputs.
pub mod comparison;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod io;
pub mod math;
pub mod models;
pub mod partition;
pub mod reliability;
pub mod report;
pub mod selection;
