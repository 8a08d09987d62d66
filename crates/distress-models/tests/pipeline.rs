//! Integration tests for the full selection pipeline on synthetic survey data.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use distress_models::comparison::{compare_estimates, DomainCategory, EstimateClass};
use distress_models::data::ObservationTable;
use distress_models::evaluation::evaluate;
use distress_models::partition::stratified_split;
use distress_models::selection::{
    benchmark_forest, benchmark_lasso, refit_full, select_stepwise_model,
};
use distress_models::models::forest::ForestParams;
use distress_models::models::lasso::LassoParams;

/// 1000 subjects, 5 predictors, of which only x1 and x4 carry signal.
fn survey_table(seed: u64, noise: f64) -> ObservationTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = 1000;
    let x = Array2::from_shape_fn((n, 5), |_| rng.gen_range(-1.0..1.0));
    let y = Array1::from_shape_fn(n, |i| {
        1.5 * x[(i, 0)] - 2.0 * x[(i, 3)] + rng.gen_range(-noise..noise)
    });
    let names = (1..=5).map(|j| format!("x{}", j)).collect();
    ObservationTable::new(x, y, names, "distress_score".to_string())
}

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

#[test]
fn partition_is_deterministic_disjoint_and_sized() {
    let table = survey_table(123, 0.3);
    let a = stratified_split(&table, 0.75, 123).unwrap();
    let b = stratified_split(&table, 0.75, 123).unwrap();
    assert_eq!(a.train, b.train);
    assert_eq!(a.test, b.test);

    let mut all: Vec<usize> = a.train.iter().chain(a.test.iter()).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..table.n_rows()).collect::<Vec<_>>());

    let share = a.train.len() as f64 / table.n_rows() as f64;
    assert!((share - 0.75).abs() < 0.01);
}

// ---------------------------------------------------------------------------
// End-to-end stepwise selection
// ---------------------------------------------------------------------------

#[test]
fn stepwise_pipeline_recovers_the_true_predictors() {
    let table = survey_table(123, 0.3);
    let partition = stratified_split(&table, 0.75, 123).unwrap();
    let train = table.select_rows(&partition.train);
    let test = table.select_rows(&partition.test);

    let selected = select_stepwise_model(&train, 10, 123, Some(2)).unwrap();

    // The two signal carriers must be selected; at this noise level at most
    // one spurious predictor survives the AIC penalty.
    assert!(selected.predictors.contains(&"x1".to_string()));
    assert!(selected.predictors.contains(&"x4".to_string()));
    assert!(selected.predictors.len() <= 3);

    // Held-out performance reflects the strong signal.
    let x_test = test.predictor_subset(&selected.predictors).unwrap();
    let metrics = evaluate(&selected.model, &x_test, &test.outcome).unwrap();
    assert!(metrics.r_squared > 0.9);
    assert!(metrics.pearson_r > 0.9);

    // Cross-validation aggregated all ten folds.
    assert_eq!(selected.cv.folds, 10);
    assert!(selected.cv.r_squared > 0.8);
}

#[test]
fn refit_formula_matches_the_selected_set() {
    let table = survey_table(123, 0.3);
    let partition = stratified_split(&table, 0.75, 123).unwrap();
    let train = table.select_rows(&partition.train);

    let selected = select_stepwise_model(&train, 10, 123, Some(2)).unwrap();
    let full_fit = refit_full(&table, &selected.predictors).unwrap();

    let mut refit_names = full_fit.predictor_names.clone();
    let mut selected_names = selected.predictors.clone();
    refit_names.sort();
    selected_names.sort();
    assert_eq!(refit_names, selected_names);

    // Full-data refit recovers the generating coefficients.
    let idx1 = full_fit
        .predictor_names
        .iter()
        .position(|n| n == "x1")
        .unwrap();
    let idx4 = full_fit
        .predictor_names
        .iter()
        .position(|n| n == "x4")
        .unwrap();
    assert!((full_fit.coefficients[idx1] - 1.5).abs() < 0.1);
    assert!((full_fit.coefficients[idx4] + 2.0).abs() < 0.1);
}

// ---------------------------------------------------------------------------
// Benchmarks under the shared fold protocol
// ---------------------------------------------------------------------------

#[test]
fn benchmarks_track_the_signal_on_held_out_rows() {
    let table = survey_table(123, 0.3);
    let partition = stratified_split(&table, 0.75, 123).unwrap();
    let train = table.select_rows(&partition.train);
    let test = table.select_rows(&partition.test);

    let forest_params = ForestParams {
        n_trees: 50,
        max_depth: 8,
        min_samples_leaf: 5,
        mtry: Some(2),
    };
    let (forest, forest_cv) = benchmark_forest(&train, &forest_params, 5, 123, Some(2)).unwrap();
    let forest_metrics = evaluate(&forest, &test.predictors, &test.outcome).unwrap();
    assert!(forest_metrics.r_squared > 0.5);
    assert_eq!(forest_cv.folds, 5);

    let (lasso, lasso_cv) =
        benchmark_lasso(&train, &LassoParams::default(), 5, 123, Some(2)).unwrap();
    let lasso_metrics = evaluate(&lasso, &test.predictors, &test.outcome).unwrap();
    assert!(lasso_metrics.r_squared > 0.9);
    assert_eq!(lasso_cv.folds, 5);

    // The lasso keeps the signal coefficients and shrinks the noise ones.
    assert!(lasso.coefficients[0].abs() > 1.0);
    assert!(lasso.coefficients[3].abs() > 1.5);
    assert!(lasso.coefficients[2].abs() < 0.1);
}

// ---------------------------------------------------------------------------
// Estimate comparison on the full table
// ---------------------------------------------------------------------------

#[test]
fn comparison_joins_only_categorized_predictors() {
    let table = survey_table(123, 0.3);
    let partition = stratified_split(&table, 0.75, 123).unwrap();
    let train = table.select_rows(&partition.train);

    let selected = select_stepwise_model(&train, 10, 123, Some(2)).unwrap();
    let full_fit = refit_full(&table, &selected.predictors).unwrap();

    let mut categories = HashMap::new();
    categories.insert("x1".to_string(), DomainCategory::MentalHealth);
    categories.insert("x4".to_string(), DomainCategory::CovidMeasure);
    let labels = HashMap::new();

    let records = compare_estimates(&full_fit, &table, &categories, &labels).unwrap();

    // Only the two categorized predictors survive the join, whatever else
    // the search may have picked up.
    assert_eq!(records.len(), 2);
    for record in &records {
        assert!(record.predictor == "x1" || record.predictor == "x4");
        assert_eq!(record.marginal.band, "***");
        // Multivariate coefficients exceed the marginal correlations here
        // because the outcome mixes two predictors.
        assert_eq!(record.classification, Some(EstimateClass::UnderEstimate));
    }
}
