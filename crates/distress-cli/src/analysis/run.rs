//! End-to-end orchestration of the analysis pipeline.
//!
//! Load → partition → stepwise selection → benchmarks → held-out evaluation
//! → full-data refit → estimate comparison → reliability → figures/report.
//! Every stage is fallible and aborts the run; there are no partial-failure
//! semantics in a batch analysis.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use maud::html;

use distress_models::comparison::compare_estimates;
use distress_models::config::AnalysisConfig;
use distress_models::evaluation::evaluate;
use distress_models::io::{read_item_csv, read_observation_csv_with_config, ObservationReaderConfig};
use distress_models::models::RegressionModel;
use distress_models::partition::stratified_split;
use distress_models::reliability::assess_reliability;
use distress_models::report::plots::{
    plot_coefficients, plot_correlation_network, plot_estimate_comparison,
    plot_prediction_scatter,
};
use distress_models::report::report::{
    coefficient_table, performance_table, reliability_table,
};
use distress_models::report::AnalysisReport;
use distress_models::selection::{
    benchmark_forest, benchmark_lasso, refit_full, select_stepwise_model,
};

/// File inputs and output location for one run.
pub struct RunArgs {
    pub observations: PathBuf,
    /// Item-level responses; reliability is skipped when absent.
    pub items: Option<PathBuf>,
    pub output_dir: PathBuf,
}

/// Load an analysis configuration from a JSON file.
pub fn load_analysis_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: AnalysisConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

/// Run the whole pipeline and write figures plus the HTML report.
pub fn run_analysis(args: &RunArgs, config: &AnalysisConfig) -> Result<()> {
    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("Failed to create output directory: {}", args.output_dir.display())
    })?;

    let reader = ObservationReaderConfig {
        outcome_column: config.outcome_column.clone(),
        id_columns: config.id_columns.clone(),
    };
    let table = read_observation_csv_with_config(&args.observations, &reader)?;
    table.log_input_summary();

    let partition = stratified_split(&table, config.train_fraction, config.seed)?;
    let train = table.select_rows(&partition.train);
    let test = table.select_rows(&partition.test);
    log::info!(
        "Partition: {} train / {} test rows (seed {})",
        train.n_rows(),
        test.n_rows(),
        config.seed
    );

    // Stepwise selection with its cross-validation summary.
    let selected = select_stepwise_model(&train, config.folds, config.seed, config.workers)?;
    log::info!("Selected predictors: {}", selected.predictors.join(", "));

    // Benchmarks under the same fold protocol.
    let (forest, forest_cv) =
        benchmark_forest(&train, &config.forest, config.folds, config.seed, config.workers)?;
    let (lasso, lasso_cv) =
        benchmark_lasso(&train, &config.lasso, config.folds, config.seed, config.workers)?;

    // Held-out evaluation of all three fitters.
    let x_test = test.predictor_subset(&selected.predictors)?;
    let stepwise_test = evaluate(&selected.model, &x_test, &test.outcome)?;
    let forest_test = evaluate(&forest, &test.predictors, &test.outcome)?;
    let lasso_test = evaluate(&lasso, &test.predictors, &test.outcome)?;
    log::info!(
        "Held-out R²: stepwise {:.3}, forest {:.3}, lasso {:.3}",
        stepwise_test.r_squared,
        forest_test.r_squared,
        lasso_test.r_squared
    );

    // Final inference comes from the full-data refit of the selected formula.
    let full_fit = refit_full(&table, &selected.predictors)?;
    let records = compare_estimates(&full_fit, &table, &config.categories, &config.labels)?;

    let reliability = match &args.items {
        Some(path) => {
            let items = read_item_csv(path, &config.id_columns)?;
            Some(assess_reliability(
                &items,
                &config.reverse_keyed_items,
                config.scale_min,
                config.scale_max,
            )?)
        }
        None => None,
    };

    // Figures.
    let predictions = selected.model.predict(&x_test)?;
    let scatter = plot_prediction_scatter(
        &predictions,
        &test.outcome,
        "Predicted vs observed distress (held-out subjects)",
    );
    scatter.write_html(args.output_dir.join("prediction_scatter.html"));

    let coefficients = plot_coefficients(&full_fit, "Full-data OLS coefficients");
    coefficients.write_html(args.output_dir.join("coefficients.html"));

    let comparison = plot_estimate_comparison(
        &records,
        "Cross-validated vs marginal estimates",
    );
    comparison.write_html(args.output_dir.join("estimate_comparison.html"));

    if config.export_correlation_graph {
        let network = plot_correlation_network(&table, 0.2, "Predictor correlation network");
        network.write_html(args.output_dir.join("correlation_network.html"));
    }

    // HTML report.
    let mut report = AnalysisReport::new("COVID-19 distress model comparison");

    report.add_section("Data and partition");
    report.add_content(html! {
        p {
            (format!(
                "{} subjects, {} predictors; {} train / {} test (fraction {:.2}, seed {}).",
                table.n_rows(),
                table.n_predictors(),
                train.n_rows(),
                test.n_rows(),
                config.train_fraction,
                config.seed
            ))
        }
    });

    report.add_section("Model performance");
    report.add_content(performance_table(&[
        ("Stepwise OLS", selected.cv, stepwise_test),
        ("Random forest", forest_cv, forest_test),
        ("Lasso", lasso_cv, lasso_test),
    ]));
    report.add_plot(&scatter);

    if config.export_regression_tables {
        report.add_section("Final model");
        report.add_content(coefficient_table(&full_fit));
        report.add_plot(&coefficients);
    }

    report.add_section("Estimate comparison");
    report.add_content(html! {
        p {
            (format!(
                "{} categorized predictors joined against marginal correlations.",
                records.len()
            ))
        }
    });
    report.add_plot(&comparison);

    if let Some(reliability) = &reliability {
        report.add_section("Scale reliability");
        report.add_content(reliability_table(reliability));
    }

    report.save_to_file(args.output_dir.join("analysis_report.html"))?;
    Ok(())
}
