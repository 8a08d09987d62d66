//! Plotly figure builders for the manuscript outputs.

use ndarray::Array1;
use plotly::common::{ErrorData, ErrorType, Line, Mode};
use plotly::layout::{Axis, Layout};
use plotly::{Bar, Plot, Scatter};

use crate::comparison::EstimateRecord;
use crate::data::ObservationTable;
use crate::evaluation::pearson;
use crate::models::linear::LinearFit;

/// Fixed axis bounds for the prediction-vs-observed scatter, matching the
/// standardized outcome scale of the manuscript figures.
const PREDICTION_AXIS_BOUNDS: (f64, f64) = (-2.2, 2.4);

/// Fixed axis bounds for the CV-vs-marginal comparison scatter.
const COMPARISON_AXIS_BOUNDS: (f64, f64) = (-0.2, 0.7);

/// Scatter of predicted against observed outcome on the held-out rows, with
/// a dashed identity line for reference.
pub fn plot_prediction_scatter(
    predicted: &Array1<f64>,
    observed: &Array1<f64>,
    title: &str,
) -> Plot {
    assert_eq!(predicted.len(), observed.len());
    let (lo, hi) = PREDICTION_AXIS_BOUNDS;

    let points = Scatter::new(observed.to_vec(), predicted.to_vec())
        .mode(Mode::Markers)
        .name("Test subjects");
    let identity = Scatter::new(vec![lo, hi], vec![lo, hi])
        .mode(Mode::Lines)
        .name("Perfect prediction")
        .line(Line::new().color("red").dash(plotly::common::DashType::Dash));

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Observed distress").range(vec![lo, hi]))
        .y_axis(Axis::new().title("Predicted distress").range(vec![lo, hi]));

    let mut plot = Plot::new();
    plot.add_trace(points);
    plot.add_trace(identity);
    plot.set_layout(layout);
    plot
}

/// Bar chart of the full-data coefficients with standard-error bars; each
/// bar is annotated with its significance band.
pub fn plot_coefficients(fit: &LinearFit, title: &str) -> Plot {
    let entries = fit.slope_entries();
    let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
    let estimates: Vec<f64> = entries.iter().map(|e| e.estimate).collect();
    let errors: Vec<f64> = entries.iter().map(|e| e.std_error).collect();
    let bands: Vec<String> = entries.iter().map(|e| e.band.to_string()).collect();

    let bars = Bar::new(names, estimates)
        .name("OLS estimate")
        .text_array(bands)
        .error_y(ErrorData::new(ErrorType::Data).array(errors));

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Predictor"))
        .y_axis(Axis::new().title("Coefficient"));

    let mut plot = Plot::new();
    plot.add_trace(bars);
    plot.set_layout(layout);
    plot
}

/// Scatter of cross-validated coefficients against marginal correlations,
/// one trace per domain category, on fixed axes with an identity reference.
pub fn plot_estimate_comparison(records: &[EstimateRecord], title: &str) -> Plot {
    let (lo, hi) = COMPARISON_AXIS_BOUNDS;
    let mut plot = Plot::new();

    let mut categories: Vec<_> = records.iter().map(|r| r.category).collect();
    categories.sort_by_key(|c| c.as_str());
    categories.dedup();

    for category in categories {
        let members: Vec<&EstimateRecord> = records
            .iter()
            .filter(|r| r.category == category)
            .collect();
        let x: Vec<f64> = members.iter().map(|r| r.marginal.r).collect();
        let y: Vec<f64> = members.iter().map(|r| r.cv_estimate).collect();
        let labels: Vec<String> = members.iter().map(|r| r.display_label.clone()).collect();

        let trace = Scatter::new(x, y)
            .mode(Mode::Markers)
            .name(category.as_str())
            .text_array(labels);
        plot.add_trace(trace);
    }

    let identity = Scatter::new(vec![lo, hi], vec![lo, hi])
        .mode(Mode::Lines)
        .name("Equal estimates")
        .line(Line::new().color("grey").dash(plotly::common::DashType::Dot));
    plot.add_trace(identity);

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Marginal correlation").range(vec![lo, hi]))
        .y_axis(
            Axis::new()
                .title("Cross-validated coefficient")
                .range(vec![lo, hi]),
        );
    plot.set_layout(layout);
    plot
}

/// Correlation network over the predictors: nodes on a circle, one edge per
/// pair whose absolute correlation exceeds the threshold.
pub fn plot_correlation_network(
    table: &ObservationTable,
    threshold: f64,
    title: &str,
) -> Plot {
    let p = table.n_predictors();
    let positions: Vec<(f64, f64)> = (0..p)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / p as f64;
            (angle.cos(), angle.sin())
        })
        .collect();

    let mut plot = Plot::new();

    for a in 0..p {
        let col_a = table.predictors.column(a).to_owned();
        for b in (a + 1)..p {
            let col_b = table.predictors.column(b).to_owned();
            let r = pearson(&col_a, &col_b);
            if r.abs() <= threshold {
                continue;
            }
            let color = if r > 0.0 { "steelblue" } else { "indianred" };
            let edge = Scatter::new(
                vec![positions[a].0, positions[b].0],
                vec![positions[a].1, positions[b].1],
            )
            .mode(Mode::Lines)
            .show_legend(false)
            .line(Line::new().color(color).width((r.abs() * 6.0).max(1.0)));
            plot.add_trace(edge);
        }
    }

    let nodes = Scatter::new(
        positions.iter().map(|p| p.0).collect::<Vec<_>>(),
        positions.iter().map(|p| p.1).collect::<Vec<_>>(),
    )
    .mode(Mode::Markers)
    .name("Predictors")
    .text_array(table.predictor_names.clone());
    plot.add_trace(nodes);

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().visible(false))
        .y_axis(Axis::new().visible(false));
    plot.set_layout(layout);
    plot
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::models::linear::fit_ols;

    #[test]
    fn prediction_scatter_has_points_and_reference() {
        let predicted = Array1::from_vec(vec![0.1, 0.5, -0.3]);
        let observed = Array1::from_vec(vec![0.2, 0.4, -0.5]);
        let plot = plot_prediction_scatter(&predicted, &observed, "Held-out predictions");
        let rendered = plot.to_inline_html(Some("scatter-test"));
        assert!(rendered.contains("Test subjects"));
        assert!(rendered.contains("Perfect prediction"));
    }

    #[test]
    fn coefficient_chart_covers_every_slope() {
        let mut rng = StdRng::seed_from_u64(61);
        let x = Array2::from_shape_fn((80, 3), |_| rng.gen_range(-1.0..1.0));
        let y = Array1::from_shape_fn(80, |i| x[(i, 0)] + rng.gen_range(-0.1..0.1));
        let names = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let fit = fit_ols(&x, &y, &names).unwrap();

        let plot = plot_coefficients(&fit, "Final model");
        let rendered = plot.to_inline_html(Some("coef-test"));
        for name in &names {
            assert!(rendered.contains(name.as_str()));
        }
    }

    #[test]
    fn network_skips_weak_edges() {
        let mut rng = StdRng::seed_from_u64(62);
        // Two independent columns: no edge should survive a high threshold.
        let x = Array2::from_shape_fn((200, 2), |_| rng.gen_range(-1.0..1.0));
        let y = Array1::zeros(200);
        let table = ObservationTable::new(
            x,
            y,
            vec!["a".to_string(), "b".to_string()],
            "distress_score".to_string(),
        );
        let plot = plot_correlation_network(&table, 0.9, "Network");
        let rendered = plot.to_inline_html(Some("network-test"));
        assert!(rendered.contains("Predictors"));
        assert!(!rendered.contains("steelblue") && !rendered.contains("indianred"));
    }
}
