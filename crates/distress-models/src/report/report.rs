//! HTML report assembly.
//!
//! Sections collect maud markup and inline Plotly figures; the rendered
//! document is self-contained apart from the Plotly JS bundle, which is
//! loaded from the CDN the same way the figure files reference it.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

use crate::evaluation::TestMetrics;
use crate::models::linear::LinearFit;
use crate::reliability::ReliabilityReport;
use crate::selection::CvSummary;

enum Block {
    Content(Markup),
    Figure(String),
}

struct Section {
    heading: String,
    blocks: Vec<Block>,
}

/// An HTML report under construction.
pub struct AnalysisReport {
    title: String,
    sections: Vec<Section>,
    figure_count: usize,
}

impl AnalysisReport {
    pub fn new(title: &str) -> Self {
        AnalysisReport {
            title: title.to_string(),
            sections: Vec::new(),
            figure_count: 0,
        }
    }

    pub fn add_section(&mut self, heading: &str) {
        self.sections.push(Section {
            heading: heading.to_string(),
            blocks: Vec::new(),
        });
    }

    /// Append markup to the most recent section.
    pub fn add_content(&mut self, content: Markup) {
        if let Some(section) = self.sections.last_mut() {
            section.blocks.push(Block::Content(content));
        }
    }

    /// Append a figure to the most recent section.
    pub fn add_plot(&mut self, plot: &Plot) {
        self.figure_count += 1;
        let div_id = format!("figure-{}", self.figure_count);
        if let Some(section) = self.sections.last_mut() {
            section
                .blocks
                .push(Block::Figure(plot.to_inline_html(Some(&div_id))));
        }
    }

    pub fn render(&self) -> String {
        let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let markup = html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src="https://cdn.plot.ly/plotly-2.12.1.min.js" {}
                    style {
                        "body { font-family: sans-serif; margin: 2em; }
                         table { border-collapse: collapse; margin: 1em 0; }
                         th, td { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
                         th:first-child, td:first-child { text-align: left; }
                         .timestamp { color: #666; font-size: 0.85em; }"
                    }
                }
                body {
                    h1 { (self.title) }
                    p class="timestamp" { "Generated " (generated) }
                    @for section in &self.sections {
                        h2 { (section.heading) }
                        @for block in &section.blocks {
                            @match block {
                                Block::Content(markup) => { (markup) },
                                Block::Figure(inline) => { (PreEscaped(inline.clone())) },
                            }
                        }
                    }
                }
            }
        };
        markup.into_string()
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(&path, self.render())
            .with_context(|| format!("Failed to write report: {}", path.as_ref().display()))?;
        log::info!("Report written to {}", path.as_ref().display());
        Ok(())
    }
}

/// APA-style coefficient table for the full-data model.
pub fn coefficient_table(fit: &LinearFit) -> Markup {
    html! {
        table {
            thead {
                tr {
                    th { "Term" }
                    th { "b" }
                    th { "SE" }
                    th { "t" }
                    th { "p" }
                    th { "" }
                }
            }
            tbody {
                @for entry in &fit.entries {
                    tr {
                        td { (entry.name) }
                        td { (format!("{:.3}", entry.estimate)) }
                        td { (format!("{:.3}", entry.std_error)) }
                        td { (format!("{:.2}", entry.t_value)) }
                        td { (format_p(entry.p_value)) }
                        td { (entry.band) }
                    }
                }
            }
        }
        p {
            (format!(
                "R\u{b2} = {:.3}, residual df = {:.0}",
                fit.r_squared, fit.df_residual
            ))
        }
    }
}

/// Side-by-side performance table for the three fitters.
pub fn performance_table(rows: &[(&str, CvSummary, TestMetrics)]) -> Markup {
    html! {
        table {
            thead {
                tr {
                    th { "Model" }
                    th { "CV RMSE" }
                    th { "CV R\u{b2}" }
                    th { "CV MAE" }
                    th { "Test r" }
                    th { "Test R\u{b2}" }
                    th { "Test RMSE" }
                }
            }
            tbody {
                @for (name, cv, test) in rows {
                    tr {
                        td { (name) }
                        td { (format!("{:.3}", cv.rmse)) }
                        td { (format!("{:.3}", cv.r_squared)) }
                        td { (format!("{:.3}", cv.mae)) }
                        td { (format!("{:.3}", test.pearson_r)) }
                        td { (format!("{:.3}", test.r_squared)) }
                        td { (format!("{:.3}", test.rmse)) }
                    }
                }
            }
        }
    }
}

/// Reliability summary for the distress scale.
pub fn reliability_table(report: &ReliabilityReport) -> Markup {
    html! {
        table {
            thead {
                tr {
                    th { "Coefficient" }
                    th { "Value" }
                }
            }
            tbody {
                tr { td { "Cronbach's alpha" } td { (format!("{:.3}", report.alpha)) } }
                tr { td { "Omega (total)" } td { (format!("{:.3}", report.omega_total)) } }
                tr { td { "Omega (hierarchical)" } td { (format!("{:.3}", report.omega_hierarchical)) } }
                tr { td { "Items" } td { (report.n_items) } }
                tr { td { "Subjects" } td { (report.n_subjects) } }
            }
        }
    }
}

fn format_p(p: f64) -> String {
    if p < 0.001 {
        "< .001".to_string()
    } else {
        format!("{:.3}", p)
    }
}
