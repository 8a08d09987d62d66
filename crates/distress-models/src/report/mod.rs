//! Figures and the HTML summary for one analysis run.
//!
//! Plot helpers convert pipeline outputs into `plotly::Plot` values; the
//! report assembler embeds them in a single HTML document together with the
//! APA-style coefficient table and the reliability summary.

pub mod plots;
pub mod report;

pub use report::AnalysisReport;
