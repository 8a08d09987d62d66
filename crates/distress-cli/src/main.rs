use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use distress_cli::analysis::run::{load_analysis_config, run_analysis, RunArgs};
use distress_models::config::AnalysisConfig;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("DISTRESS_LOG", "error,distress=info"))
        .init();

    let matches = Command::new("distress")
        .version(clap::crate_version!())
        .about("Cross-validated models of COVID-19 emotional distress from survey data")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run the full analysis pipeline and write figures and the HTML report")
                .arg(
                    Arg::new("observations")
                        .help("CSV with one subject per row: scaled predictors plus the outcome column")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("items")
                        .short('i')
                        .long("items")
                        .help("CSV of item-level scale responses for reliability estimation")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(
                            "Path to a JSON analysis configuration. Omitted fields fall back \
                             to the manuscript defaults.",
                        )
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output_dir")
                        .help("Directory the figures and report are written to")
                        .default_value(".")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Override the partition seed from the configuration file")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("train_fraction")
                        .long("train_fraction")
                        .help("Override the train share of the partition, in (0, 1)")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("folds")
                        .long("folds")
                        .help("Override the cross-validation fold count")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("workers")
                        .long("workers")
                        .help("Worker threads per fitting call (default: cores - 1)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("regression_tables")
                        .long("regression-tables")
                        .help("Also export the HTML/APA regression tables")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("correlation_graph")
                        .long("correlation-graph")
                        .help("Also export the predictor correlation network figure")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("run", sub)) => {
            let config = build_config(sub)?;
            let args = RunArgs {
                observations: sub
                    .get_one::<PathBuf>("observations")
                    .cloned()
                    .expect("required argument"),
                items: sub.get_one::<PathBuf>("items").cloned(),
                output_dir: sub
                    .get_one::<PathBuf>("output_dir")
                    .cloned()
                    .expect("defaulted argument"),
            };
            run_analysis(&args, &config)
        }
        _ => unreachable!("subcommand is required"),
    }
}

/// Load the JSON configuration (or defaults) and apply flag overrides.
fn build_config(matches: &ArgMatches) -> Result<AnalysisConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_analysis_config(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(&seed) = matches.get_one::<u64>("seed") {
        config.seed = seed;
    }
    if let Some(&fraction) = matches.get_one::<f64>("train_fraction") {
        config.train_fraction = fraction;
    }
    if let Some(&folds) = matches.get_one::<usize>("folds") {
        config.folds = folds;
    }
    if let Some(&workers) = matches.get_one::<usize>("workers") {
        config.workers = Some(workers);
    }
    if matches.get_flag("regression_tables") {
        config.export_regression_tables = true;
    }
    if matches.get_flag("correlation_graph") {
        config.export_correlation_graph = true;
    }

    Ok(config)
}
