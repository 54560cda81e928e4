//! Subcommand definitions and configuration assembly.
//!
//! Each subcommand reads an optional JSON configuration file and applies CLI
//! overrides on top, so a deployment can check in one config and tweak single
//! values from the orchestrator's invocation.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};

use fraudwatch_pipeline::config::PipelineConfig;

fn config_arg() -> Arg {
    Arg::new("config")
        .help("Path to the pipeline JSON configuration file. Defaults apply when omitted.")
        .required(false)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

pub fn train_command() -> Command {
    Command::new("train")
        .about("Train the stacked fraud classifier and persist its artifacts")
        .arg(config_arg())
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to the training dataset CSV. Overrides the dataset \
                     path specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("label")
                .short('l')
                .long("label")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Name of the fraud label column. Overrides the configuration file."),
        )
        .arg(
            Arg::new("model_name")
                .long("model-name")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Name under which the metrics row is stored. Overrides the \
                     configuration file.",
                ),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .help("Random seed for the split and the ensemble. Overrides the configuration file."),
        )
}

pub fn serve_command() -> Command {
    Command::new("serve")
        .about("Serve predictions over HTTP from the persisted model")
        .arg(config_arg())
        .arg(
            Arg::new("host")
                .long("host")
                .default_value("0.0.0.0")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Interface to bind."),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .default_value("8000")
                .value_parser(clap::value_parser!(u16))
                .help("Port to bind."),
        )
}

pub fn schema_command() -> Command {
    Command::new("schema")
        .about("Infer a feature schema from a dataset CSV for review and check-in")
        .arg(
            Arg::new("data")
                .help("Path to the dataset CSV")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("label")
                .short('l')
                .long("label")
                .default_value("isFraud")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Label column to exclude from the schema."),
        )
        .arg(
            Arg::new("sample_rows")
                .long("sample-rows")
                .default_value("1000")
                .value_parser(clap::value_parser!(usize))
                .help("Number of rows to scan when inferring column types."),
        )
        .arg(
            Arg::new("output_file")
                .short('o')
                .long("output")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Write the schema JSON here instead of stdout.")
                .value_hint(ValueHint::FilePath),
        )
}

/// Bind host and port for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
}

fn base_config(matches: &ArgMatches) -> Result<PipelineConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::from_file(path),
        None => {
            log::info!("No configuration file given; using built-in defaults");
            Ok(PipelineConfig::default())
        }
    }
}

/// Training configuration: file values with CLI overrides applied, dataset
/// path validated up front.
pub fn train_config_from_arguments(matches: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = base_config(matches)?;

    if let Some(data) = matches.get_one::<String>("data") {
        config.dataset_path = data.clone();
    }
    validate_csv_file(&config.dataset_path)?;

    if let Some(label) = matches.get_one::<String>("label") {
        config.label_column = label.clone();
    }
    if let Some(model_name) = matches.get_one::<String>("model_name") {
        config.model_name = model_name.clone();
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        config.model.seed = seed;
    }

    Ok(config)
}

pub fn serve_config_from_arguments(matches: &ArgMatches) -> Result<(PipelineConfig, ServeOptions)> {
    let config = base_config(matches)?;
    let options = ServeOptions {
        host: matches
            .get_one::<String>("host")
            .cloned()
            .unwrap_or_else(|| String::from("0.0.0.0")),
        port: matches.get_one::<u16>("port").copied().unwrap_or(8000),
    };
    Ok((config, options))
}

pub fn validate_csv_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);

    let ext = pb
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    if ext.as_deref() != Some("csv") {
        anyhow::bail!("Dataset must have a .csv extension: {}", path);
    }
    if !pb.exists() {
        anyhow::bail!("Dataset does not exist: {}", path);
    }
    Ok(())
}
