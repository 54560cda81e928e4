use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgMatches, Command};
use log::LevelFilter;

use fraudwatch_cli::input::{
    schema_command, serve_command, serve_config_from_arguments, train_command,
    train_config_from_arguments,
};
use fraudwatch_cli::serve::run_serve;
use fraudwatch_pipeline::dataset::infer_schema;
use fraudwatch_pipeline::trainer::run_training;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("FRAUDWATCH_LOG", "error,fraudwatch=info"))
        .init();

    let matches = Command::new("fraudwatch")
        .version(clap::crate_version!())
        .about("Transaction fraud classifier: train the stacked ensemble and serve predictions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(train_command())
        .subcommand(serve_command())
        .subcommand(schema_command())
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("serve", sub_m)) => handle_serve(sub_m),
        Some(("schema", sub_m)) => handle_schema(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config = train_config_from_arguments(matches)?;
    log::info!(
        "[fraudwatch::train] Training '{}' from {}",
        config.model_name,
        config.dataset_path
    );

    match run_training(&config) {
        Ok(summary) => {
            println!(
                "Trained '{}' on {} rows ({} held out): accuracy={:.4} roc_auc={:.4}",
                config.model_name,
                summary.n_train + summary.n_test,
                summary.n_test,
                summary.metrics.accuracy,
                summary.metrics.roc_auc
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_serve(matches: &ArgMatches) -> Result<()> {
    let (config, options) = serve_config_from_arguments(matches)?;
    log::info!(
        "[fraudwatch::serve] Loading model from {}",
        config.model_path
    );

    let runtime = tokio::runtime::Runtime::new()?;
    match runtime.block_on(run_serve(&config, &options)) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("Service failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_schema(matches: &ArgMatches) -> Result<()> {
    let data: &PathBuf = matches.get_one("data").unwrap();
    let label: &String = matches.get_one("label").unwrap();
    let sample_rows: usize = *matches.get_one("sample_rows").unwrap();

    let schema = infer_schema(data, label, sample_rows)?;
    let json = serde_json::to_string_pretty(&schema)?;

    match matches.get_one::<PathBuf>("output_file") {
        Some(output) => {
            std::fs::write(output, json)?;
            log::info!("Schema written to {}", output.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
