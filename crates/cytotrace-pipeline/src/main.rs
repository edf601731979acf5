//! `cytotrace` command-line entry point.
//!
//! Subcommands:
//!   train     -- fit the scaler and classifier, persist both, print metrics
//!   predict   -- classify one feature vector with the persisted artifacts
//!   evaluate  -- re-score the held-out split through the persisted artifacts
//!   profile   -- per-feature ranges and defaults of the dataset

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use cytotrace_core::{LoggingConfig, PipelineConfig, Prediction};
use cytotrace_model::Predictor;
use cytotrace_pipeline::config::{resolve_config, CONFIG_ENV_VAR};
use cytotrace_pipeline::dataset::DatasetLoader;
use cytotrace_pipeline::evaluation::evaluate;
use cytotrace_pipeline::profile::FeatureProfile;
use cytotrace_pipeline::training::trainer;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "cytotrace",
    version,
    about = "Breast mass diagnosis from cell nuclei measurements"
)]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Dataset CSV (overrides `dataset_path`).
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Artifact directory (overrides `artifact_dir`).
    #[arg(long, global = true)]
    artifact_dir: Option<PathBuf>,

    /// Split seed (overrides `seed`).
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the scaler and classifier and persist them.
    Train,

    /// Classify one sample with the persisted artifacts.
    Predict {
        /// JSON object mapping every feature name to its value, or a path to
        /// a file containing one.
        #[arg(long, conflicts_with = "defaults", required_unless_present = "defaults")]
        input: Option<String>,

        /// Use the dataset mean of every feature as the input.
        #[arg(long)]
        defaults: bool,

        /// Print the prediction as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Re-score the held-out split through the persisted artifacts.
    Evaluate {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show per-feature ranges and defaults of the dataset.
    Profile {
        /// Print the profile as JSON.
        #[arg(long)]
        json: bool,

        /// Print the radar series of the default input instead.
        #[arg(long)]
        radar: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging);
    match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loaded configuration from file")
        }
        None => tracing::info!("No config file specified, using defaults"),
    }

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = resolve_config(cli.config.as_deref())?;
    if let Some(dataset) = &cli.dataset {
        config.dataset_path = dataset.clone();
    }
    if let Some(dir) = &cli.artifact_dir {
        config.artifact_dir = dir.clone();
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(command: Command, config: &PipelineConfig) -> anyhow::Result<()> {
    match command {
        Command::Train => {
            let outcome = trainer::train(config)?;
            println!(
                "\nFit: {} epochs, final loss {:.6}",
                outcome.fit.epochs, outcome.fit.final_loss
            );
        }

        Command::Predict {
            input,
            defaults,
            json,
        } => {
            let predictor = Predictor::load(&config.artifact_dir)?;
            let prediction = match input {
                Some(raw) => predictor.predict_named(&parse_input(&raw)?)?,
                None if defaults => {
                    let dataset = DatasetLoader::load(&config.dataset_path)?;
                    let features = FeatureProfile::from_dataset(&dataset)?.defaults()?;
                    predictor.predict(&features)?
                }
                None => bail!("either --input or --defaults is required"),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                print_prediction(&prediction);
            }
        }

        Command::Evaluate { json } => {
            let report = evaluate(config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Fingerprint: {}", report.fingerprint);
                println!("Test rows:   {}", report.test_size);
                println!("{}", report.metrics);
                println!("\n{}", report.classification_report);
            }
        }

        Command::Profile { json, radar } => {
            let dataset = DatasetLoader::load(&config.dataset_path)?;
            let profile = FeatureProfile::from_dataset(&dataset)?;
            if radar {
                let series = profile.radar(&profile.defaults()?);
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                println!("{:<28} {:>12} {:>12} {:>12}", "feature", "min", "max", "mean");
                for stats in &profile.features {
                    println!(
                        "{:<28} {:>12.4} {:>12.4} {:>12.4}",
                        stats.label, stats.min, stats.max, stats.mean
                    );
                }
            }
        }
    }
    Ok(())
}

/// Accept either an inline JSON object or a path to a JSON file.
fn parse_input(raw: &str) -> anyhow::Result<HashMap<String, f64>> {
    let text = if raw.trim_start().starts_with('{') {
        raw.to_string()
    } else {
        std::fs::read_to_string(Path::new(raw))
            .with_context(|| format!("Failed to read input file {raw}"))?
    };
    serde_json::from_str(&text).context("Input must be a JSON object of feature values")
}

fn print_prediction(prediction: &Prediction) {
    println!("Cell cluster prediction");
    println!("The cell cluster is: {}", prediction.diagnosis);
    println!(
        "Probability of being benign:    {:.4}",
        prediction.probabilities.benign
    );
    println!(
        "Probability of being malignant: {:.4}",
        prediction.probabilities.malignant
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_flag_reads_env_var() {
        let cmd = Cli::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id() == "config")
            .unwrap();
        assert_eq!(arg.get_env(), Some(std::ffi::OsStr::new(CONFIG_ENV_VAR)));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"seed: 5\ndataset_path: from-file.csv\n").unwrap();
        let path = f.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "cytotrace",
            "--config",
            path.as_str(),
            "--seed",
            "9",
            "evaluate",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.dataset_path, PathBuf::from("from-file.csv"));
    }

    #[test]
    fn test_predict_requires_input_or_defaults() {
        assert!(Cli::try_parse_from(["cytotrace", "predict"]).is_err());
        assert!(Cli::try_parse_from(["cytotrace", "predict", "--defaults"]).is_ok());
    }
}
