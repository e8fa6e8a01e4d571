use std::{path::PathBuf, process};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use dataset::Catalog;
use log::error;
use machine_learning::BackendKind;
use orchestrator::{
    RoomPredictor,
    configs::{DedupConfig, TrainingConfig},
};

#[derive(Parser)]
#[command(name = "room-presence")]
#[command(about = "Compacts sensor datasets and trains room presence classifiers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Remove consecutive duplicate samples from every partition of a dataset
    Dedup {
        /// Dataset to read from
        source: String,

        /// Dataset to write the compacted partitions to
        target: String,

        /// Directory holding the datasets
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Train, compare and export the classifier backends on a dataset
    Train {
        /// Dataset to train on
        dataset: String,

        /// Backend to train
        #[arg(short, long, value_enum, default_value_t = ModelChoice::All)]
        model: ModelChoice,

        /// Directory the run's artifacts are written to
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Directory holding the datasets
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Config file with the room catalog and the sensor order
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Predict the room of a single feature vector with an exported model
    Predict {
        /// Dataset the model was trained on
        dataset: String,

        /// Comma separated feature vector, in sensor order
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        vector: Vec<f64>,

        /// Backend to load
        #[arg(short, long, value_enum, default_value_t = ModelChoice::Forest)]
        model: ModelChoice,

        /// Directory the run's artifacts were written to
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelChoice {
    #[value(alias = "rf")]
    Forest,
    #[value(alias = "xgb")]
    Boosted,
    #[value(alias = "mlp")]
    Network,
    All,
}

impl ModelChoice {
    fn backends(self) -> Vec<BackendKind> {
        match self {
            Self::Forest => vec![BackendKind::Forest],
            Self::Boosted => vec![BackendKind::Boosted],
            Self::Network => vec![BackendKind::Network],
            Self::All => BackendKind::ALL.to_vec(),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        error!("{e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Dedup {
            source,
            target,
            data_dir,
        } => {
            let report = orchestrator::deduplicate(&DedupConfig::new(data_dir, source, target))?;
            println!("{report}");
        }
        Command::Train {
            dataset,
            model,
            output,
            data_dir,
            config,
        } => {
            let catalog = Catalog::load(&config)
                .with_context(|| format!("loading the catalog from {}", config.display()))?;
            let config = TrainingConfig::new(data_dir, dataset, output, model.backends());

            let run = orchestrator::train(&config, &catalog)?;
            println!("{}\n", run.data.summary);
            println!("{}", run.report());
            println!(
                "\nSaved {} model(s) and metadata to {}",
                run.metadata.artifacts.len(),
                config.run_dir().display()
            );
        }
        Command::Predict {
            dataset,
            vector,
            model,
            output,
        } => {
            let backends = model.backends();
            let &[kind] = backends.as_slice() else {
                bail!("predict needs a single backend, not `all`");
            };

            let predictor = RoomPredictor::load(&output.join(dataset), kind)?;
            println!("{}", predictor.predict(&vector)?);
        }
    }

    Ok(())
}
