//! Runs the room presence workflows end to end: compacting datasets, training and comparing
//! the classifier backends, exporting their artifacts and loading them back for inference.

pub mod configs;
pub mod dedup;
pub mod error;
pub mod export;
pub mod harness;
pub mod inference;
pub mod metadata;
pub mod pipeline;
pub mod report;

use dataset::Catalog;
use log::info;

pub use dedup::{DedupReport, deduplicate};
pub use error::{OrchestratorError, Result};
pub use harness::Evaluations;
pub use inference::RoomPredictor;
pub use metadata::MetadataRecord;
pub use pipeline::PreparedData;

use crate::{configs::TrainingConfig, report::RunReport};

/// Everything a finished training run produced.
#[derive(Debug)]
pub struct TrainingRun {
    pub data: PreparedData,
    pub evaluations: Evaluations,
    pub metadata: MetadataRecord,
}

impl TrainingRun {
    pub fn report(&self) -> RunReport<'_> {
        RunReport::new(&self.evaluations, &self.data.labels)
    }
}

/// Trains every requested backend on a dataset and exports the results.
///
/// Nothing is written to the output directory unless at least one backend was trained.
///
/// # Errors
/// Returns an `OrchestratorError` on invalid configs, unusable datasets, when no backend could
/// be trained or when writing the outputs fails.
pub fn train(config: &TrainingConfig, catalog: &Catalog) -> Result<TrainingRun> {
    config.validate()?;

    info!("loading {}", config.source_dir().display());
    let data = pipeline::load(&config.source_dir(), catalog)?;
    info!(
        samples = data.y.len(),
        classes = data.labels.len();
        "prepared the dataset"
    );

    let evaluations = harness::evaluate(
        data.x.view(),
        &data.y,
        data.labels.len(),
        &catalog.feature_names(),
        config,
    )?;

    let run_id = export::new_run_id();
    let metadata = export::export(
        &config.run_dir(),
        &evaluations,
        &data.labels,
        catalog,
        &run_id,
    )?;

    Ok(TrainingRun {
        data,
        evaluations,
        metadata,
    })
}
