mod dedup;
mod training;

pub use dedup::DedupConfig;
pub use training::TrainingConfig;

use crate::{OrchestratorError, Result};

/// Dataset names are plain directory names below the data directory.
fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(OrchestratorError::InvalidConfig(format!(
            "{what} `{name}` is not a valid dataset name"
        )));
    }

    Ok(())
}
