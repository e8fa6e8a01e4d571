use std::path::PathBuf;

use super::validate_name;
use crate::{OrchestratorError, Result};

/// Where a dedup run reads its partitions from and writes them to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupConfig {
    pub data_dir: PathBuf,
    pub source: String,
    pub target: String,
}

impl DedupConfig {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name("source", &self.source)?;
        validate_name("target", &self.target)?;

        if self.source == self.target {
            return Err(OrchestratorError::InvalidConfig(
                "source and target datasets must differ".into(),
            ));
        }

        Ok(())
    }

    pub fn source_dir(&self) -> PathBuf {
        self.data_dir.join(&self.source)
    }

    pub fn target_dir(&self) -> PathBuf {
        self.data_dir.join(&self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_and_target_must_differ() {
        assert!(DedupConfig::new("data", "raw", "raw").validate().is_err());
        assert!(DedupConfig::new("data", "raw", "clean").validate().is_ok());
    }

    #[test]
    fn names_cannot_escape_the_data_dir() {
        assert!(DedupConfig::new("data", "../raw", "clean").validate().is_err());
        assert!(DedupConfig::new("data", "raw", "").validate().is_err());
    }
}
