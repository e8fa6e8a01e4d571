use std::path::PathBuf;

use machine_learning::BackendKind;

use super::validate_name;
use crate::{OrchestratorError, Result};

/// Everything a training run needs besides the room catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub data_dir: PathBuf,
    pub dataset: String,
    pub output_dir: PathBuf,
    /// The backends to train, in request order. Ties in accuracy go to the earliest.
    pub backends: Vec<BackendKind>,
    pub seed: u64,
    /// Fraction of the rows held out for scoring.
    pub test_fraction: f32,
    /// Upper bound on the amount of cross validation folds.
    pub max_folds: usize,
}

impl TrainingConfig {
    /// Creates a `TrainingConfig` with the default seed `42`, a `0.2` held out fraction and up
    /// to 5 folds.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        dataset: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        backends: Vec<BackendKind>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            dataset: dataset.into(),
            output_dir: output_dir.into(),
            backends,
            seed: 42,
            test_fraction: 0.2,
            max_folds: 5,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name("dataset", &self.dataset)?;

        if self.backends.is_empty() {
            return Err(OrchestratorError::InvalidConfig(
                "at least one backend must be requested".into(),
            ));
        }

        for (i, kind) in self.backends.iter().enumerate() {
            if self.backends[..i].contains(kind) {
                return Err(OrchestratorError::InvalidConfig(format!(
                    "backend `{kind}` was requested more than once"
                )));
            }
        }

        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "test fraction must be within (0, 1), got {}",
                self.test_fraction
            )));
        }

        if self.max_folds < 2 {
            return Err(OrchestratorError::InvalidConfig(format!(
                "max folds must be at least 2, got {}",
                self.max_folds
            )));
        }

        Ok(())
    }

    /// The directory holding the dataset's partitions.
    pub fn source_dir(&self) -> PathBuf {
        self.data_dir.join(&self.dataset)
    }

    /// The directory the run's artifacts go to.
    pub fn run_dir(&self) -> PathBuf {
        self.output_dir.join(&self.dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrainingConfig {
        TrainingConfig::new("data", "clean", "output", BackendKind::ALL.to_vec())
    }

    #[test]
    fn defaults_are_valid() {
        assert!(config().validate().is_ok());
        assert_eq!(config().run_dir(), PathBuf::from("output/clean"));
    }

    #[test]
    fn rejects_bad_settings() {
        let no_backends = TrainingConfig {
            backends: vec![],
            ..config()
        };
        let repeated = TrainingConfig {
            backends: vec![BackendKind::Forest, BackendKind::Forest],
            ..config()
        };
        let fraction = TrainingConfig {
            test_fraction: 1.0,
            ..config()
        };
        let folds = TrainingConfig {
            max_folds: 1,
            ..config()
        };

        for config in [no_backends, repeated, fraction, folds] {
            assert!(matches!(
                config.validate(),
                Err(OrchestratorError::InvalidConfig(_))
            ));
        }
    }
}
