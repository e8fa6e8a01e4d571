use std::{fmt, io, path::PathBuf};

use dataset::DataErr;
use machine_learning::MlErr;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before touching any data.
    InvalidConfig(String),
    /// Reading or validating the dataset failed.
    Data(DataErr),
    /// A model could not be trained, evaluated or (de)serialized.
    Ml(MlErr),
    /// No usable sample survived loading and filtering.
    EmptyDataset,
    /// Fewer than two rooms survived loading and filtering.
    InsufficientClasses { found: usize },
    /// Every requested backend failed or was unavailable.
    NoBackendTrained,
    /// A model artifact and a metadata record don't come from the same run.
    MetadataMismatch(String),
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Data(e) => write!(f, "data error: {e}"),
            Self::Ml(e) => write!(f, "model error: {e}"),
            Self::EmptyDataset => write!(f, "no usable samples were loaded"),
            Self::InsufficientClasses { found } => write!(
                f,
                "need at least 2 rooms to train a classifier, found {found}"
            ),
            Self::NoBackendTrained => write!(f, "no backend could be trained"),
            Self::MetadataMismatch(msg) => write!(f, "metadata mismatch: {msg}"),
            Self::Io { path, source } => write!(f, "io error on {}: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "invalid json in {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Data(e) => Some(e),
            Self::Ml(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DataErr> for OrchestratorError {
    fn from(e: DataErr) -> Self {
        Self::Data(e)
    }
}

impl From<MlErr> for OrchestratorError {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

/// Wraps an io error with the path it happened on.
pub(crate) fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> OrchestratorError {
    let path = path.into();
    move |source| OrchestratorError::Io { path, source }
}
