use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

/// The result type used in the entire dataset module.
pub type Result<T> = std::result::Result<T, DataErr>;

/// The dataset module's error type.
#[derive(Debug)]
pub enum DataErr {
    SourceMissing {
        path: PathBuf,
    },
    NoInputFiles {
        path: PathBuf,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidCatalog(String),
    WidthMismatch {
        partition: String,
        sample: usize,
        got: usize,
        expected: usize,
    },
    UnknownRoom(String),
    NonFinite {
        partition: String,
        sample: usize,
    },
}

impl Display for DataErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataErr::SourceMissing { path } => {
                write!(f, "source directory not found: {}", path.display())
            }
            DataErr::NoInputFiles { path } => {
                write!(f, "no JSON files found in {}", path.display())
            }
            DataErr::Io { path, source } => write!(f, "io error on {}: {source}", path.display()),
            DataErr::Json { path, source } => {
                write!(f, "could not parse {}: {source}", path.display())
            }
            DataErr::InvalidCatalog(msg) => write!(f, "invalid room catalog: {msg}"),
            DataErr::WidthMismatch {
                partition,
                sample,
                got,
                expected,
            } => write!(
                f,
                "{partition}: sample {sample} has a vector of length {got}, expected {expected}"
            ),
            DataErr::UnknownRoom(room) => write!(f, "unknown room '{room}'"),
            DataErr::NonFinite { partition, sample } => write!(
                f,
                "{partition}: sample {sample} has a value that is not a finite f32"
            ),
        }
    }
}

impl Error for DataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataErr::Io { source, .. } => Some(source),
            DataErr::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
