use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::BackendKind;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    EmptyInput(&'static str),
    InvalidParam(String),
    Unavailable {
        kind: BackendKind,
        reason: &'static str,
    },
    NotEnoughClasses {
        got: usize,
    },
    Artifact(String),
    Numerical(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch for {what}, got {got} and expected {expected}"
            ),
            MlErr::EmptyInput(what) => write!(f, "Cannot work with an empty {what}"),
            MlErr::InvalidParam(msg) => write!(f, "Invalid parameter: {msg}"),
            MlErr::Unavailable { kind, reason } => {
                write!(f, "The {kind} backend is unavailable: {reason}")
            }
            MlErr::NotEnoughClasses { got } => {
                write!(f, "At least 2 classes are needed to train, got {got}")
            }
            MlErr::Artifact(msg) => write!(f, "Invalid artifact: {msg}"),
            MlErr::Numerical(msg) => write!(f, "Numerical failure: {msg}"),
        }
    }
}

impl Error for MlErr {}

impl From<safetensors::SafeTensorError> for MlErr {
    fn from(value: safetensors::SafeTensorError) -> Self {
        Self::Artifact(value.to_string())
    }
}

impl From<ndarray::ShapeError> for MlErr {
    fn from(value: ndarray::ShapeError) -> Self {
        Self::InvalidParam(value.to_string())
    }
}
