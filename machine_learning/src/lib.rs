//! Training and inference for the room classifiers: tree ensembles, gradient boosting and a
//! feed forward network, plus the splitting, scoring and serialization around them.

#[cfg(feature = "network")]
pub mod arch;
pub mod artifact;
pub mod backend;
pub mod boosting;
#[cfg(feature = "network")]
pub mod dataset;
pub mod error;
pub mod forest;
#[cfg(feature = "network")]
pub mod initialization;
pub mod metrics;
pub mod model_selection;
#[cfg(feature = "network")]
pub mod network;
pub mod ops;
#[cfg(feature = "network")]
pub mod optimization;
#[cfg(feature = "network")]
pub mod training;
pub mod tree;
pub mod weights;

pub use artifact::{Artifact, Tensor};
pub use backend::{Backend, BackendKind, Trained};
pub use error::{MlErr, Result};
