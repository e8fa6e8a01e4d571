use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single labeled observation.
///
/// Both `vector` and `target` may be absent in a stored record; fields other than these two are
/// carried along untouched so a rewritten partition loses nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Sample {
    /// Creates a new `Sample` with both required fields present.
    pub fn new(target: impl Into<String>, vector: Vec<f64>) -> Self {
        Self {
            target: Some(target.into()),
            vector: Some(vector),
            extra: Map::new(),
        }
    }

    /// Returns the vector, or an empty slice if it is missing.
    pub fn vector_or_empty(&self) -> &[f64] {
        self.vector.as_deref().unwrap_or(&[])
    }

    /// Returns the target and the vector when both are present.
    pub fn labeled(&self) -> Option<(&str, &[f64])> {
        Some((self.target.as_deref()?, self.vector.as_deref()?))
    }
}

/// An ordered batch of samples read from a single file.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    name: String,
    samples: Vec<Sample>,
}

impl Partition {
    /// Creates a new `Partition`.
    ///
    /// # Arguments
    /// * `name` - The name of the storage unit, usually the file name.
    /// * `samples` - The samples in storage order.
    pub fn new(name: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}
