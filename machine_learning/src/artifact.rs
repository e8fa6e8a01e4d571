//! A named bundle of `f32` tensors plus string metadata, stored as safetensors.

use std::collections::{BTreeMap, HashMap};

use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::{BackendKind, MlErr, Result};

const KIND_KEY: &str = "kind";

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    /// Creates a new tensor, failing if `data` doesn't fill `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "tensor data",
                got: data.len(),
                expected,
            });
        }

        Ok(Self { shape, data })
    }

    pub fn vector(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Reads back a tensor holding integer indices, `-1` becomes `None`.
    pub fn indices(&self) -> Result<Vec<Option<usize>>> {
        self.data
            .iter()
            .map(|&v| match v {
                v if v == -1.0 => Ok(None),
                v if v >= 0.0 && v.fract() == 0.0 => Ok(Some(v as usize)),
                v => Err(MlErr::Artifact(format!("{v} is not a valid index"))),
            })
            .collect()
    }
}

/// The serialized form of a trained backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    kind: BackendKind,
    tensors: BTreeMap<String, Tensor>,
    metadata: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            tensors: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.tensors.insert(name.into(), tensor);
    }

    /// Returns the tensor called `name`, or an error if it isn't present.
    pub fn tensor(&self, name: &str) -> Result<&Tensor> {
        self.tensors
            .get(name)
            .ok_or_else(|| MlErr::Artifact(format!("missing tensor `{name}`")))
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl ToString) {
        self.metadata.insert(key.into(), value.to_string());
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Parses the metadata entry `key`, failing if it's absent or malformed.
    pub fn meta_usize(&self, key: &str) -> Result<usize> {
        let raw = self
            .meta(key)
            .ok_or_else(|| MlErr::Artifact(format!("missing metadata `{key}`")))?;

        raw.parse()
            .map_err(|_| MlErr::Artifact(format!("metadata `{key}` = {raw} is not a count")))
    }

    /// Serializes the artifact into a safetensors buffer. The backend kind is kept as metadata.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let views = self
            .tensors
            .iter()
            .map(|(name, tensor)| -> Result<(String, TensorView<'_>)> {
                let bytes: &[u8] = bytemuck::cast_slice(tensor.data.as_slice());
                let view = TensorView::new(Dtype::F32, tensor.shape.clone(), bytes)?;
                Ok((name.clone(), view))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut metadata: HashMap<String, String> = self
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        metadata.insert(KIND_KEY.into(), self.kind.to_string());

        Ok(safetensors::serialize(views, &Some(metadata))?)
    }

    /// Parses a buffer produced by [`Artifact::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (_, header) = SafeTensors::read_metadata(bytes)?;
        let mut metadata: BTreeMap<String, String> = header
            .metadata()
            .as_ref()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let kind = metadata
            .remove(KIND_KEY)
            .ok_or_else(|| MlErr::Artifact("missing backend kind".into()))?
            .parse()?;

        let st = SafeTensors::deserialize(bytes)?;
        let mut tensors = BTreeMap::new();
        for (name, view) in st.tensors() {
            if view.dtype() != Dtype::F32 {
                return Err(MlErr::Artifact(format!("tensor `{name}` is not f32")));
            }

            let data = view
                .data()
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();

            tensors.insert(name, Tensor::new(view.shape().to_vec(), data)?);
        }

        Ok(Self {
            kind,
            tensors,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_the_safetensors_format() {
        let mut artifact = Artifact::new(BackendKind::Boosted);
        artifact.insert("w", Tensor::new(vec![2, 2], vec![1.0, -2.0, 0.5, 3.25]).unwrap());
        artifact.insert("ids", Tensor::vector(vec![-1.0, 0.0, 4.0]));
        artifact.set_meta("num_classes", 3);

        let bytes = artifact.to_bytes().unwrap();
        let restored = Artifact::from_bytes(&bytes).unwrap();

        assert_eq!(restored, artifact);
        assert_eq!(restored.meta_usize("num_classes").unwrap(), 3);
        assert_eq!(
            restored.tensor("ids").unwrap().indices().unwrap(),
            [None, Some(0), Some(4)]
        );
    }

    #[test]
    fn shape_must_match_data() {
        assert!(Tensor::new(vec![2, 3], vec![0.0; 5]).is_err());
    }

    #[test]
    fn missing_pieces_are_reported() {
        let artifact = Artifact::new(BackendKind::Forest);
        assert!(matches!(artifact.tensor("nope"), Err(MlErr::Artifact(_))));
        assert!(matches!(artifact.meta_usize("nope"), Err(MlErr::Artifact(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Artifact::from_bytes(b"definitely not safetensors").is_err());
    }
}
