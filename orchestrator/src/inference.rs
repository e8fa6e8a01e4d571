use std::{fs, path::Path};

use machine_learning::{Artifact, BackendKind, MlErr, Trained};
use ndarray::Array2;

use crate::{
    OrchestratorError, Result,
    error::io_err,
    metadata::{METADATA_FILE, MetadataRecord, artifact_file},
};

/// A trained model paired with the metadata record of the run that produced it.
#[derive(Debug, Clone)]
pub struct RoomPredictor {
    metadata: MetadataRecord,
    model: Trained,
}

impl RoomPredictor {
    /// Loads the `kind` model stored in `dir` along with the run's metadata record.
    ///
    /// # Errors
    /// `MetadataMismatch` if the artifact was not produced by the run the record describes.
    pub fn load(dir: &Path, kind: BackendKind) -> Result<Self> {
        let metadata = MetadataRecord::load(&dir.join(METADATA_FILE))?;

        let path = dir.join(artifact_file(kind));
        let bytes = fs::read(&path).map_err(io_err(&path))?;
        let artifact = Artifact::from_bytes(&bytes)?;

        if artifact.kind() != kind {
            return Err(OrchestratorError::MetadataMismatch(format!(
                "{} holds a {} model",
                path.display(),
                artifact.kind()
            )));
        }

        let run_id = artifact.meta("run_id").unwrap_or_default();
        if run_id != metadata.run_id {
            return Err(OrchestratorError::MetadataMismatch(format!(
                "artifact run `{run_id}` differs from metadata run `{}`",
                metadata.run_id
            )));
        }

        let model = Trained::from_artifact(&artifact)?;
        let features = artifact.meta_usize("num_features")?;
        let classes = artifact.meta_usize("num_classes")?;

        if features != metadata.num_features || model.n_features() != metadata.num_features {
            return Err(OrchestratorError::MetadataMismatch(format!(
                "model expects {features} features, metadata declares {}",
                metadata.num_features
            )));
        }
        if classes != metadata.num_classes || model.n_classes() != metadata.num_classes {
            return Err(OrchestratorError::MetadataMismatch(format!(
                "model has {classes} classes, metadata declares {}",
                metadata.num_classes
            )));
        }

        log::info!(backend:% = kind, run_id = run_id; "loaded {}", path.display());
        Ok(Self { metadata, model })
    }

    pub fn kind(&self) -> BackendKind {
        self.model.kind()
    }

    pub fn metadata(&self) -> &MetadataRecord {
        &self.metadata
    }

    pub fn room(&self, idx: usize) -> Option<&str> {
        self.metadata.room(idx)
    }

    /// The rooms in index order.
    pub fn rooms(&self) -> Vec<&str> {
        self.metadata.idx_to_room.values().map(String::as_str).collect()
    }

    pub fn sensor_order(&self) -> &[String] {
        &self.metadata.sensor_order
    }

    /// Predicts the room of a single feature vector laid out in sensor order.
    pub fn predict(&self, vector: &[f64]) -> Result<&str> {
        if vector.len() != self.metadata.num_features {
            return Err(MlErr::SizeMismatch {
                what: "feature vector",
                got: vector.len(),
                expected: self.metadata.num_features,
            }
            .into());
        }

        let x = Array2::from_shape_vec(
            (1, vector.len()),
            vector.iter().map(|&v| v as f32).collect(),
        )
        .map_err(MlErr::from)?;

        let idx = self
            .model
            .predict(x.view())?
            .first()
            .copied()
            .ok_or(MlErr::EmptyInput("prediction"))?;

        self.room(idx).ok_or_else(|| {
            OrchestratorError::MetadataMismatch(format!("index {idx} has no room"))
        })
    }
}
