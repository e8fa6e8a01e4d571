use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use dataset::{Catalog, LabelSpace};
use machine_learning::BackendKind;
use serde::{Deserialize, Serialize};

use crate::{OrchestratorError, Result, error::io_err};

pub const METADATA_FILE: &str = "metadata.json";

/// The file a backend's artifact is stored under.
pub fn artifact_file(kind: BackendKind) -> String {
    format!("model_{kind}.safetensors")
}

/// Binds the label indices and the feature layout of a run to the artifacts it produced.
///
/// `idx_to_room` is keyed by index but serialized with string keys, as json demands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub idx_to_room: BTreeMap<usize, String>,
    pub room_to_idx: BTreeMap<String, usize>,
    pub sensor_order: Vec<String>,
    pub num_features: usize,
    pub num_classes: usize,
    pub run_id: String,
    #[serde(default)]
    pub artifacts: BTreeMap<BackendKind, String>,
    #[serde(default)]
    pub best: Option<BackendKind>,
}

impl MetadataRecord {
    pub fn new(labels: &LabelSpace, catalog: &Catalog, run_id: impl Into<String>) -> Self {
        Self {
            idx_to_room: labels.idx_to_room(),
            room_to_idx: labels.room_to_idx().clone(),
            sensor_order: catalog.sensor_order().to_vec(),
            num_features: catalog.vector_width(),
            num_classes: labels.len(),
            run_id: run_id.into(),
            artifacts: BTreeMap::new(),
            best: None,
        }
    }

    /// Reads a record and checks both label mappings agree with each other and with the
    /// declared sizes.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(io_err(path))?;
        let record: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                OrchestratorError::Json {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        record.validate()?;
        Ok(record)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(io_err(path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| {
            OrchestratorError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.flush().map_err(io_err(path))
    }

    pub fn validate(&self) -> Result<()> {
        let mismatch = |msg: String| Err(OrchestratorError::MetadataMismatch(msg));

        if self.idx_to_room.len() != self.num_classes || self.room_to_idx.len() != self.num_classes
        {
            return mismatch(format!(
                "{} classes declared but {} indices and {} rooms recorded",
                self.num_classes,
                self.idx_to_room.len(),
                self.room_to_idx.len()
            ));
        }

        for (idx, (&key, room)) in self.idx_to_room.iter().enumerate() {
            if key != idx {
                return mismatch(format!("label indices are not contiguous at {key}"));
            }
            if self.room_to_idx.get(room) != Some(&idx) {
                return mismatch(format!("room `{room}` does not map back to index {idx}"));
            }
        }

        if self.num_features != 2 * self.sensor_order.len() {
            return mismatch(format!(
                "{} features declared for {} sensors",
                self.num_features,
                self.sensor_order.len()
            ));
        }

        Ok(())
    }

    pub fn room(&self, idx: usize) -> Option<&str> {
        self.idx_to_room.get(&idx).map(String::as_str)
    }
}

/// Removes a file left by an earlier run, if any.
pub(crate) fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::info!("removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(path)(e)),
    }
}
