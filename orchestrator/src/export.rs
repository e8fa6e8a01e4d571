use std::{
    fs,
    path::{Path, PathBuf},
};

use dataset::{Catalog, LabelSpace};
use log::{info, warn};
use machine_learning::BackendKind;

use crate::{
    Result,
    error::io_err,
    harness::Evaluations,
    metadata::{METADATA_FILE, MetadataRecord, artifact_file, remove_if_present},
    report::RunReport,
};

pub const PORTABLE_FILE: &str = "model_boosted.json";
pub const REPORT_FILE: &str = "report.txt";
pub const CONFUSION_FILE: &str = "confusion_matrix.csv";

/// A fresh random run id, as 16 hex digits.
pub fn new_run_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Removes every file an earlier run may have left in `dir`, the record first.
fn remove_stale(dir: &Path) -> Result<()> {
    remove_if_present(&dir.join(METADATA_FILE))?;
    for kind in BackendKind::ALL {
        remove_if_present(&dir.join(artifact_file(kind)))?;
    }
    for file in [PORTABLE_FILE, REPORT_FILE, CONFUSION_FILE] {
        remove_if_present(&dir.join(file))?;
    }
    Ok(())
}

fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents).map_err(io_err(path))
}

/// Writes every trained model, the report, and last of all the metadata record into `dir`.
///
/// Everything an earlier run wrote is removed before the first artifact is written, so a run
/// that fails halfway never leaves a record next to artifacts it doesn't describe.
///
/// # Returns
/// The record written.
pub fn export(
    dir: &Path,
    evaluations: &Evaluations,
    labels: &LabelSpace,
    catalog: &Catalog,
    run_id: &str,
) -> Result<MetadataRecord> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    remove_stale(dir)?;

    let mut record = MetadataRecord::new(labels, catalog, run_id);

    for (kind, eval) in evaluations.trained() {
        let mut artifact = eval.model.to_artifact();
        artifact.set_meta("run_id", run_id);

        let file = artifact_file(kind);
        write(&dir.join(&file), artifact.to_bytes()?)?;
        info!(backend:% = kind; "saved {file}");

        if let Some(portable) = eval.model.portable_json(run_id) {
            export_portable(dir, portable);
        }

        record.artifacts.insert(kind, file);
    }

    let report = RunReport::new(evaluations, labels);
    write(&dir.join(REPORT_FILE), report.to_string())?;
    if let Some(csv) = report.confusion_csv() {
        write(&dir.join(CONFUSION_FILE), csv)?;
    }

    record.best = evaluations.best().map(|(kind, _)| kind);
    record.save(&dir.join(METADATA_FILE))?;
    info!(run_id = run_id; "saved {METADATA_FILE}");

    Ok(record)
}

fn export_portable(dir: &Path, portable: machine_learning::Result<String>) {
    let path: PathBuf = dir.join(PORTABLE_FILE);
    let written = portable
        .map_err(|e| e.to_string())
        .and_then(|json| write(&path, json).map_err(|e| e.to_string()));

    match written {
        Ok(()) => info!(backend:% = BackendKind::Boosted; "saved {PORTABLE_FILE}"),
        Err(e) => warn!(backend:% = BackendKind::Boosted; "portable export failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_outputs_are_all_removed() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("notes.txt");
        let mut stale = vec![
            METADATA_FILE.to_string(),
            PORTABLE_FILE.to_string(),
            REPORT_FILE.to_string(),
            CONFUSION_FILE.to_string(),
        ];
        stale.extend(BackendKind::ALL.map(artifact_file));
        for file in &stale {
            fs::write(dir.path().join(file), "old").unwrap();
        }
        fs::write(&keep, "mine").unwrap();

        remove_stale(dir.path()).unwrap();

        for file in &stale {
            assert!(!dir.path().join(file).exists(), "{file} survived");
        }
        assert!(keep.exists());
    }
}
