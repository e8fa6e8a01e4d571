use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::warn;

use crate::{DataErr, Partition, Result, Sample};

/// Lists the `*.json` files of a dataset directory in file name order.
///
/// # Errors
/// `SourceMissing` if `dir` does not exist and `NoInputFiles` if it holds no JSON files.
pub fn partition_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DataErr::SourceMissing {
            path: dir.to_path_buf(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|source| DataErr::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DataErr::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(DataErr::NoInputFiles {
            path: dir.to_path_buf(),
        });
    }

    files.sort();
    Ok(files)
}

/// Reads a single partition file.
pub fn read_partition(path: &Path) -> Result<Partition> {
    let file = File::open(path).map_err(|source| DataErr::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let samples: Vec<Sample> =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| DataErr::Json {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(Partition::new(file_name(path), samples))
}

/// Reads every partition of a dataset directory.
///
/// Files that cannot be read or parsed are skipped with a warning, they are not fatal to the
/// caller.
///
/// # Errors
/// Only the directory level failures of `partition_files`.
pub fn read_partitions(dir: &Path) -> Result<Vec<Partition>> {
    let files = partition_files(dir)?;
    let mut partitions = Vec::with_capacity(files.len());

    for path in files {
        match read_partition(&path) {
            Ok(partition) => partitions.push(partition),
            Err(e) => warn!("skipping partition: {e}"),
        }
    }

    Ok(partitions)
}

/// Writes a partition as a pretty printed JSON array into `dir`, under the partition's name.
///
/// # Returns
/// The path of the written file.
pub fn write_partition(dir: &Path, partition: &Partition) -> Result<PathBuf> {
    let path = dir.join(partition.name());
    let io_err = |source| DataErr::Io {
        path: path.clone(),
        source,
    };

    let file = File::create(&path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, partition.samples()).map_err(|source| {
        DataErr::Json {
            path: path.clone(),
            source,
        }
    })?;
    writer.flush().map_err(io_err)?;

    Ok(path)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
