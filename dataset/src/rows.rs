use log::{debug, warn};

use crate::{Catalog, DataErr, LabelSpace, Partition, Result};

/// Parallel feature rows and room names.
///
/// Row `i` of `features` always belongs to `targets[i]`; rows are only ever added or dropped
/// together with their target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledRows {
    width: usize,
    features: Vec<f32>,
    targets: Vec<String>,
}

/// Counters of what was left out while collecting rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowsReport {
    pub rejected_partitions: usize,
    pub missing_fields: usize,
    pub unknown_rooms: usize,
    pub non_finite: usize,
}

impl LabeledRows {
    /// Creates an empty set of rows of the given width.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    /// Collects the rows of every partition, in partition order.
    ///
    /// A partition holding any vector of the wrong width is rejected whole. Inside an accepted
    /// partition, samples missing `vector` or `target` are skipped and so are samples whose
    /// room is not in the catalog or whose vector holds a value with no finite `f32` form.
    pub fn collect(partitions: &[Partition], catalog: &Catalog) -> (Self, RowsReport) {
        let mut rows = Self::new(catalog.vector_width());
        let mut report = RowsReport::default();

        for partition in partitions {
            if let Err(e) = check_width(partition, rows.width) {
                warn!("rejecting partition: {e}");
                report.rejected_partitions += 1;
                continue;
            }

            let mut missing = 0;
            for (i, sample) in partition.samples().iter().enumerate() {
                let Some((target, vector)) = sample.labeled() else {
                    missing += 1;
                    continue;
                };

                if !catalog.contains_room(target) {
                    warn!(
                        "{}: {}, skipping",
                        partition.name(),
                        DataErr::UnknownRoom(target.to_string())
                    );
                    report.unknown_rooms += 1;
                    continue;
                }

                let features: Vec<f32> = vector.iter().map(|&v| v as f32).collect();
                if !features.iter().all(|v| v.is_finite()) {
                    let e = DataErr::NonFinite {
                        partition: partition.name().to_string(),
                        sample: i,
                    };
                    warn!("{e}, skipping");
                    report.non_finite += 1;
                    continue;
                }

                rows.features.extend(features);
                rows.targets.push(target.to_string());
            }

            if missing > 0 {
                debug!(
                    "{}: skipped {missing} sample(s) without vector or target",
                    partition.name()
                );
                report.missing_fields += missing;
            }
        }

        (rows, report)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The row major feature buffer, `len() * width()` values.
    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn row(&self, idx: usize) -> &[f32] {
        &self.features[idx * self.width..(idx + 1) * self.width]
    }

    /// Maps every target to its index in `labels`.
    ///
    /// # Errors
    /// `UnknownRoom` if a target is not part of the label space.
    pub fn encode(&self, labels: &LabelSpace) -> Result<Vec<usize>> {
        self.targets
            .iter()
            .map(|target| {
                labels
                    .index(target)
                    .ok_or_else(|| DataErr::UnknownRoom(target.clone()))
            })
            .collect()
    }
}

fn check_width(partition: &Partition, expected: usize) -> Result<()> {
    for (i, sample) in partition.samples().iter().enumerate() {
        let Some(vector) = &sample.vector else {
            continue;
        };

        if vector.len() != expected {
            return Err(DataErr::WidthMismatch {
                partition: partition.name().to_string(),
                sample: i,
                got: vector.len(),
                expected,
            });
        }
    }

    Ok(())
}
