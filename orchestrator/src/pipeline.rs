use std::path::Path;

use dataset::{
    Catalog, DataSummary, DedupStats, LabelSpace, LabeledRows, Partition, RowsReport,
    dedup_partitions, reader,
};
use log::{info, warn};
use machine_learning::MlErr;
use ndarray::Array2;

use crate::{OrchestratorError, Result};

const FEW_SAMPLES: usize = 50;
const FEW_CLASSES: usize = 3;

/// The training inputs of a run: one feature row per label, and the label space the labels index
/// into.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub x: Array2<f32>,
    pub y: Vec<usize>,
    pub labels: LabelSpace,
    pub summary: DataSummary,
    pub dedup: DedupStats,
    pub rows: RowsReport,
}

/// Reads, compacts and encodes every partition of `dir`.
pub fn load(dir: &Path, catalog: &Catalog) -> Result<PreparedData> {
    let partitions = reader::read_partitions(dir)?;
    prepare(partitions, catalog)
}

/// Compacts each partition on its own, concatenates the survivors and encodes their rooms.
///
/// # Errors
/// `EmptyDataset` when no sample survives and `InsufficientClasses` when fewer than two rooms do.
pub fn prepare(partitions: Vec<Partition>, catalog: &Catalog) -> Result<PreparedData> {
    let (compacted, dedup) = dedup_partitions(partitions);
    info!(
        original = dedup.original,
        removed = dedup.removed;
        "compacted {} partition(s)", compacted.len()
    );

    let partitions: Vec<Partition> = compacted.into_iter().map(|(p, _)| p).collect();
    let (rows, report) = LabeledRows::collect(&partitions, catalog);

    if rows.is_empty() {
        return Err(OrchestratorError::EmptyDataset);
    }

    let labels = LabelSpace::from_targets(rows.targets());
    if labels.len() < 2 {
        return Err(OrchestratorError::InsufficientClasses {
            found: labels.len(),
        });
    }

    if rows.len() < FEW_SAMPLES {
        warn!("only {} samples, results will be unreliable", rows.len());
    }
    if labels.len() < FEW_CLASSES {
        warn!("only {} rooms were observed", labels.len());
    }

    let y = rows.encode(&labels)?;
    let x = feature_matrix(rows.len(), rows.width(), rows.features().to_vec())?;
    let summary = DataSummary::new(&rows, catalog);

    Ok(PreparedData {
        x,
        y,
        labels,
        summary,
        dedup,
        rows: report,
    })
}

fn feature_matrix(n_rows: usize, width: usize, features: Vec<f32>) -> Result<Array2<f32>> {
    Ok(Array2::from_shape_vec((n_rows, width), features).map_err(MlErr::from)?)
}

#[cfg(test)]
mod tests {
    use dataset::Sample;

    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(
            vec!["hall".into(), "kitchen".into(), "office".into()],
            vec!["s1".into(), "s2".into()],
        )
        .unwrap()
    }

    #[test]
    fn rows_and_labels_stay_aligned() {
        let partitions = vec![
            Partition::new(
                "a.json",
                vec![
                    Sample::new("kitchen", vec![1.0, 1.0, 2.0, 0.0]),
                    Sample::new("kitchen", vec![1.0, 1.0, 2.0, 0.0]),
                    Sample::new("hall", vec![5.0, 0.0, 1.0, 1.0]),
                    Sample::new("garage", vec![5.0, 0.0, 1.0, 1.0]),
                ],
            ),
            Partition::new("b.json", vec![Sample::new("office", vec![9.0, 1.0, 9.0, 1.0])]),
        ];

        let data = prepare(partitions, &catalog()).unwrap();

        assert_eq!(data.dedup, DedupStats::new(5, 1));
        assert_eq!(data.rows.unknown_rooms, 1);
        assert_eq!(data.x.nrows(), data.y.len());
        assert_eq!(data.y, [1, 0, 2]);
        assert_eq!(data.x.row(2).to_vec(), [9.0, 1.0, 9.0, 1.0]);
    }

    #[test]
    fn unrepresentable_samples_are_left_out() {
        let partitions = vec![Partition::new(
            "a.json",
            vec![
                Sample::new("hall", vec![1.0, 1.0, 1.0, 1.0]),
                Sample::new("hall", vec![1e300, 1.0, 1.0, 1.0]),
                Sample::new("office", vec![2.0, 0.0, 2.0, 0.0]),
            ],
        )];

        let data = prepare(partitions, &catalog()).unwrap();

        assert_eq!(data.y, [0, 1]);
        assert_eq!(data.rows.non_finite, 1);
        assert!(data.x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn a_ragged_buffer_is_a_shape_error() {
        assert!(matches!(
            feature_matrix(2, 4, vec![0.0; 7]),
            Err(OrchestratorError::Ml(MlErr::InvalidParam(_)))
        ));
        assert_eq!(feature_matrix(2, 4, vec![0.0; 8]).unwrap().dim(), (2, 4));
    }

    #[test]
    fn duplicates_across_partitions_are_kept() {
        let sample = Sample::new("hall", vec![1.0, 1.0, 1.0, 1.0]);
        let partitions = vec![
            Partition::new("a.json", vec![sample.clone()]),
            Partition::new(
                "b.json",
                vec![sample, Sample::new("office", vec![2.0, 0.0, 2.0, 0.0])],
            ),
        ];

        let data = prepare(partitions, &catalog()).unwrap();

        assert_eq!(data.y, [0, 0, 1]);
    }

    #[test]
    fn a_single_room_is_fatal() {
        let partitions = vec![Partition::new(
            "a.json",
            vec![
                Sample::new("hall", vec![1.0, 1.0, 1.0, 1.0]),
                Sample::new("garage", vec![2.0, 1.0, 1.0, 1.0]),
            ],
        )];

        assert!(matches!(
            prepare(partitions, &catalog()),
            Err(OrchestratorError::InsufficientClasses { found: 1 })
        ));
    }

    #[test]
    fn nothing_usable_is_fatal() {
        let partitions = vec![Partition::new(
            "a.json",
            vec![Sample::new("hall", vec![1.0, 1.0])],
        )];

        assert!(matches!(
            prepare(partitions, &catalog()),
            Err(OrchestratorError::EmptyDataset)
        ));
    }
}
