//! Consecutive duplicate compaction of partitions.
//!
//! Two samples are duplicates when their targets are equal (two missing targets are equal) and
//! their vectors have the same length with every component within `TOLERANCE` of the other.
//! Each sample is compared with the sample right before it in the input, so the first sample of
//! a run of duplicates is the one kept.

use crate::{Partition, Sample};

/// Absolute per component tolerance used when comparing vectors.
pub const TOLERANCE: f64 = 1e-6;

/// Compares two vectors component wise with the absolute `TOLERANCE`.
///
/// Vectors of different length are never equal.
pub fn vectors_equal(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < TOLERANCE)
}

/// Returns whether `current` duplicates `previous`.
pub fn is_duplicate(previous: &Sample, current: &Sample) -> bool {
    previous.target == current.target
        && vectors_equal(previous.vector_or_empty(), current.vector_or_empty())
}

/// Removes consecutive duplicate samples, keeping the first sample of every run.
///
/// # Returns
/// The compacted samples, in their original order, and the amount of removed samples.
pub fn remove_consecutive_duplicates(samples: Vec<Sample>) -> (Vec<Sample>, usize) {
    let original = samples.len();
    let mut kept: Vec<Sample> = Vec::with_capacity(original);
    let mut previous: Option<Sample> = None;

    for sample in samples {
        let duplicate = previous
            .as_ref()
            .is_some_and(|prev| is_duplicate(prev, &sample));

        if !duplicate {
            kept.push(sample.clone());
        }
        previous = Some(sample);
    }

    let removed = original - kept.len();
    (kept, removed)
}

/// Compaction counters for one partition or for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub original: usize,
    pub removed: usize,
}

impl DedupStats {
    pub fn new(original: usize, removed: usize) -> Self {
        Self { original, removed }
    }

    /// Amount of samples left after compaction.
    pub fn compacted(&self) -> usize {
        self.original - self.removed
    }

    /// Fraction of removed samples, `0.0` when there were no samples at all.
    pub fn removed_ratio(&self) -> f64 {
        if self.original == 0 {
            return 0.0;
        }

        self.removed as f64 / self.original as f64
    }

    /// Accumulates another counter into this one.
    pub fn absorb(&mut self, other: DedupStats) {
        self.original += other.original;
        self.removed += other.removed;
    }
}

/// Compacts a single partition.
pub fn dedup_partition(partition: Partition) -> (Partition, DedupStats) {
    let name = partition.name().to_string();
    let samples = partition.into_samples();
    let original = samples.len();

    let (kept, removed) = remove_consecutive_duplicates(samples);
    (Partition::new(name, kept), DedupStats::new(original, removed))
}

/// Compacts every partition independently, never across partition boundaries.
///
/// # Returns
/// The compacted partitions with their own counters, plus the run wide totals.
pub fn dedup_partitions(
    partitions: Vec<Partition>,
) -> (Vec<(Partition, DedupStats)>, DedupStats) {
    let mut total = DedupStats::default();

    let compacted = partitions
        .into_iter()
        .map(dedup_partition)
        .inspect(|(_, stats)| total.absorb(*stats))
        .collect();

    (compacted, total)
}
