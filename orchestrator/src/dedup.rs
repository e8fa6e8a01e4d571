use std::{
    fmt::{self, Display},
    fs,
};

use dataset::{DedupStats, dedup_partitions, reader};
use log::info;

use crate::{Result, configs::DedupConfig, error::io_err};

/// The outcome of a dedup run: the counters of every partition plus the run wide totals.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupReport {
    pub partitions: Vec<(String, DedupStats)>,
    pub total: DedupStats,
}

impl Display for DedupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, stats) in &self.partitions {
            writeln!(
                f,
                "{name}: {} -> {} (-{}, {:.1}%)",
                stats.original,
                stats.compacted(),
                stats.removed,
                stats.removed_ratio() * 100.0
            )?;
        }

        writeln!(f, "\nTotal original samples: {}", self.total.original)?;
        writeln!(f, "Total after compaction: {}", self.total.compacted())?;
        writeln!(f, "Total removed: {}", self.total.removed)?;
        write!(
            f,
            "Compaction ratio: {:.2}%",
            self.total.removed_ratio() * 100.0
        )
    }
}

/// Compacts every partition of the source dataset and writes it, under the same file name, into
/// the target dataset.
///
/// # Errors
/// An invalid config, a missing source directory, a source without partitions or any failure
/// writing the target.
pub fn deduplicate(config: &DedupConfig) -> Result<DedupReport> {
    config.validate()?;

    let partitions = reader::read_partitions(&config.source_dir())?;
    let (compacted, total) = dedup_partitions(partitions);

    let target = config.target_dir();
    fs::create_dir_all(&target).map_err(io_err(&target))?;

    let mut report = Vec::with_capacity(compacted.len());
    for (partition, stats) in compacted {
        let path = reader::write_partition(&target, &partition)?;
        info!(removed = stats.removed, original = stats.original; "wrote {}", path.display());
        report.push((partition.name().to_string(), stats));
    }

    info!(
        original = total.original,
        removed = total.removed;
        "compacted {} into {}", config.source, config.target
    );

    Ok(DedupReport {
        partitions: report,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lines() {
        let report = DedupReport {
            partitions: vec![("a.json".into(), DedupStats::new(4, 1))],
            total: DedupStats::new(4, 1),
        };

        let text = report.to_string();

        assert!(text.starts_with("a.json: 4 -> 3 (-1, 25.0%)"));
        assert!(text.ends_with("Compaction ratio: 25.00%"));
    }

    #[test]
    fn empty_run_has_zero_ratio() {
        let report = DedupReport {
            partitions: vec![],
            total: DedupStats::default(),
        };

        assert!(report.to_string().ends_with("Compaction ratio: 0.00%"));
    }
}
