use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use crate::{Catalog, LabeledRows};

const BAR_SCALE: usize = 10;
const BAR_MAX: usize = 50;

/// Descriptive statistics of the collected rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSummary {
    pub samples: usize,
    pub width: usize,
    pub classes: usize,
    /// Sample count per catalog room, in catalog order, absent rooms included.
    pub distribution: Vec<(String, usize)>,
    pub min_distance: f32,
    pub max_distance: f32,
    pub mean_distance: f32,
    pub mean_fresh: f32,
}

impl DataSummary {
    pub fn new(rows: &LabeledRows, catalog: &Catalog) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for target in rows.targets() {
            *counts.entry(target.as_str()).or_default() += 1;
        }

        let distribution = catalog
            .rooms()
            .iter()
            .map(|room| (room.clone(), counts.get(room.as_str()).copied().unwrap_or(0)))
            .collect();

        let mut min_distance = f32::INFINITY;
        let mut max_distance = f32::NEG_INFINITY;
        let mut distance_sum = 0.0f64;
        let mut distance_count = 0usize;
        let mut fresh_sum = 0.0f64;

        for i in 0..rows.len() {
            for pair in rows.row(i).chunks_exact(2) {
                let (distance, fresh) = (pair[0], pair[1]);
                min_distance = min_distance.min(distance);
                max_distance = max_distance.max(distance);
                distance_sum += distance as f64;
                distance_count += 1;
                fresh_sum += fresh as f64;
            }
        }

        let (min_distance, max_distance, mean_distance) = if distance_count == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (
                min_distance,
                max_distance,
                (distance_sum / distance_count as f64) as f32,
            )
        };

        let mean_fresh = if rows.is_empty() {
            0.0
        } else {
            (fresh_sum / rows.len() as f64) as f32
        };

        Self {
            samples: rows.len(),
            width: rows.width(),
            classes: counts.len(),
            distribution,
            min_distance,
            max_distance,
            mean_distance,
            mean_fresh,
        }
    }
}

impl Display for DataSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total samples: {}", self.samples)?;
        writeln!(f, "Input shape: ({}, {})", self.samples, self.width)?;
        writeln!(f, "Number of classes: {}", self.classes)?;

        writeln!(f, "\nClass distribution:")?;
        for (room, count) in &self.distribution {
            let bar = "#".repeat((count / BAR_SCALE).min(BAR_MAX));
            writeln!(f, "  {room:12}: {count:5} {bar}")?;
        }

        writeln!(f, "\nFeature statistics (distances only):")?;
        writeln!(f, "  Min distance: {:.2}", self.min_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)?;
        writeln!(f, "  Mean distance: {:.2}", self.mean_distance)?;

        writeln!(f, "\nFresh flag statistics:")?;
        write!(f, "  Mean fresh sensors per sample: {:.2}", self.mean_fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Partition, Sample};

    #[test]
    fn statistics_over_distance_and_fresh_columns() {
        let catalog = Catalog::new(
            vec!["hall".into(), "kitchen".into(), "office".into()],
            vec!["s1".into(), "s2".into()],
        )
        .unwrap();
        let partition = Partition::new(
            "p.json",
            vec![
                Sample::new("hall", vec![1.0, 1.0, 3.0, 0.0]),
                Sample::new("office", vec![2.0, 1.0, 10.0, 1.0]),
            ],
        );
        let (rows, _) = LabeledRows::collect(&[partition], &catalog);

        let summary = DataSummary::new(&rows, &catalog);

        assert_eq!(summary.samples, 2);
        assert_eq!(summary.classes, 2);
        assert_eq!(
            summary.distribution,
            [
                ("hall".to_string(), 1),
                ("kitchen".to_string(), 0),
                ("office".to_string(), 1)
            ]
        );
        assert_eq!(summary.min_distance, 1.0);
        assert_eq!(summary.max_distance, 10.0);
        assert_eq!(summary.mean_distance, 4.0);
        assert_eq!(summary.mean_fresh, 1.5);

        let text = summary.to_string();
        assert!(text.contains("Input shape: (2, 4)"));
        assert!(text.contains("kitchen"));
    }

    #[test]
    fn empty_rows_do_not_produce_infinities() {
        let catalog = Catalog::new(vec!["hall".into()], vec!["s1".into()]).unwrap();
        let summary = DataSummary::new(&LabeledRows::new(2), &catalog);

        assert_eq!(summary.min_distance, 0.0);
        assert_eq!(summary.mean_fresh, 0.0);
    }
}
