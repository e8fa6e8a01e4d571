//! Classification metrics over integer class labels.

use std::collections::BTreeSet;

/// Fraction of predictions matching the truth, `0` for an empty input.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f32 {
    if y_true.is_empty() {
        return 0.0;
    }

    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f32 / y_true.len() as f32
}

/// Sorted union of the labels appearing in either the truth or the predictions.
pub fn present_labels(y_true: &[usize], y_pred: &[usize]) -> Vec<usize> {
    y_true
        .iter()
        .chain(y_pred)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Counts indexed by `[true][predicted]`, restricted to `labels` in the given order.
/// Pairs involving a label outside of `labels` are not counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    labels: Vec<usize>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(y_true: &[usize], y_pred: &[usize], labels: &[usize]) -> Self {
        let position = |label: usize| labels.iter().position(|&l| l == label);
        let mut counts = vec![vec![0; labels.len()]; labels.len()];

        for (&t, &p) in y_true.iter().zip(y_pred) {
            if let (Some(i), Some(j)) = (position(t), position(p)) {
                counts[i][j] += 1;
            }
        }

        Self {
            labels: labels.to_vec(),
            counts,
        }
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    pub fn get(&self, true_label: usize, pred_label: usize) -> usize {
        let position = |label: usize| self.labels.iter().position(|&l| l == label);
        match (position(true_label), position(pred_label)) {
            (Some(i), Some(j)) => self.counts[i][j],
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: usize,
}

/// Per class precision, recall and f1 plus their macro and weighted averages.
/// Undefined ratios count as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<(usize, ClassScores)>,
    pub accuracy: f32,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 { 0.0 } else { num as f32 / den as f32 }
}

impl ClassificationReport {
    pub fn new(y_true: &[usize], y_pred: &[usize], labels: &[usize]) -> Self {
        let matrix = ConfusionMatrix::new(y_true, y_pred, labels);
        let rows = matrix.rows();

        let classes: Vec<(usize, ClassScores)> = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let tp = rows[i][i];
                let support = y_true.iter().filter(|&&t| t == label).count();
                let predicted = y_pred.iter().filter(|&&p| p == label).count();

                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                (
                    label,
                    ClassScores {
                        precision,
                        recall,
                        f1,
                        support,
                    },
                )
            })
            .collect();

        let support: usize = classes.iter().map(|(_, s)| s.support).sum();
        let n = classes.len().max(1) as f32;

        let macro_avg = ClassScores {
            precision: classes.iter().map(|(_, s)| s.precision).sum::<f32>() / n,
            recall: classes.iter().map(|(_, s)| s.recall).sum::<f32>() / n,
            f1: classes.iter().map(|(_, s)| s.f1).sum::<f32>() / n,
            support,
        };

        let weighted = |f: fn(&ClassScores) -> f32| {
            if support == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|(_, s)| f(s) * s.support as f32)
                .sum::<f32>()
                / support as f32
        };

        let weighted_avg = ClassScores {
            precision: weighted(|s| s.precision),
            recall: weighted(|s| s.recall),
            f1: weighted(|s| s.f1),
            support,
        };

        Self {
            classes,
            accuracy: accuracy(y_true, y_pred),
            macro_avg,
            weighted_avg,
        }
    }
}
