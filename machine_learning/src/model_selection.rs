//! Train/test splitting and cross validation.

use std::collections::BTreeMap;

use ndarray::{ArrayView2, Axis};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{Backend, MlErr, Result, metrics::accuracy};

/// Row indices of a single train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn test_size(n: usize, test_fraction: f32) -> Result<usize> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(MlErr::InvalidParam(format!(
            "the test fraction must be within (0, 1), got {test_fraction}"
        )));
    }

    let n_test = (n as f32 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(MlErr::InvalidParam(format!(
            "{n} samples cannot be split with a test fraction of {test_fraction}"
        )));
    }

    Ok(n_test)
}

fn group_by_class(y: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &class) in y.iter().enumerate() {
        groups.entry(class).or_default().push(i);
    }
    groups
}

/// Shuffles the rows and holds out `ceil(n * test_fraction)` of them.
pub fn random_split(n: usize, test_fraction: f32, seed: u64) -> Result<Split> {
    let n_test = test_size(n, test_fraction)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut rows: Vec<usize> = (0..n).collect();
    rows.shuffle(&mut rng);
    let train = rows.split_off(n_test);

    Ok(Split { train, test: rows })
}

/// Holds out `ceil(n * test_fraction)` rows keeping every class's proportion as close as
/// possible. Each class gets the floor of its exact share, the remaining slots go to the classes
/// with the largest fractional parts, preferring classes that would keep a training row.
pub fn stratified_split(y: &[usize], test_fraction: f32, seed: u64) -> Result<Split> {
    let n = y.len();
    let n_test = test_size(n, test_fraction)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let groups = group_by_class(y);

    let shares: Vec<f32> = groups
        .values()
        .map(|rows| n_test as f32 * rows.len() as f32 / n as f32)
        .collect();
    let mut quota: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();

    let mut order: Vec<usize> = (0..quota.len()).collect();
    order.sort_by(|&a, &b| (shares[b].fract()).total_cmp(&shares[a].fract()));
    let sizes: Vec<usize> = groups.values().map(Vec::len).collect();

    let mut missing = n_test - quota.iter().sum::<usize>();
    for keep_train in [true, false] {
        for &c in &order {
            if missing == 0 {
                break;
            }
            let limit = if keep_train { sizes[c].saturating_sub(1) } else { sizes[c] };
            if quota[c] < limit {
                quota[c] += 1;
                missing -= 1;
            }
        }
    }

    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (mut rows, q) in groups.into_values().zip(quota) {
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..q]);
        train.extend_from_slice(&rows[q..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(Split { train, test })
}

/// Stratifies when there are at least two classes and falls back to a plain random split
/// otherwise.
pub fn train_test_split(y: &[usize], test_fraction: f32, seed: u64) -> Result<Split> {
    if group_by_class(y).len() < 2 {
        log::warn!("cannot stratify a single class, using a random split");
        return random_split(y.len(), test_fraction, seed);
    }

    stratified_split(y, test_fraction, seed)
}

/// K folds preserving class proportions. Rows of each class, in their original order, are dealt
/// into contiguous chunks, the first folds taking one extra row when the class doesn't divide
/// evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(MlErr::InvalidParam(format!(
                "at least 2 folds are needed, got {n_splits}"
            )));
        }

        Ok(Self { n_splits })
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Folds with an empty train or test side are left out.
    pub fn split(&self, y: &[usize]) -> Vec<Split> {
        let k = self.n_splits;
        let mut fold_of = vec![0; y.len()];

        for rows in group_by_class(y).values() {
            let (base, extra) = (rows.len() / k, rows.len() % k);
            let mut start = 0;
            for fold in 0..k {
                let len = base + usize::from(fold < extra);
                for &r in &rows[start..start + len] {
                    fold_of[r] = fold;
                }
                start += len;
            }
        }

        (0..k)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..y.len()).partition(|&r| fold_of[r] == fold);
                Split { train, test }
            })
            .filter(|split| !split.train.is_empty() && !split.test.is_empty())
            .collect()
    }
}

/// Per fold accuracy of a cross validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct CvScores {
    pub scores: Vec<f32>,
}

impl CvScores {
    pub fn mean(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f32>() / self.scores.len() as f32
    }

    /// Population standard deviation.
    pub fn std(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let var = self.scores.iter().map(|s| (s - mean).powi(2)).sum::<f32>()
            / self.scores.len() as f32;
        var.sqrt()
    }
}

/// The amount of folds used for `y`: `min(max_folds, distinct classes)`, or `None` when that
/// leaves fewer than two.
pub fn cv_folds(y: &[usize], max_folds: usize) -> Option<usize> {
    let folds = group_by_class(y).len().min(max_folds);
    (folds >= 2).then_some(folds)
}

/// Trains a fresh copy of `backend` on every stratified fold and scores it on the held out rows.
pub fn cross_val_accuracy(
    backend: &Backend,
    x: ArrayView2<f32>,
    y: &[usize],
    n_classes: usize,
    n_splits: usize,
) -> Result<CvScores> {
    let folds = StratifiedKFold::new(n_splits)?.split(y);
    let mut scores = Vec::with_capacity(folds.len());

    for (i, Split { train, test }) in folds.into_iter().enumerate() {
        let x_train = x.select(Axis(0), &train);
        let y_train: Vec<usize> = train.iter().map(|&r| y[r]).collect();
        let x_test = x.select(Axis(0), &test);
        let y_test: Vec<usize> = test.iter().map(|&r| y[r]).collect();

        let model = backend.fit(x_train.view(), &y_train, n_classes)?;
        let score = accuracy(&y_test, &model.predict(x_test.view())?);
        log::debug!(backend:% = backend.kind(), fold = i, accuracy = score; "fold scored");
        scores.push(score);
    }

    Ok(CvScores { scores })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(counts: &[usize]) -> Vec<usize> {
        counts
            .iter()
            .enumerate()
            .flat_map(|(class, &count)| std::iter::repeat_n(class, count))
            .collect()
    }

    fn count(rows: &[usize], y: &[usize], class: usize) -> usize {
        rows.iter().filter(|&&r| y[r] == class).count()
    }

    #[test]
    fn stratified_split_keeps_proportions() {
        let y = labels(&[60, 30, 10]);
        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        assert_eq!(count(&split.test, &y, 0), 12);
        assert_eq!(count(&split.test, &y, 1), 6);
        assert_eq!(count(&split.test, &y, 2), 2);
    }

    #[test]
    fn split_is_a_partition() {
        let y = labels(&[7, 5, 3]);
        let split = stratified_split(&y, 0.2, 42).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort();
        assert_eq!(all, (0..y.len()).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_split() {
        let y = labels(&[20, 20]);
        assert_eq!(
            stratified_split(&y, 0.2, 42).unwrap(),
            stratified_split(&y, 0.2, 42).unwrap()
        );
    }

    #[test]
    fn remainders_prefer_classes_keeping_training_rows() {
        // Shares are 0.2, 0.4 and 1.4, the class with a single row must stay in training.
        let y = labels(&[1, 2, 7]);
        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 2);
        assert_eq!(count(&split.train, &y, 0), 1);
    }

    #[test]
    fn single_class_falls_back_to_random() {
        let y = vec![0; 10];
        let split = train_test_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn too_small_to_split() {
        assert!(matches!(random_split(1, 0.2, 42), Err(MlErr::InvalidParam(_))));
        assert!(matches!(random_split(10, 1.5, 42), Err(MlErr::InvalidParam(_))));
    }

    #[test]
    fn kfold_spreads_each_class() {
        let y = labels(&[10, 5]);
        let folds = StratifiedKFold::new(5).unwrap().split(&y);

        assert_eq!(folds.len(), 5);
        for fold in &folds {
            assert_eq!(count(&fold.test, &y, 0), 2);
            assert_eq!(count(&fold.test, &y, 1), 1);
            assert_eq!(fold.train.len() + fold.test.len(), y.len());
        }
    }

    #[test]
    fn kfold_needs_two_folds() {
        assert!(StratifiedKFold::new(1).is_err());
    }

    #[test]
    fn folds_follow_distinct_classes() {
        assert_eq!(cv_folds(&labels(&[10, 10, 10]), 5), Some(3));
        assert_eq!(cv_folds(&labels(&[4; 7]), 5), Some(5));
        assert_eq!(cv_folds(&labels(&[10]), 5), None);
    }

    #[test]
    fn cv_statistics() {
        let scores = CvScores {
            scores: vec![0.5, 1.0],
        };
        assert_eq!(scores.mean(), 0.75);
        assert_eq!(scores.std(), 0.25);
    }
}
