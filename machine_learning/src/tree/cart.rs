use ndarray::ArrayView2;
use rand::{Rng, seq::SliceRandom};

use super::{Node, Tree, TreeBuilder, normalize};
use crate::{MlErr, Result};

/// Two feature values closer than this are considered equal when looking for thresholds.
const FEATURE_EPS: f32 = 1e-7;

/// Growth limits of a classification tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CartParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// How many non-constant features to evaluate per split, all of them if `None`.
    pub max_features: Option<usize>,
}

struct Grower<'a, R> {
    x: ArrayView2<'a, f32>,
    y: &'a [usize],
    weights: &'a [f32],
    n_classes: usize,
    params: &'a CartParams,
    rng: &'a mut R,
    builder: TreeBuilder,
}

struct Candidate {
    feature: usize,
    threshold: f32,
    improvement: f64,
}

/// Grows a classification tree minimizing the weighted gini impurity. Each leaf holds the
/// weighted class distribution of the rows that reached it.
///
/// Rows with a weight of zero are ignored, so bootstrapping can be expressed as sample weights.
pub fn fit_classifier<R: Rng>(
    x: ArrayView2<f32>,
    y: &[usize],
    weights: &[f32],
    n_classes: usize,
    params: &CartParams,
    rng: &mut R,
) -> Result<Tree> {
    if y.len() != x.nrows() || weights.len() != x.nrows() {
        return Err(MlErr::SizeMismatch {
            what: "targets and weights",
            got: y.len().min(weights.len()),
            expected: x.nrows(),
        });
    }

    if let Some(&class) = y.iter().find(|&&c| c >= n_classes) {
        return Err(MlErr::InvalidParam(format!(
            "class {class} is out of range for {n_classes} classes"
        )));
    }

    let rows: Vec<usize> = (0..x.nrows()).filter(|&i| weights[i] > 0.0).collect();
    if rows.is_empty() {
        return Err(MlErr::EmptyInput("training set"));
    }

    let mut grower = Grower {
        x,
        y,
        weights,
        n_classes,
        params,
        rng,
        builder: TreeBuilder::new(x.ncols()),
    };

    grower.grow(rows, 0);
    Ok(grower.builder.build())
}

fn gini(dist: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }

    1.0 - dist.iter().map(|w| (w / total).powi(2)).sum::<f64>()
}

impl<R: Rng> Grower<'_, R> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let id = self.builder.reserve();

        let mut dist = vec![0.0f64; self.n_classes];
        for &r in &rows {
            dist[self.y[r]] += self.weights[r] as f64;
        }
        let total: f64 = dist.iter().sum();
        let impurity = gini(&dist, total);

        let splittable = depth < self.params.max_depth
            && rows.len() >= self.params.min_samples_split
            && impurity > 0.0;

        let Some(best) = splittable.then(|| self.best_split(&rows, &dist, total, impurity)).flatten()
        else {
            let mut value: Vec<f32> = dist.iter().map(|&w| w as f32).collect();
            normalize(&mut value);
            self.builder.set(id, Node::Leaf { value });
            return id;
        };

        self.builder.credit(best.feature, best.improvement as f32);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[[r, best.feature]] <= best.threshold);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.builder.set(
            id,
            Node::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
            },
        );

        id
    }

    fn best_split(
        &mut self,
        rows: &[usize],
        dist: &[f64],
        total: f64,
        impurity: f64,
    ) -> Option<Candidate> {
        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let max_features = self.params.max_features.unwrap_or(self.x.ncols()).max(1);

        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut *self.rng);

        let mut best: Option<Candidate> = None;
        let mut visited = 0;
        let mut sorted = rows.to_vec();

        for feature in features {
            if visited == max_features {
                break;
            }

            let column = self.x.column(feature);
            sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            if column[sorted[n - 1]] <= column[sorted[0]] + FEATURE_EPS {
                continue;
            }
            visited += 1;

            let mut left = vec![0.0f64; self.n_classes];
            let mut left_total = 0.0f64;

            for i in 1..n {
                let prev = sorted[i - 1];
                let w = self.weights[prev] as f64;
                left[self.y[prev]] += w;
                left_total += w;

                let (a, b) = (column[prev], column[sorted[i]]);
                if i < min_leaf || n - i < min_leaf || b <= a + FEATURE_EPS {
                    continue;
                }

                let right: Vec<f64> = dist.iter().zip(&left).map(|(d, l)| d - l).collect();
                let right_total = total - left_total;

                let children =
                    left_total * gini(&left, left_total) + right_total * gini(&right, right_total);
                let improvement = total * impurity - children;

                if best.as_ref().is_none_or(|c| improvement > c.improvement) {
                    let mid = a + (b - a) / 2.0;
                    best = Some(Candidate {
                        feature,
                        threshold: if mid < b { mid } else { a },
                        improvement,
                    });
                }
            }
        }

        best
    }
}
