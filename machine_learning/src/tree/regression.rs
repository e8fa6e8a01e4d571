use ndarray::ArrayView2;

use super::{Node, Tree, TreeBuilder};

const FEATURE_EPS: f32 = 1e-7;

/// Growth limits of a gradient tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientTreeParams {
    pub max_depth: usize,
    /// L2 regularization on leaf weights.
    pub lambda: f32,
    /// Minimum hessian sum allowed in a child.
    pub min_child_weight: f32,
    /// Shrinkage applied to every leaf weight.
    pub learning_rate: f32,
}

struct Grower<'a> {
    x: ArrayView2<'a, f32>,
    grad: &'a [f32],
    hess: &'a [f32],
    params: &'a GradientTreeParams,
    builder: TreeBuilder,
}

/// Grows a regression tree over first and second order gradients. Leaves hold a single,
/// already shrunk, weight `-lr * G / (H + lambda)` and importance accumulates split gain.
pub fn fit_gradient_tree(
    x: ArrayView2<f32>,
    grad: &[f32],
    hess: &[f32],
    params: &GradientTreeParams,
) -> Tree {
    let mut grower = Grower {
        x,
        grad,
        hess,
        params,
        builder: TreeBuilder::new(x.ncols()),
    };

    grower.grow((0..x.nrows()).collect(), 0);
    grower.builder.build()
}

impl Grower<'_> {
    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda as f64)
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let id = self.builder.reserve();

        let (g, h) = rows.iter().fold((0.0f64, 0.0f64), |(g, h), &r| {
            (g + self.grad[r] as f64, h + self.hess[r] as f64)
        });

        let split = if depth < self.params.max_depth {
            self.best_split(&rows, g, h)
        } else {
            None
        };

        let Some((feature, threshold, gain)) = split else {
            let weight = -g / (h + self.params.lambda as f64) * self.params.learning_rate as f64;
            self.builder.set(
                id,
                Node::Leaf {
                    value: vec![weight as f32],
                },
            );
            return id;
        };

        self.builder.credit(feature, gain as f32);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[[r, feature]] <= threshold);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.builder.set(
            id,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            },
        );

        id
    }

    /// Returns the split with the largest positive gain, if any.
    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<(usize, f32, f64)> {
        let mcw = self.params.min_child_weight as f64;
        if rows.len() < 2 || h < 2.0 * mcw {
            return None;
        }

        let parent = self.score(g, h);
        let mut best: Option<(usize, f32, f64)> = None;
        let mut sorted = rows.to_vec();

        for feature in 0..self.x.ncols() {
            let column = self.x.column(feature);
            sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let (mut gl, mut hl) = (0.0f64, 0.0f64);
            for i in 1..sorted.len() {
                let prev = sorted[i - 1];
                gl += self.grad[prev] as f64;
                hl += self.hess[prev] as f64;

                let (a, b) = (column[prev], column[sorted[i]]);
                let (gr, hr) = (g - gl, h - hl);
                if b <= a + FEATURE_EPS || hl < mcw || hr < mcw {
                    continue;
                }

                let gain = self.score(gl, hl) + self.score(gr, hr) - parent;
                if gain > 0.0 && best.is_none_or(|(_, _, best_gain)| gain > best_gain) {
                    let mid = a + (b - a) / 2.0;
                    best = Some((feature, if mid < b { mid } else { a }, gain));
                }
            }
        }

        best
    }
}
