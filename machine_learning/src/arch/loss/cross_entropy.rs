use ndarray::{Array2, ArrayView2};

use super::LossFn;
use crate::ops::softmax_rows;

/// Softmax followed by categorical cross entropy, taking raw logits and one hot targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

/// Keeps `ln` away from zero.
const EPS: f32 = 1e-12;

impl LossFn for CrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let mut p = y_pred.to_owned();
        softmax_rows(&mut p);

        let total: f32 = p
            .iter()
            .zip(y.iter())
            .map(|(p, t)| -t * (p + EPS).ln())
            .sum();

        total / y_pred.nrows().max(1) as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let mut p = y_pred.to_owned();
        softmax_rows(&mut p);
        (p - &y) / y_pred.nrows().max(1) as f32
    }
}
