use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// Inputs and one hot targets, served in shuffled batches.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
    order: Vec<usize>,
}

impl Dataset {
    /// Creates a new `Dataset`, failing if `x` and `y` don't have the same amount of rows.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset rows",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        let order = (0..x.nrows()).collect();
        Ok(Self { x, y, order })
    }

    /// Creates a new `Dataset` encoding `labels` as one hot rows of width `n_classes`.
    pub fn one_hot(x: ArrayView2<f32>, labels: &[usize], n_classes: usize) -> Result<Self> {
        let mut y = Array2::zeros((labels.len(), n_classes));
        for (i, &label) in labels.iter().enumerate() {
            if label >= n_classes {
                return Err(MlErr::InvalidParam(format!(
                    "class {label} is out of range for {n_classes} classes"
                )));
            }
            y[[i, label]] = 1.;
        }

        Self::new(x.to_owned(), y)
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reorders the rows the next batches will be drawn from.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    /// Splits the dataset into batches of `batch_size` rows, the last one possibly smaller.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (Array2<f32>, Array2<f32>)> + '_ {
        self.order.chunks(batch_size.get()).map(|rows| {
            (
                self.x.select(Axis(0), rows),
                self.y.select(Axis(0), rows),
            )
        })
    }
}
