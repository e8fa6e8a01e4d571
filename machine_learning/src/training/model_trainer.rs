use std::num::NonZeroUsize;

use rand::Rng;

use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    optimization::Optimizer,
};

/// Logs the epoch loss every this many epochs.
const LOG_EVERY: usize = 20;

/// A model trainer. Contains the relevant components needed for training a model,
/// including the model itself.
pub struct ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    grad: Vec<f32>,
    optimizer: O,
    dataset: Dataset,
    loss_fn: L,
    model: M,

    epochs: usize,
    batch_size: NonZeroUsize,
    rng: R,
}

impl<M, O, L, R> ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer used on every batch.
    /// * `dataset` - The dataset the model will be trained with.
    /// * `epochs` - The amount of passes over the dataset per `train` call.
    /// * `batch_size` - The amount of rows per batch.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `rng` - A random number generator, used for shuffling the dataset.
    pub fn new(
        model: M,
        optimizer: O,
        dataset: Dataset,
        epochs: usize,
        batch_size: NonZeroUsize,
        loss_fn: L,
        rng: R,
    ) -> Self {
        Self {
            grad: vec![0.0; model.size()],
            model,
            optimizer,
            dataset,
            epochs,
            batch_size,
            loss_fn,
            rng,
        }
    }

    /// Performs `epochs` epochs of training its model, using its optimizer, dataset, loss
    /// function and batch size.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, updated in place.
    ///
    /// # Returns
    /// The loss of every epoch.
    pub fn train(&mut self, params: &mut [f32]) -> Result<Vec<f32>> {
        if self.dataset.is_empty() {
            return Err(MlErr::EmptyInput("dataset"));
        }

        let mut losses = Vec::with_capacity(self.epochs);

        for epoch in 1..=self.epochs {
            self.dataset.shuffle(&mut self.rng);
            let batches = self.dataset.batches(self.batch_size);

            let loss = self.model.backprop(
                params,
                &mut self.grad,
                &self.loss_fn,
                &mut self.optimizer,
                batches,
            )?;

            if !loss.is_finite() {
                return Err(MlErr::Numerical(format!("loss diverged at epoch {epoch}")));
            }

            if epoch % LOG_EVERY == 0 {
                log::debug!("epoch [{epoch}/{}], loss: {loss:.4}", self.epochs);
            }

            losses.push(loss);
        }

        Ok(losses)
    }
}
