use ndarray::Array2;

use crate::{arch::loss::LossFn, error::Result, optimization::Optimizer};

/// A differentiable model whose parameters live outside of it, in a flat buffer.
pub trait Model {
    /// The amount of parameters the model reads from the buffer.
    fn size(&self) -> usize;

    /// Runs one epoch over `batches`, stepping `optimizer` after every batch.
    ///
    /// `grad` is scratch space of the same length as `params`.
    ///
    /// # Returns
    /// The mean batch loss.
    fn backprop<L, O, I>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut O,
        batches: I,
    ) -> Result<f32>
    where
        L: LossFn,
        O: Optimizer,
        I: Iterator<Item = (Array2<f32>, Array2<f32>)>;
}
