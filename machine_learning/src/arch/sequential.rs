use ndarray::{Array2, ArrayView2};

use super::{Model, layers::Layer, loss::LossFn};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    fn check_params(&self, params: &[f32]) -> Result<()> {
        let size = self.size();
        if params.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got: params.len(),
                expected: size,
            });
        }

        Ok(())
    }

    /// Makes a training forward pass through the network, keeping what backprop needs.
    ///
    /// # Arguments
    /// * `params` - The parameters of every layer, one after the other.
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_params(params)?;

        let mut offset = 0;
        let mut x = x.to_owned();
        for layer in self.layers.iter_mut() {
            let size = layer.size();
            x = layer.forward(&params[offset..offset + size], x)?;
            offset += size;
        }

        Ok(x)
    }

    /// Makes an inference pass, dropout disabled and nothing kept.
    pub fn infer(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_params(params)?;

        let mut offset = 0;
        let mut x = x.to_owned();
        for layer in &self.layers {
            let size = layer.size();
            x = layer.infer(&params[offset..offset + size], x.view())?;
            offset += size;
        }

        Ok(x)
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    // NOTE: the epoch loss is the average of the batch losses, which is close enough to the loss
    // over the whole dataset without needing another forward pass.
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
        I: Iterator<Item = (Array2<f32>, Array2<f32>)>,
    {
        if grad.len() != params.len() {
            return Err(MlErr::SizeMismatch {
                what: "gradient buffer",
                got: grad.len(),
                expected: params.len(),
            });
        }

        let mut total_loss = 0.0;
        let mut num_batches = 0;

        for (x, y) in batches {
            grad.fill(0.);

            let y_pred = self.forward(params, x.view())?;
            total_loss += loss_fn.loss(y_pred.view(), y.view());
            num_batches += 1;

            let mut d = loss_fn.loss_prime(y_pred.view(), y.view());
            let mut end = params.len();
            for layer in self.layers.iter_mut().rev() {
                let start = end - layer.size();
                d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
                end = start;
            }

            optimizer.update_params(grad, params)?;
        }

        if num_batches == 0 {
            return Err(MlErr::EmptyInput("batch list"));
        }

        Ok(total_loss / num_batches as f32)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{activations::ActFn, loss::CrossEntropy},
        optimization::{Adam, AdamParams},
    };

    fn model() -> Sequential {
        Sequential::new([
            Layer::dense((2, 3), Some(ActFn::relu())),
            Layer::dropout(0.0, 0),
            Layer::dense((3, 2), None),
        ])
    }

    #[test]
    fn size_adds_up_the_layers() {
        assert_eq!(model().size(), 9 + 8);
    }

    #[test]
    fn training_and_inference_agree_without_dropout() {
        let mut model = model();
        let params: Vec<f32> = (0..17).map(|i| (i as f32 - 8.) / 10.).collect();
        let x = array![[1., 2.], [-1., 0.5]];

        let trained = model.forward(&params, x.view()).unwrap();
        let inferred = model.infer(&params, x.view()).unwrap();

        assert_eq!(trained, inferred);
    }

    #[test]
    fn backprop_lowers_the_loss() {
        let mut model = model();
        let mut params: Vec<f32> = (0..17).map(|i| ((i * 7 % 5) as f32 - 2.) / 5.).collect();
        let mut grad = vec![0.; params.len()];
        let mut adam = Adam::new(
            params.len(),
            AdamParams {
                learning_rate: 0.05,
                ..Default::default()
            },
        );
        let x = array![[1., 0.], [0., 1.], [1., 0.1], [0.1, 1.]];
        let y = array![[1., 0.], [0., 1.], [1., 0.], [0., 1.]];

        let batch = || std::iter::once((x.clone(), y.clone()));
        let first = model
            .backprop(&mut params, &mut grad, &CrossEntropy, &mut adam, batch())
            .unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = model
                .backprop(&mut params, &mut grad, &CrossEntropy, &mut adam, batch())
                .unwrap();
        }

        assert!(last < first);
    }

    #[test]
    fn wrong_parameter_count_is_an_error() {
        let model = model();
        assert!(model.infer(&[0.; 3], array![[1., 1.]].view()).is_err());
    }
}
