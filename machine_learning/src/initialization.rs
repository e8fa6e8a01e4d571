use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::{MlErr, Result};

/// A weight generator that follows a certain probabilistic distribution.
pub struct RandWeightGen<D: Distribution<f32>> {
    distribution: D,
}

impl<D: Distribution<f32>> RandWeightGen<D> {
    pub fn new(distribution: D) -> Self {
        Self { distribution }
    }

    /// Draws `n` weights.
    pub fn sample<R: Rng>(&self, rng: &mut R, n: usize) -> Vec<f32> {
        (0..n).map(|_| self.distribution.sample(rng)).collect()
    }
}

impl RandWeightGen<Uniform<f32>> {
    /// Creates a new `RandWeightGen` weight generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(low: f32, high: f32) -> Result<Self> {
        let distribution =
            Uniform::new(low, high).map_err(|e| MlErr::InvalidParam(e.to_string()))?;
        Ok(Self::new(distribution))
    }

    /// Creates a new `RandWeightGen` drawing from `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`.
    ///
    /// # Arguments
    /// * `fan_in` - The number of input units in the weight tensor.
    ///
    /// # Returns
    /// An error if the calculated range is invalid.
    pub fn fan_in_uniform(fan_in: usize) -> Result<Self> {
        let range = 1. / (fan_in.max(1) as f32).sqrt();
        Self::uniform(-range, range)
    }
}

/// Draws the parameters of a stack of dense layers of dimensions `dims`, in the layout the
/// layers expect: weights followed by biases, layer after layer.
pub fn dense_params<R: Rng>(dims: &[(usize, usize)], rng: &mut R) -> Result<Vec<f32>> {
    let mut params = Vec::with_capacity(dims.iter().map(|(i, o)| (i + 1) * o).sum());
    for &(fan_in, fan_out) in dims {
        let weight_gen = RandWeightGen::fan_in_uniform(fan_in)?;
        params.extend(weight_gen.sample(rng, (fan_in + 1) * fan_out));
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn weights_stay_within_the_fan_in_bound() {
        let mut rng = StdRng::seed_from_u64(42);
        let params = dense_params(&[(4, 3), (3, 2)], &mut rng).unwrap();

        assert_eq!(params.len(), 15 + 8);
        assert!(params[..15].iter().all(|w| w.abs() <= 0.5));
    }

    #[test]
    fn empty_range_is_rejected() {
        assert!(RandWeightGen::uniform(1., 1.).is_err());
    }
}
