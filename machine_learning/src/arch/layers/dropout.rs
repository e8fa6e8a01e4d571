use ndarray::Array2;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Zeroes each input with probability `p` while training, scaling the survivors by `1 / (1 - p)`.
/// Acts as the identity at inference time.
#[derive(Debug, Clone)]
pub struct Dropout {
    p: f32,
    rng: StdRng,
    mask: Array2<f32>,
}

impl Dropout {
    pub fn new(p: f32, seed: u64) -> Self {
        Self {
            p: p.clamp(0., 0.99),
            rng: StdRng::seed_from_u64(seed),
            mask: Array2::zeros((0, 0)),
        }
    }

    pub fn forward(&mut self, x: Array2<f32>) -> Array2<f32> {
        let keep = 1. - self.p;
        let rng = &mut self.rng;
        self.mask = x.mapv(|_| {
            if rng.random::<f32>() < keep {
                1. / keep
            } else {
                0.
            }
        });

        x * &self.mask
    }

    pub fn backward(&self, d: Array2<f32>) -> Array2<f32> {
        d * &self.mask
    }
}
