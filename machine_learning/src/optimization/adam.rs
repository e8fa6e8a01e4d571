use super::Optimizer;
use crate::{MlErr, Result};

/// Hyperparameters of [`Adam`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamParams {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for AdamParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Adam with bias corrected first and second moment estimates.
#[derive(Debug)]
pub struct Adam {
    params: AdamParams,
    step: i32,
    m: Vec<f32>,
    v: Vec<f32>,
}

impl Adam {
    /// Creates a new `Adam` optimizer for `len` parameters.
    pub fn new(len: usize, params: AdamParams) -> Self {
        Self {
            params,
            step: 0,
            m: vec![0.; len],
            v: vec![0.; len],
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        for len in [grad.len(), params.len()] {
            if len != self.m.len() {
                return Err(MlErr::SizeMismatch {
                    what: "optimizer state",
                    got: len,
                    expected: self.m.len(),
                });
            }
        }

        let AdamParams {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.params;

        self.step = self.step.saturating_add(1);
        let m_correction = 1. - beta1.powi(self.step);
        let v_correction = 1. - beta2.powi(self.step);

        for (((p, &g), m), v) in params
            .iter_mut()
            .zip(grad)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = beta1 * *m + (1. - beta1) * g;
            *v = beta2 * *v + (1. - beta2) * g * g;

            let m_hat = *m / m_correction;
            let v_hat = *v / v_correction;
            *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adam(len: usize, learning_rate: f32) -> Adam {
        Adam::new(
            len,
            AdamParams {
                learning_rate,
                ..Default::default()
            },
        )
    }

    #[test]
    fn first_step_moves_by_the_learning_rate() {
        let mut adam = adam(2, 0.1);
        let mut params = [1., 1.];

        adam.update_params(&[0.5, -2.], &mut params).unwrap();

        assert!((params[0] - 0.9).abs() < 1e-4);
        assert!((params[1] - 1.1).abs() < 1e-4);
    }

    #[test]
    fn descends_a_parabola() {
        let mut adam = adam(1, 0.05);
        let mut x = [3.];

        for _ in 0..500 {
            let grad = [2. * x[0]];
            adam.update_params(&grad, &mut x).unwrap();
        }

        assert!(x[0].abs() < 0.1);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let mut adam = adam(2, 0.1);
        let mut params = [1., 1., 1.];

        assert!(adam.update_params(&[0.; 3], &mut params).is_err());
    }
}
