use crate::Result;

pub trait Optimizer {
    /// Takes a step over `params` following `grad`.
    ///
    /// # Errors
    /// Returns `MlErr::SizeMismatch` if the slices differ in length.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;
}
