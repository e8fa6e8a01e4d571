/// Rectified linear unit, `max(0, z)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Relu;

impl Relu {
    pub fn f(&self, z: f32) -> f32 {
        z.max(0.)
    }

    /// The derivative at `0` is taken to be `0`.
    pub fn df(&self, z: f32) -> f32 {
        if z > 0. { 1. } else { 0. }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_negatives() {
        assert_eq!(Relu.f(-2.), 0.);
        assert_eq!(Relu.f(1.5), 1.5);
        assert_eq!(Relu.df(-2.), 0.);
        assert_eq!(Relu.df(0.), 0.);
        assert_eq!(Relu.df(3.), 1.);
    }
}
