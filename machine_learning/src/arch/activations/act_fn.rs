use super::relu;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActFn {
    Relu(relu::Relu),
}

impl ActFn {
    pub fn relu() -> Self {
        Self::Relu(relu::Relu)
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            Self::Relu(a) => a.f(x),
        }
    }

    pub fn df(&self, x: f32) -> f32 {
        match self {
            Self::Relu(a) => a.df(x),
        }
    }
}
