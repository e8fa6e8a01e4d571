mod adam;
mod optimizer;

pub use adam::{Adam, AdamParams};
pub use optimizer::Optimizer;
