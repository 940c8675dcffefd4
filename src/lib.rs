pub mod frame;
pub mod prelude;
pub mod test_stuff;
pub mod trackers;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Errors {
    #[error("The mask contains no foreground pixels - nothing to cluster.")]
    EmptyMask,
    #[error("Cannot form {0} clusters from {1} samples.")]
    InsufficientSamples(usize, usize),
}

/// Approximate comparison of estimates in tests and host-side assertions.
pub trait EstimateClose {
    fn almost_same(&self, other: &Self, eps: f32) -> bool;
}

pub(crate) const EPS: f32 = 0.00001;
