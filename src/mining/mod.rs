//! Mining module - probabilistic block production and reward payout

mod entropy;
mod producer;

pub use entropy::*;
pub use producer::*;
