//! Node module - simulated clock and the season service loop

mod clock;
mod service;

pub use clock::*;
pub use service::*;
