//! Consensus module - Block structure, emission schedule, difficulty, and rewards

mod block;
mod difficulty;
mod emissions;
mod rewards;

pub use block::*;
pub use difficulty::*;
pub use emissions::*;
pub use rewards::*;
