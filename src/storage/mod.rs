//! Storage module - in-memory chain state and recent block buffer

mod state;

pub use state::*;
