//! JSON-RPC API Module
//!
//! Provides the HTTP query surface for the game front end.

mod methods;
mod server;

pub use methods::*;
pub use server::*;
