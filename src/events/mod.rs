//! Events module - block and telemetry notifications for observers

mod bus;

pub use bus::*;

use serde::{Deserialize, Serialize};
use crate::consensus::Block;
use crate::mining::TelemetrySnapshot;

/// Notification published by the block producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Event {
    Block(Block),
    Telemetry(TelemetrySnapshot),
}
