//! Error types
//!
//! Season exhaustion is deliberately absent: running out of emission is a
//! terminal state reported by the producer, not a failure.

use thiserror::Error;

/// Configuration errors, fatal at construction
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Ledger collaborator errors
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),
    #[error("Rig tier not found: {0}")]
    UnknownTier(String),
    #[error("Rig not found: {0}")]
    UnknownRig(String),
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: f64, available: f64 },
    #[error("Request already processed: {0}")]
    DuplicateRequest(String),
}
