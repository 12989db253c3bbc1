//! Ledger module - participant balances, mining rigs and burns
//!
//! The block producer only sees the [`RewardLedger`] contract: who has how
//! much weight, and where to credit rewards. Everything else here (rig
//! catalog, purchases, repairs, burns) belongs to the account store.

mod accounts;
mod equipment;

pub use accounts::*;
pub use equipment::*;

use crate::consensus::network_weight;
use crate::error::LedgerError;

/// Participant identifier (session id)
pub type ParticipantId = String;

/// Account store contract used by the block producer
pub trait RewardLedger {
    /// Every participant with their effective rate at `now_ms`
    fn weights(&self, now_ms: u64) -> Vec<(ParticipantId, f64)>;

    /// One participant's effective rate; unknown participants weigh nothing
    fn participant_weight(&self, participant: &str, now_ms: u64) -> f64;

    /// Denominator floor for reward shares
    fn min_network_weight(&self) -> f64;

    /// Sum of all weights, never below the configured floor
    fn total_network_weight(&self, now_ms: u64) -> f64 {
        network_weight(
            self.weights(now_ms).into_iter().map(|(_, w)| w),
            self.min_network_weight(),
        )
    }

    /// Add a reward share to a participant's balance and lifetime earnings
    fn credit_participant(&mut self, participant: &str, amount: f64) -> Result<(), LedgerError>;

    /// Burned and circulating totals
    fn supply(&self) -> SupplyStats;
}
