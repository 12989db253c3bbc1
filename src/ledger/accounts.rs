//! In-memory account store
//!
//! Balances, owned rigs, burn records and the supply counters. Purchases and
//! repairs are paid in the season currency and the payment is burned, which
//! shrinks circulating supply.

use std::collections::{BTreeMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{find_tier, rig_catalog, ParticipantId, PricedTier, RewardLedger, Rig};
use crate::config::LedgerConfig;
use crate::crypto::hash_fields;
use crate::error::LedgerError;

/// A participant account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub balance: f64,
    /// Lifetime block rewards received
    pub total_earned: f64,
    pub created_at: u64,
    pub rigs: Vec<Rig>,
}

impl Participant {
    /// Sum of rig contributions at `now`
    pub fn effective_rate(&self, now: u64, decay_per_hour: f64) -> f64 {
        self.rigs
            .iter()
            .map(|rig| rig.effective_rate(now, decay_per_hour))
            .sum()
    }

    fn rig_mut(&mut self, rig_id: &str) -> Result<&mut Rig, LedgerError> {
        self.rigs
            .iter_mut()
            .find(|rig| rig.id == rig_id)
            .ok_or_else(|| LedgerError::UnknownRig(rig_id.to_string()))
    }
}

/// Rig state as seen at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigStatus {
    #[serde(flatten)]
    pub rig: Rig,
    pub quality: f64,
    pub effective_rate: f64,
    pub repair_cost: f64,
}

/// Participant state as seen at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub balance: f64,
    pub total_earned: f64,
    pub effective_rate: f64,
    pub rigs: Vec<RigStatus>,
}

/// Why currency was burned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnReason {
    RigPurchase,
    RigRepair,
}

/// One burn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnRecord {
    pub participant: ParticipantId,
    pub amount: f64,
    pub reason: BurnReason,
    pub rig_id: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Supply counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyStats {
    pub global_burned: f64,
    pub circulating_supply: f64,
}

/// Result of a purchase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigPurchase {
    pub rig: Rig,
    pub price: f64,
    pub new_balance: f64,
    pub supply: SupplyStats,
}

/// Result of a repair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigRepair {
    pub rig: Rig,
    pub repair_cost: f64,
    pub new_balance: f64,
    pub supply: SupplyStats,
}

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub participant: ParticipantId,
    pub total_earned: f64,
    pub balance: f64,
    pub effective_rate: f64,
    pub rig_count: usize,
}

/// In-memory ledger
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    config: LedgerConfig,
    participants: BTreeMap<ParticipantId, Participant>,
    burns: Vec<BurnRecord>,
    processed_keys: HashSet<String>,
    global_burned: f64,
    rigs_issued: u64,
}

impl MemoryLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            participants: BTreeMap::new(),
            burns: Vec::new(),
            processed_keys: HashSet::new(),
            global_burned: 0.0,
            rigs_issued: 0,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Get or create a participant with the starting balance
    pub fn register(&mut self, participant: &str, now: u64) -> &mut Participant {
        let starting_balance = self.config.starting_balance;
        self.participants
            .entry(participant.to_string())
            .or_insert_with(|| {
                info!("Registered participant {}", participant);
                Participant {
                    id: participant.to_string(),
                    balance: starting_balance,
                    total_earned: 0.0,
                    created_at: now,
                    rigs: Vec::new(),
                }
            })
    }

    pub fn participant(&self, participant: &str) -> Option<&Participant> {
        self.participants.get(participant)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Participant with rig quality, rate and repair cost evaluated at `now`
    pub fn summary(&self, participant: &str, now: u64) -> Result<ParticipantSummary, LedgerError> {
        let p = self
            .participants
            .get(participant)
            .ok_or_else(|| LedgerError::UnknownParticipant(participant.to_string()))?;
        let decay = self.config.quality_decay_per_hour;

        let rigs = p
            .rigs
            .iter()
            .map(|rig| RigStatus {
                rig: rig.clone(),
                quality: rig.quality_at(now, decay),
                effective_rate: rig.effective_rate(now, decay),
                repair_cost: rig.repair_cost(now, decay, self.config.repair_cost_rate),
            })
            .collect();

        Ok(ParticipantSummary {
            id: p.id.clone(),
            balance: p.balance,
            total_earned: p.total_earned,
            effective_rate: p.effective_rate(now, decay),
            rigs,
        })
    }

    /// Catalog priced at the current block reward
    pub fn rig_tiers(&self, current_reward: f64) -> Vec<PricedTier> {
        rig_catalog()
            .into_iter()
            .map(|tier| {
                let price = tier.price(current_reward);
                PricedTier { tier, price }
            })
            .collect()
    }

    /// Buy a rig at the current price and burn the payment.
    ///
    /// A repeated `idempotency_key` is rejected before anything is charged.
    /// Unknown participants are registered first.
    pub fn buy_rig(
        &mut self,
        participant: &str,
        tier_id: &str,
        current_reward: f64,
        idempotency_key: Option<String>,
        now: u64,
    ) -> Result<RigPurchase, LedgerError> {
        let tier = find_tier(tier_id).ok_or_else(|| LedgerError::UnknownTier(tier_id.to_string()))?;
        if let Some(key) = &idempotency_key {
            if self.processed_keys.contains(key) {
                return Err(LedgerError::DuplicateRequest(key.clone()));
            }
        }

        let price = tier.price(current_reward);
        let rig_id = self.next_rig_id(participant);

        let account = self.register(participant, now);
        if account.balance < price {
            return Err(LedgerError::InsufficientBalance {
                required: price,
                available: account.balance,
            });
        }
        account.balance -= price;
        let rig = Rig::new(rig_id.clone(), &tier, price, now);
        account.rigs.push(rig.clone());
        let new_balance = account.balance;

        if let Some(key) = &idempotency_key {
            self.processed_keys.insert(key.clone());
        }
        self.burn(participant, price, BurnReason::RigPurchase, rig_id, now, idempotency_key);

        info!(
            "Participant {} bought {} for {:.2} (balance {:.2})",
            participant, tier.name, price, new_balance
        );

        Ok(RigPurchase {
            rig,
            price,
            new_balance,
            supply: self.supply(),
        })
    }

    /// Restore a rig to full quality and burn the cost
    pub fn repair_rig(
        &mut self,
        participant: &str,
        rig_id: &str,
        now: u64,
    ) -> Result<RigRepair, LedgerError> {
        let decay = self.config.quality_decay_per_hour;
        let cost_rate = self.config.repair_cost_rate;

        let account = self
            .participants
            .get_mut(participant)
            .ok_or_else(|| LedgerError::UnknownParticipant(participant.to_string()))?;
        let available = account.balance;
        let rig = account.rig_mut(rig_id)?;

        let cost = rig.repair_cost(now, decay, cost_rate);
        if available < cost {
            return Err(LedgerError::InsufficientBalance {
                required: cost,
                available,
            });
        }
        rig.service(now);
        let rig = rig.clone();
        account.balance -= cost;
        let new_balance = account.balance;

        if cost > 0.0 {
            self.burn(participant, cost, BurnReason::RigRepair, rig_id.to_string(), now, None);
        }
        debug!("Participant {} repaired {} for {:.2}", participant, rig_id, cost);

        Ok(RigRepair {
            rig,
            repair_cost: cost,
            new_balance,
            supply: self.supply(),
        })
    }

    /// Switch a rig on or off; inactive rigs carry no weight
    pub fn set_rig_active(
        &mut self,
        participant: &str,
        rig_id: &str,
        active: bool,
    ) -> Result<(), LedgerError> {
        let account = self
            .participants
            .get_mut(participant)
            .ok_or_else(|| LedgerError::UnknownParticipant(participant.to_string()))?;
        account.rig_mut(rig_id)?.active = active;
        Ok(())
    }

    /// Participants ranked by lifetime earnings
    pub fn leaderboard(&self, limit: usize, now: u64) -> Vec<LeaderboardEntry> {
        let decay = self.config.quality_decay_per_hour;
        let mut ranked: Vec<&Participant> = self.participants.values().collect();
        ranked.sort_by(|a, b| b.total_earned.total_cmp(&a.total_earned));

        ranked
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, p)| LeaderboardEntry {
                rank: i + 1,
                participant: p.id.clone(),
                total_earned: p.total_earned,
                balance: p.balance,
                effective_rate: p.effective_rate(now, decay),
                rig_count: p.rigs.len(),
            })
            .collect()
    }

    pub fn burns(&self) -> &[BurnRecord] {
        &self.burns
    }

    fn next_rig_id(&mut self, participant: &str) -> String {
        self.rigs_issued += 1;
        let digest = hash_fields(&[participant.as_bytes(), &self.rigs_issued.to_le_bytes()]);
        format!("rig-{}", digest.short())
    }

    fn burn(
        &mut self,
        participant: &str,
        amount: f64,
        reason: BurnReason,
        rig_id: String,
        timestamp: u64,
        idempotency_key: Option<String>,
    ) {
        self.global_burned += amount;
        self.burns.push(BurnRecord {
            participant: participant.to_string(),
            amount,
            reason,
            rig_id,
            timestamp,
            idempotency_key,
        });
    }
}

impl RewardLedger for MemoryLedger {
    fn weights(&self, now_ms: u64) -> Vec<(ParticipantId, f64)> {
        let decay = self.config.quality_decay_per_hour;
        self.participants
            .iter()
            .map(|(id, p)| (id.clone(), p.effective_rate(now_ms, decay)))
            .collect()
    }

    fn participant_weight(&self, participant: &str, now_ms: u64) -> f64 {
        self.participants
            .get(participant)
            .map_or(0.0, |p| p.effective_rate(now_ms, self.config.quality_decay_per_hour))
    }

    fn min_network_weight(&self) -> f64 {
        self.config.min_network_weight
    }

    fn credit_participant(&mut self, participant: &str, amount: f64) -> Result<(), LedgerError> {
        let account = self
            .participants
            .get_mut(participant)
            .ok_or_else(|| LedgerError::UnknownParticipant(participant.to_string()))?;
        account.balance += amount;
        account.total_earned += amount;
        Ok(())
    }

    fn supply(&self) -> SupplyStats {
        SupplyStats {
            global_burned: self.global_burned,
            circulating_supply: self.config.initial_circulating - self.global_burned,
        }
    }
}
