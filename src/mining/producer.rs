//! Block producer
//!
//! One tick is one Bernoulli trial. A successful trial produces a block whose
//! subsidy comes from the emission schedule, clipped to the remaining budget,
//! and whose reward (subsidy + fees) is split across participants by weight.
//! The whole production step runs under `&mut self`; callers sharing a
//! producer across tasks wrap it in a single lock.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Entropy;
use crate::config::{EmissionConfig, ProductionConfig};
use crate::consensus::{
    blocks_until_retarget, calculate_next_difficulty, distribute_reward, network_weight,
    should_adjust_difficulty, Block, BlockTemplate, EmissionsPreview, EmissionsSchedule,
    EmissionsTelemetry, Transaction,
};
use crate::crypto::hash_fields;
use crate::error::ConfigError;
use crate::events::{Event, EventBus};
use crate::ledger::RewardLedger;
use crate::storage::{BlockPage, ChainState};

/// Largest synthetic transfer amount
const MAX_TX_AMOUNT: f64 = 10.0;

/// Largest synthetic per-transaction fee
const MAX_TX_FEE: f64 = 0.001;

/// Result of a production attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ProduceOutcome {
    Produced(Block),
    /// Nothing was produced; the season is over
    SeasonEnded,
}

/// Network view published every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub height: u64,
    pub timestamp: u64,
    pub difficulty: f64,
    pub network_weight: f64,
    pub avg_block_time: f64,
    /// Subsidy of the next block; 0 once the season is over
    pub current_reward: f64,
    pub next_halving_height: Option<u64>,
    pub blocks_until_retarget: u64,
    pub buffered_blocks: usize,
    pub global_burned: f64,
    pub circulating_supply: f64,
    pub emissions: EmissionsTelemetry,
    pub season_ended: bool,
}

/// What one tick did
#[derive(Debug, Clone)]
pub struct TickReport {
    pub block: Option<Block>,
    pub telemetry: TelemetrySnapshot,
}

/// Owns the emission schedule, chain state and ledger of one season
pub struct BlockProducer<L, E> {
    schedule: EmissionsSchedule,
    chain: ChainState,
    config: ProductionConfig,
    ledger: L,
    entropy: E,
    events: EventBus,
    season_ended: bool,
}

impl<L: RewardLedger, E: Entropy> BlockProducer<L, E> {
    /// Create a producer for a season starting at `started_at` (ms)
    pub fn new(
        emission: EmissionConfig,
        config: ProductionConfig,
        ledger: L,
        entropy: E,
        events: EventBus,
        started_at: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let schedule = EmissionsSchedule::new(emission)?;
        let chain = ChainState::new(
            config.initial_difficulty,
            schedule.config().target_block_interval_secs,
            config.max_blocks_in_memory,
            started_at,
        );

        info!(
            "Season configured: {} blocks, epoch length {}, R0 {:.4}",
            schedule.total_blocks(),
            schedule.epoch_length(),
            schedule.r0()
        );

        Ok(Self {
            schedule,
            chain,
            config,
            ledger,
            entropy,
            events,
            season_ended: false,
        })
    }

    /// Chance that one tick produces a block
    pub fn block_probability(&self) -> f64 {
        (self.config.tick_secs() / self.schedule.config().target_block_interval_secs).min(1.0)
    }

    /// Run one tick: maybe produce a block, then publish telemetry
    pub fn tick(&mut self, now: u64) -> TickReport {
        let mut block = None;
        if !self.season_ended && self.entropy.next_unit() < self.block_probability() {
            if let ProduceOutcome::Produced(produced) = self.produce_block(now) {
                block = Some(produced);
            }
        }

        let telemetry = self.telemetry(now);
        self.events.publish(Event::Telemetry(telemetry.clone()));

        TickReport { block, telemetry }
    }

    /// Produce the next block at `now`
    pub fn produce_block(&mut self, now: u64) -> ProduceOutcome {
        if self.season_ended {
            return ProduceOutcome::SeasonEnded;
        }

        let height = self.chain.height;
        let subsidy = self
            .schedule
            .clip_to_total(self.schedule.current_reward(height));
        if subsidy <= 0.0 || self.schedule.has_ended(height) {
            self.end_season(height);
            return ProduceOutcome::SeasonEnded;
        }

        let block = self.assemble(height + 1, now, subsidy);

        let observed = self.chain.apply_block(block.clone());

        self.schedule.increment_emitted(subsidy);
        if self.schedule.has_ended(block.height) {
            self.end_season(block.height);
        }

        self.chain.record_block_time(observed);
        self.maybe_retarget(block.height, now);
        self.pay_out(&block, now);
        self.events.publish(Event::Block(block.clone()));

        info!(
            "Block {} produced: subsidy {:.4}, emitted {:.4}/{:.0}",
            block.height,
            subsidy,
            self.schedule.emitted_total(),
            self.schedule.total_emission()
        );

        ProduceOutcome::Produced(block)
    }

    /// Current network view
    pub fn telemetry(&self, now: u64) -> TelemetrySnapshot {
        let height = self.chain.height;
        let mut emissions = self.schedule.telemetry(height);
        let (current_reward, next_halving_height) = if self.season_ended {
            emissions.current_reward = 0.0;
            emissions.next_halving_in = None;
            (0.0, None)
        } else {
            (
                emissions.current_reward,
                self.schedule.next_halving_height(height),
            )
        };

        let supply = self.ledger.supply();

        TelemetrySnapshot {
            height,
            timestamp: now,
            difficulty: self.chain.difficulty,
            network_weight: self.ledger.total_network_weight(now),
            avg_block_time: self.chain.avg_block_time,
            current_reward,
            next_halving_height,
            blocks_until_retarget: blocks_until_retarget(
                height,
                self.config.difficulty_retarget_blocks,
            ),
            buffered_blocks: self.chain.buffered_len(),
            global_burned: supply.global_burned,
            circulating_supply: supply.circulating_supply,
            emissions,
            season_ended: self.season_ended,
        }
    }

    /// Subsidy the next block would carry; 0 once the season is over
    pub fn current_reward(&self) -> f64 {
        if self.season_ended {
            0.0
        } else {
            self.schedule.current_reward(self.chain.height)
        }
    }

    pub fn block_at(&self, height: u64) -> Option<&Block> {
        self.chain.block_at(height)
    }

    pub fn recent_blocks(&self, cursor: Option<u64>, limit: usize) -> BlockPage {
        self.chain.recent_blocks(cursor, limit)
    }

    pub fn emissions_preview(&self) -> EmissionsPreview {
        self.schedule.preview()
    }

    pub fn schedule(&self) -> &EmissionsSchedule {
        &self.schedule
    }

    pub fn chain(&self) -> &ChainState {
        &self.chain
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn is_season_ended(&self) -> bool {
        self.season_ended
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn assemble(&mut self, height: u64, now: u64, subsidy: f64) -> Block {
        let total_fees = self.entropy.next_unit() * self.config.max_block_fees;

        let span = self
            .config
            .max_logical_tx_count
            .saturating_sub(self.config.min_logical_tx_count);
        let extra = if span == 0 {
            0
        } else {
            ((self.entropy.next_unit() * span as f64) as u64).min(span - 1)
        };
        let tx_count = self.config.min_logical_tx_count + extra;

        let listed = tx_count.min(self.config.max_listed_transactions as u64);
        let transactions = (0..listed)
            .map(|index| self.synthetic_transaction(height, index))
            .collect();

        let is_orphan = self.entropy.next_unit() < self.config.orphan_probability;

        Block::assemble(BlockTemplate {
            height,
            timestamp: now,
            previous_hash: self.chain.tip_hash,
            difficulty: self.chain.difficulty,
            subsidy,
            total_fees,
            tx_count,
            is_orphan,
            transactions,
            salt: self.entropy.next_u64(),
        })
    }

    fn synthetic_transaction(&mut self, height: u64, index: u64) -> Transaction {
        let amount = self.entropy.next_unit() * MAX_TX_AMOUNT;
        let fee = self.entropy.next_unit() * MAX_TX_FEE;
        let salt = self.entropy.next_u64();

        let id = hash_fields(&[
            b"tx",
            &height.to_le_bytes(),
            &index.to_le_bytes(),
            &salt.to_le_bytes(),
        ]);
        let from = hash_fields(&[b"from", id.as_bytes()]);
        let to = hash_fields(&[b"to", id.as_bytes()]);

        Transaction {
            id,
            amount,
            fee,
            from: format!("0x{}", from.short()),
            to: format!("0x{}", to.short()),
        }
    }

    fn maybe_retarget(&mut self, height: u64, now: u64) {
        let window = self.config.difficulty_retarget_blocks;
        if !should_adjust_difficulty(height, window) {
            return;
        }

        let previous = self.chain.difficulty;
        let next = calculate_next_difficulty(
            previous,
            self.chain.retarget_window_start(),
            now,
            self.schedule.config().target_block_interval_secs,
            window,
            self.config.max_difficulty_adjustment,
        );
        self.chain.retarget(next, now);

        info!(
            "Difficulty retarget at height {}: {:.2} -> {:.2}",
            height, previous, next
        );
    }

    fn pay_out(&mut self, block: &Block, now: u64) {
        let weights = self.ledger.weights(now);
        let total_weight = network_weight(
            weights.iter().map(|(_, w)| *w),
            self.ledger.min_network_weight(),
        );
        let payouts = distribute_reward(block.reward, &weights, total_weight);

        debug!(
            "Distributing {:.6} over {} participants (network weight {:.2})",
            block.reward,
            payouts.len(),
            total_weight
        );

        for payout in payouts {
            if let Err(e) = self
                .ledger
                .credit_participant(&payout.participant, payout.amount)
            {
                warn!("Failed to credit {}: {}", payout.participant, e);
            }
        }
    }

    fn end_season(&mut self, height: u64) {
        if !self.season_ended {
            self.season_ended = true;
            info!(
                "Season ended at height {}: emitted {:.4} of {:.0}",
                height,
                self.schedule.emitted_total(),
                self.schedule.total_emission()
            );
        }
    }
}
