//! Season emission schedule
//!
//! Splits a fixed total emission across a fixed number of halving epochs.
//! Rewards are a pure function of height; the season total is enforced by a
//! running emitted counter and clip-before-increment.
//!
//! Epoch `e` pays `R0 / 2^e` per block, where `R0` is chosen so that equal
//! epochs of `floor(total_blocks / epochs)` blocks sum to the total emission.
//! When `total_blocks` is not a multiple of the epoch count the final epoch is
//! longer than the others and the formula overshoots; `clip_to_total` is what
//! keeps the final blocks inside the budget.

use crate::config::EmissionConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Read-only emission view at a given height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsTelemetry {
    pub current_reward: f64,
    pub emitted_total: f64,
    pub remaining: f64,
    pub total_emission: f64,
    pub blocks_remaining: u64,
    /// Blocks until the next halving boundary, `None` in the final epoch
    pub next_halving_in: Option<u64>,
    pub epoch_index: u32,
    pub halving_epochs: u32,
    pub epoch_length: u64,
    /// Final epoch also absorbs the division remainder
    pub final_epoch_length: u64,
    pub total_blocks: u64,
    pub halving_heights: Vec<u64>,
    pub r0: f64,
}

/// Static derived schedule, available before any block exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsPreview {
    pub total_blocks: u64,
    pub epoch_length: u64,
    pub r0: f64,
    pub halving_heights: Vec<u64>,
    pub total_emission: f64,
}

/// Compensated running sum of emitted subsidy.
///
/// Tens of thousands of additions of rewards that are small relative to the
/// total would otherwise drift by more than the conservation tolerance.
#[derive(Debug, Clone, Copy, Default)]
struct EmittedTotal {
    sum: f64,
    compensation: f64,
}

impl EmittedTotal {
    fn add(&mut self, amount: f64) {
        let next = self.sum + amount;
        if self.sum.abs() >= amount.abs() {
            self.compensation += (self.sum - next) + amount;
        } else {
            self.compensation += (amount - next) + self.sum;
        }
        self.sum = next;
    }

    fn value(&self) -> f64 {
        self.sum + self.compensation
    }

    fn settled(total: f64) -> Self {
        Self {
            sum: total,
            compensation: 0.0,
        }
    }
}

/// Single source of truth for per-block subsidy and season end
#[derive(Debug, Clone)]
pub struct EmissionsSchedule {
    config: EmissionConfig,
    total_blocks: u64,
    epoch_length: u64,
    halving_heights: Vec<u64>,
    series_sum: f64,
    r0: f64,
    emitted: EmittedTotal,
}

impl EmissionsSchedule {
    /// Validate the configuration and precompute the schedule
    pub fn new(config: EmissionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let epochs = config.halving_epochs;
        let total_blocks = config.total_blocks();
        let epoch_length = total_blocks / epochs as u64;
        let halving_heights = (1..epochs as u64).map(|i| i * epoch_length).collect();
        let series_sum: f64 = (0..epochs).map(|k| 1.0 / halving_divisor(k)).sum();
        let r0 = config.total_emission / (epoch_length as f64 * series_sum);

        Ok(Self {
            config,
            total_blocks,
            epoch_length,
            halving_heights,
            series_sum,
            r0,
            emitted: EmittedTotal::default(),
        })
    }

    pub fn config(&self) -> &EmissionConfig {
        &self.config
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    pub fn epoch_length(&self) -> u64 {
        self.epoch_length
    }

    pub fn halving_heights(&self) -> &[u64] {
        &self.halving_heights
    }

    pub fn series_sum(&self) -> f64 {
        self.series_sum
    }

    /// Epoch-0 per-block reward
    pub fn r0(&self) -> f64 {
        self.r0
    }

    pub fn total_emission(&self) -> f64 {
        self.config.total_emission
    }

    /// Subsidy credited so far
    pub fn emitted_total(&self) -> f64 {
        self.emitted.value()
    }

    /// Budget still available, never negative
    pub fn remaining(&self) -> f64 {
        (self.config.total_emission - self.emitted_total()).max(0.0)
    }

    /// Epoch of the block built on top of `height`.
    ///
    /// A boundary height belongs to the new epoch; heights past the last
    /// boundary stay in the final epoch.
    pub fn epoch_index_of(&self, height: u64) -> u32 {
        self.halving_heights.partition_point(|&boundary| boundary <= height) as u32
    }

    /// `R0 / 2^epoch`; independent of how much was already emitted
    pub fn current_reward(&self, height: u64) -> f64 {
        self.r0 / halving_divisor(self.epoch_index_of(height))
    }

    /// Limit a proposed reward to what the budget still allows.
    ///
    /// Has no side effects, so repeated calls without an intervening
    /// `increment_emitted` agree.
    pub fn clip_to_total(&self, proposed_reward: f64) -> f64 {
        proposed_reward.min(self.remaining())
    }

    /// Add an accepted block's subsidy. Callers pass the output of
    /// `clip_to_total` exactly once per block.
    ///
    /// An amount equal to the whole remaining budget settles the counter at
    /// exactly the total, so rounding cannot leave it a few ulps off.
    pub fn increment_emitted(&mut self, amount: f64) {
        let remaining = self.remaining();
        debug_assert!(
            amount >= 0.0 && amount <= remaining,
            "increment {} outside remaining budget {}",
            amount,
            remaining
        );
        if amount == remaining {
            self.emitted = EmittedTotal::settled(self.config.total_emission);
        } else {
            self.emitted.add(amount);
        }
    }

    /// Either the budget is spent or the block cap is reached
    pub fn has_ended(&self, height: u64) -> bool {
        self.emitted_total() >= self.config.total_emission || height >= self.total_blocks
    }

    /// Height of the next halving boundary after `height`, if any
    pub fn next_halving_height(&self, height: u64) -> Option<u64> {
        let epoch = self.epoch_index_of(height) as usize;
        self.halving_heights.get(epoch).copied()
    }

    /// Number of blocks in the final epoch
    pub fn final_epoch_length(&self) -> u64 {
        self.total_blocks - self.epoch_length * (self.config.halving_epochs as u64 - 1)
    }

    pub fn telemetry(&self, height: u64) -> EmissionsTelemetry {
        EmissionsTelemetry {
            current_reward: self.current_reward(height),
            emitted_total: self.emitted_total(),
            remaining: self.remaining(),
            total_emission: self.config.total_emission,
            blocks_remaining: self.total_blocks.saturating_sub(height),
            next_halving_in: self
                .next_halving_height(height)
                .map(|boundary| boundary.saturating_sub(height)),
            epoch_index: self.epoch_index_of(height),
            halving_epochs: self.config.halving_epochs,
            epoch_length: self.epoch_length,
            final_epoch_length: self.final_epoch_length(),
            total_blocks: self.total_blocks,
            halving_heights: self.halving_heights.clone(),
            r0: self.r0,
        }
    }

    pub fn preview(&self) -> EmissionsPreview {
        EmissionsPreview {
            total_blocks: self.total_blocks,
            epoch_length: self.epoch_length,
            r0: self.r0,
            halving_heights: self.halving_heights.clone(),
            total_emission: self.config.total_emission,
        }
    }
}

/// `2^epoch` as a float; exact for every supported epoch count
fn halving_divisor(epoch: u32) -> f64 {
    2f64.powi(epoch as i32)
}
