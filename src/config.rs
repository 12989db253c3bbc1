//! Simulator configuration
//!
//! Loaded once at startup from an optional JSON file, validated, and treated
//! as immutable afterwards. Every section falls back to its defaults.

use crate::constants::{
    DIFFICULTY_RETARGET_BLOCKS, HALVING_EPOCHS, INITIAL_DIFFICULTY, MAX_BLOCKS_IN_MEMORY,
    MAX_DIFFICULTY_ADJUSTMENT, MAX_HALVING_EPOCHS, MIN_NETWORK_WEIGHT, QUALITY_DECAY_PER_HOUR,
    SEASON_DAYS, SECONDS_PER_DAY, TARGET_BLOCK_INTERVAL_SECS, TOTAL_EMISSION,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete simulator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub emission: EmissionConfig,
    pub production: ProductionConfig,
    pub ledger: LedgerConfig,
    pub clock: ClockConfig,
    pub rpc: RpcConfig,
}

impl SimConfig {
    /// Load from a JSON file and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject invalid combinations before anything is derived from them
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.emission.validate()?;
        self.production.validate()?;
        self.ledger.validate()?;
        self.clock.validate()
    }
}

/// Static emission parameters for one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionConfig {
    /// Season length in days
    pub season_days: f64,
    /// Nominal seconds between blocks
    pub target_block_interval_secs: f64,
    /// Subsidy budget for the whole season
    pub total_emission: f64,
    /// Number of halving periods (>= 1)
    pub halving_epochs: u32,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            season_days: SEASON_DAYS,
            target_block_interval_secs: TARGET_BLOCK_INTERVAL_SECS,
            total_emission: TOTAL_EMISSION,
            halving_epochs: HALVING_EPOCHS,
        }
    }
}

impl EmissionConfig {
    pub fn new(
        season_days: f64,
        target_block_interval_secs: f64,
        total_emission: f64,
        halving_epochs: u32,
    ) -> Self {
        Self {
            season_days,
            target_block_interval_secs,
            total_emission,
            halving_epochs,
        }
    }

    /// Blocks in the whole season, `round(days * 86400 / interval)`
    pub fn total_blocks(&self) -> u64 {
        (self.season_days * SECONDS_PER_DAY / self.target_block_interval_secs).round() as u64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("season_days", self.season_days)?;
        positive("target_block_interval_secs", self.target_block_interval_secs)?;
        positive("total_emission", self.total_emission)?;

        if self.halving_epochs < 1 {
            return Err(ConfigError::invalid("halving_epochs", "must be at least 1"));
        }
        if self.halving_epochs > MAX_HALVING_EPOCHS {
            return Err(ConfigError::invalid(
                "halving_epochs",
                format!("must be at most {}", MAX_HALVING_EPOCHS),
            ));
        }

        let blocks = self.season_days * SECONDS_PER_DAY / self.target_block_interval_secs;
        if !blocks.is_finite() || blocks.round() > u64::MAX as f64 {
            return Err(ConfigError::invalid("season_days", "season has too many blocks"));
        }

        let total_blocks = self.total_blocks();
        if total_blocks < self.halving_epochs as u64 {
            return Err(ConfigError::invalid(
                "halving_epochs",
                format!(
                    "{} epochs do not fit into {} blocks",
                    self.halving_epochs, total_blocks
                ),
            ));
        }
        Ok(())
    }
}

/// Block production loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// Real-time tick period
    pub tick_interval_ms: u64,
    /// Blocks per difficulty retarget window
    pub difficulty_retarget_blocks: u64,
    /// Maximum multiplicative difficulty change per retarget
    pub max_difficulty_adjustment: f64,
    pub initial_difficulty: f64,
    /// Display buffer cap
    pub max_blocks_in_memory: usize,
    /// Cosmetic orphan flag probability
    pub orphan_probability: f64,
    /// Synthetic transactions carried in a block payload
    pub max_listed_transactions: usize,
    /// Upper bound of the synthetic fee total per block
    pub max_block_fees: f64,
    /// Displayed transaction count range, `[min, max)`
    pub min_logical_tx_count: u64,
    pub max_logical_tx_count: u64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            difficulty_retarget_blocks: DIFFICULTY_RETARGET_BLOCKS,
            max_difficulty_adjustment: MAX_DIFFICULTY_ADJUSTMENT,
            initial_difficulty: INITIAL_DIFFICULTY,
            max_blocks_in_memory: MAX_BLOCKS_IN_MEMORY,
            orphan_probability: 0.02,
            max_listed_transactions: 10,
            max_block_fees: 0.01,
            min_logical_tx_count: 100,
            max_logical_tx_count: 1_100,
        }
    }
}

impl ProductionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::invalid("tick_interval_ms", "must be positive"));
        }
        if self.difficulty_retarget_blocks == 0 {
            return Err(ConfigError::invalid(
                "difficulty_retarget_blocks",
                "must be positive",
            ));
        }
        if !(self.max_difficulty_adjustment >= 1.0) || !self.max_difficulty_adjustment.is_finite()
        {
            return Err(ConfigError::invalid(
                "max_difficulty_adjustment",
                "must be a finite factor >= 1",
            ));
        }
        positive("initial_difficulty", self.initial_difficulty)?;
        if self.max_blocks_in_memory == 0 {
            return Err(ConfigError::invalid("max_blocks_in_memory", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.orphan_probability) {
            return Err(ConfigError::invalid("orphan_probability", "must be within [0, 1]"));
        }
        if !(self.max_block_fees >= 0.0) || !self.max_block_fees.is_finite() {
            return Err(ConfigError::invalid("max_block_fees", "must be finite and >= 0"));
        }
        if self.max_logical_tx_count < self.min_logical_tx_count {
            return Err(ConfigError::invalid(
                "max_logical_tx_count",
                "must not be below min_logical_tx_count",
            ));
        }
        Ok(())
    }

    pub fn tick_secs(&self) -> f64 {
        self.tick_interval_ms as f64 / 1_000.0
    }
}

/// Ledger collaborator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Network weight floor
    pub min_network_weight: f64,
    /// Balance credited to a newly registered participant
    pub starting_balance: f64,
    /// Circulating supply before any burn
    pub initial_circulating: f64,
    /// Quality points lost per simulated hour
    pub quality_decay_per_hour: f64,
    /// Repair cost per restored quality point, as a fraction of purchase price
    pub repair_cost_rate: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_network_weight: MIN_NETWORK_WEIGHT,
            starting_balance: 15_000.0,
            initial_circulating: 1_000_000.0,
            quality_decay_per_hour: QUALITY_DECAY_PER_HOUR,
            repair_cost_rate: 0.005,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("min_network_weight", self.min_network_weight)?;
        non_negative("starting_balance", self.starting_balance)?;
        non_negative("initial_circulating", self.initial_circulating)?;
        non_negative("quality_decay_per_hour", self.quality_decay_per_hour)?;
        non_negative("repair_cost_rate", self.repair_cost_rate)
    }
}

/// Simulated clock parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Simulated milliseconds per real millisecond
    pub time_acceleration: f64,
    /// Simulated time at startup; `None` starts at the wall clock
    pub game_start_ms: Option<u64>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            time_acceleration: 1.0,
            game_start_ms: None,
        }
    }
}

impl ClockConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("time_acceleration", self.time_acceleration)
    }
}

/// Query surface parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3001,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be finite and positive, got {}", value)))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be finite and >= 0, got {}", value)))
    }
}
