//! Season Mining Simulator Core Library
//!
//! A Bitcoin-style block-reward economy compressed into a short, fixed-length
//! season: a fixed total emission split across halving epochs, a probabilistic
//! block production loop, and proportional reward distribution.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod events;
pub mod ledger;
pub mod mining;
pub mod node;
pub mod rpc;
pub mod storage;

/// Default season parameters
pub mod constants {
    /// Seconds in one day
    pub const SECONDS_PER_DAY: f64 = 86_400.0;

    /// Default season length in days
    pub const SEASON_DAYS: f64 = 7.0;

    /// Default nominal seconds between blocks
    pub const TARGET_BLOCK_INTERVAL_SECS: f64 = 10.0;

    /// Default subsidy budget for the whole season
    pub const TOTAL_EMISSION: f64 = 210_000_000.0;

    /// Default number of halving periods
    pub const HALVING_EPOCHS: u32 = 4;

    /// Upper bound on halving periods (rewards underflow long before this)
    pub const MAX_HALVING_EPOCHS: u32 = 64;

    /// Difficulty retarget window (blocks)
    pub const DIFFICULTY_RETARGET_BLOCKS: u64 = 2016;

    /// Maximum multiplicative difficulty change per retarget
    pub const MAX_DIFFICULTY_ADJUSTMENT: f64 = 4.0;

    /// Difficulty at season start
    pub const INITIAL_DIFFICULTY: f64 = 1_000_000.0;

    /// Blocks kept in the display buffer
    pub const MAX_BLOCKS_IN_MEMORY: usize = 500;

    /// Weight of the newest sample in the block-time moving average
    pub const BLOCK_TIME_EMA_ALPHA: f64 = 0.1;

    /// Network weight floor (TH/s) so distribution never divides by zero
    pub const MIN_NETWORK_WEIGHT: f64 = 100.0;

    /// Equipment quality bounds
    pub const MAX_QUALITY: f64 = 100.0;

    /// Quality points lost per simulated hour without maintenance
    pub const QUALITY_DECAY_PER_HOUR: f64 = 0.5;

    /// Milliseconds in one hour
    pub const MS_PER_HOUR: f64 = 3_600_000.0;

    /// Chain name
    pub const CHAIN_NAME: &str = "SEASON";
}
