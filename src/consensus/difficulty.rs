//! Difficulty retargeting
//!
//! Every retarget window the difficulty is scaled by how much faster or slower
//! the window ran than expected, limited to a maximum factor either way.
//! Difficulty here is a display statistic; block arrival is driven by the
//! production trial, not by hashing.

use crate::crypto::Hash;

/// Easiest work target (difficulty 1)
const MAX_TARGET: [u8; 32] = {
    let mut target = [0u8; 32];
    target[4] = 0xFF;
    target[5] = 0xFF;
    target
};

/// Calculate the difficulty for the next window
///
/// # Arguments
/// * `current_difficulty` - Difficulty in force during the window
/// * `window_start_ms` - Timestamp at which the window opened
/// * `window_end_ms` - Timestamp of the block closing the window
/// * `target_interval_secs` - Nominal seconds per block
/// * `window_blocks` - Blocks in the window
/// * `max_adjustment` - Maximum factor of change in either direction
///
/// # Returns
/// `current * clamp(expected / actual, 1/max, max)`
pub fn calculate_next_difficulty(
    current_difficulty: f64,
    window_start_ms: u64,
    window_end_ms: u64,
    target_interval_secs: f64,
    window_blocks: u64,
    max_adjustment: f64,
) -> f64 {
    let actual_secs = window_end_ms.saturating_sub(window_start_ms) as f64 / 1_000.0;
    let expected_secs = target_interval_secs * window_blocks as f64;

    // An instantaneous window is as fast as the clamp allows
    let ratio = if actual_secs > 0.0 {
        expected_secs / actual_secs
    } else {
        max_adjustment
    };

    current_difficulty * ratio.clamp(1.0 / max_adjustment, max_adjustment)
}

/// Check if difficulty should be adjusted at this height
pub fn should_adjust_difficulty(height: u64, window_blocks: u64) -> bool {
    window_blocks > 0 && height > 0 && height % window_blocks == 0
}

/// Blocks left until the next retarget
pub fn blocks_until_retarget(height: u64, window_blocks: u64) -> u64 {
    if window_blocks == 0 {
        return 0;
    }
    window_blocks - (height % window_blocks)
}

/// Work target for a difficulty: `MAX_TARGET / floor(difficulty)`
pub fn work_target(difficulty: f64) -> Hash {
    let divisor = if difficulty.is_finite() && difficulty >= 1.0 {
        difficulty.floor() as u64
    } else {
        1
    };
    Hash::from_bytes(divide_target(&MAX_TARGET, divisor))
}

/// Divide a big-endian 256-bit target by a small integer
fn divide_target(target: &[u8; 32], divisor: u64) -> [u8; 32] {
    let divisor = divisor.max(1) as u128;
    let mut result = [0u8; 32];
    let mut remainder: u128 = 0;

    for (i, &byte) in target.iter().enumerate() {
        let value = (remainder << 8) | byte as u128;
        result[i] = (value / divisor) as u8;
        remainder = value % divisor;
    }

    result
}
