//! Chain state management
//!
//! Tracks height, tip, difficulty, the block-time moving average and a bounded
//! buffer of recent blocks. The buffer is display data only; nothing in
//! emission accounting reads it.

use std::collections::VecDeque;
use serde::{Deserialize, Serialize};
use crate::consensus::Block;
use crate::constants::BLOCK_TIME_EMA_ALPHA;
use crate::crypto::Hash;

/// Largest page served by `recent_blocks`
pub const MAX_PAGE_SIZE: usize = 100;

/// Complete chain state
#[derive(Debug, Clone)]
pub struct ChainState {
    /// Current block height (0 before the first block)
    pub height: u64,
    /// Hash of the current tip
    pub tip_hash: Hash,
    /// Current difficulty
    pub difficulty: f64,
    /// Exponential moving average of observed block intervals (seconds)
    pub avg_block_time: f64,
    /// Timestamp of the last block, or of season start
    last_block_time: u64,
    /// Timestamp at which the current retarget window opened
    retarget_anchor: u64,
    /// Recent blocks, oldest first
    blocks: VecDeque<Block>,
    max_blocks: usize,
}

/// A newest-first page of buffered blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPage {
    pub blocks: Vec<Block>,
    /// Pass back as `cursor` to fetch the next older page
    pub next_cursor: Option<u64>,
    pub has_more: bool,
}

impl ChainState {
    /// Create an empty chain at season start
    pub fn new(
        initial_difficulty: f64,
        target_interval_secs: f64,
        max_blocks: usize,
        started_at: u64,
    ) -> Self {
        Self {
            height: 0,
            tip_hash: Hash::zero(),
            difficulty: initial_difficulty,
            avg_block_time: target_interval_secs,
            last_block_time: started_at,
            retarget_anchor: started_at,
            blocks: VecDeque::with_capacity(max_blocks.min(1024)),
            max_blocks: max_blocks.max(1),
        }
    }

    /// Append a block on top of the tip.
    ///
    /// Returns the observed interval since the previous block in seconds.
    pub fn apply_block(&mut self, block: Block) -> f64 {
        debug_assert_eq!(block.height, self.height + 1);

        let observed = block.timestamp.saturating_sub(self.last_block_time) as f64 / 1_000.0;

        self.height = block.height;
        self.tip_hash = block.hash;
        self.last_block_time = block.timestamp;

        self.blocks.push_back(block);
        while self.blocks.len() > self.max_blocks {
            self.blocks.pop_front();
        }

        observed
    }

    /// Fold an observed interval into the moving average
    pub fn record_block_time(&mut self, observed_secs: f64) {
        self.avg_block_time = (1.0 - BLOCK_TIME_EMA_ALPHA) * self.avg_block_time
            + BLOCK_TIME_EMA_ALPHA * observed_secs;
    }

    pub fn last_block_time(&self) -> u64 {
        self.last_block_time
    }

    pub fn retarget_window_start(&self) -> u64 {
        self.retarget_anchor
    }

    /// Install a retargeted difficulty and open the next window
    pub fn retarget(&mut self, difficulty: f64, window_start: u64) {
        self.difficulty = difficulty;
        self.retarget_anchor = window_start;
    }

    /// Get a buffered block by height
    pub fn block_at(&self, height: u64) -> Option<&Block> {
        let oldest = self.blocks.front()?.height;
        let index = height.checked_sub(oldest)?;
        self.blocks.get(usize::try_from(index).ok()?)
    }

    /// Buffered blocks strictly below `cursor` (or from the tip), newest first
    pub fn recent_blocks(&self, cursor: Option<u64>, limit: usize) -> BlockPage {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let blocks: Vec<Block> = self
            .blocks
            .iter()
            .rev()
            .filter(|block| cursor.map_or(true, |c| block.height < c))
            .take(limit)
            .cloned()
            .collect();

        let oldest_buffered = self.blocks.front().map(|b| b.height);
        let has_more = match (blocks.last(), oldest_buffered) {
            (Some(last), Some(oldest)) => last.height > oldest,
            _ => false,
        };
        let next_cursor = if has_more {
            blocks.last().map(|b| b.height)
        } else {
            None
        };

        BlockPage {
            blocks,
            next_cursor,
            has_more,
        }
    }

    /// Number of blocks in the display buffer
    pub fn buffered_len(&self) -> usize {
        self.blocks.len()
    }

    /// Get statistics about the chain state
    pub fn get_stats(&self) -> ChainStats {
        ChainStats {
            height: self.height,
            tip_hash: self.tip_hash,
            difficulty: self.difficulty,
            avg_block_time: self.avg_block_time,
            buffered_blocks: self.blocks.len(),
        }
    }
}

/// Statistics about the chain state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStats {
    pub height: u64,
    pub tip_hash: Hash,
    pub difficulty: f64,
    pub avg_block_time: f64,
    pub buffered_blocks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::BlockTemplate;

    fn make_block(state: &ChainState, timestamp: u64) -> Block {
        Block::assemble(BlockTemplate {
            height: state.height + 1,
            timestamp,
            previous_hash: state.tip_hash,
            difficulty: state.difficulty,
            subsidy: 1.0,
            total_fees: 0.0,
            tx_count: 100,
            is_orphan: false,
            transactions: vec![],
            salt: state.height,
        })
    }

    fn chain_with(count: u64, max_blocks: usize) -> ChainState {
        let mut state = ChainState::new(1_000.0, 10.0, max_blocks, 0);
        for i in 1..=count {
            let block = make_block(&state, i * 10_000);
            state.apply_block(block);
        }
        state
    }

    #[test]
    fn test_empty_chain() {
        let state = ChainState::new(1_000.0, 10.0, 5, 42);
        assert_eq!(state.height, 0);
        assert_eq!(state.tip_hash, Hash::zero());
        assert_eq!(state.avg_block_time, 10.0);
        assert!(state.block_at(0).is_none());
        assert!(state.recent_blocks(None, 10).blocks.is_empty());
    }

    #[test]
    fn test_apply_block() {
        let mut state = ChainState::new(1_000.0, 10.0, 5, 0);
        let block = make_block(&state, 12_000);
        let hash = block.hash;
        let observed = state.apply_block(block);

        assert_eq!(observed, 12.0);
        assert_eq!(state.height, 1);
        assert_eq!(state.tip_hash, hash);
        assert_eq!(state.last_block_time(), 12_000);

        let next = make_block(&state, 20_000);
        assert_eq!(next.previous_hash, hash);
    }

    #[test]
    fn test_buffer_drops_oldest() {
        let state = chain_with(8, 5);
        assert_eq!(state.buffered_len(), 5);
        assert!(state.block_at(3).is_none());
        assert_eq!(state.block_at(4).map(|b| b.height), Some(4));
        assert_eq!(state.block_at(8).map(|b| b.height), Some(8));
        assert!(state.block_at(9).is_none());
        assert_eq!(state.height, 8);
    }

    #[test]
    fn test_moving_average() {
        let mut state = ChainState::new(1_000.0, 10.0, 5, 0);
        state.record_block_time(20.0);
        assert!((state.avg_block_time - 11.0).abs() < 1e-12);
        state.record_block_time(11.0);
        assert!((state.avg_block_time - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_recent_blocks_paging() {
        let state = chain_with(10, 8);

        let first = state.recent_blocks(None, 3);
        let heights: Vec<u64> = first.blocks.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![10, 9, 8]);
        assert!(first.has_more);
        assert_eq!(first.next_cursor, Some(8));

        let second = state.recent_blocks(first.next_cursor, 3);
        let heights: Vec<u64> = second.blocks.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![7, 6, 5]);

        let last = state.recent_blocks(Some(5), 10);
        let heights: Vec<u64> = last.blocks.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![4, 3]);
        assert!(!last.has_more);
        assert_eq!(last.next_cursor, None);
    }

    #[test]
    fn test_page_limit_clamped() {
        let state = chain_with(3, 10);
        assert_eq!(state.recent_blocks(None, 0).blocks.len(), 1);
        assert_eq!(state.recent_blocks(None, 1_000).blocks.len(), 3);
    }

    #[test]
    fn test_retarget_moves_anchor() {
        let mut state = ChainState::new(1_000.0, 10.0, 5, 0);
        assert_eq!(state.retarget_window_start(), 0);
        state.retarget(2_000.0, 50_000);
        assert_eq!(state.difficulty, 2_000.0);
        assert_eq!(state.retarget_window_start(), 50_000);
    }
}
