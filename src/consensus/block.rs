//! Block structure for the season chain
//!
//! Blocks are immutable records of one production step. They are display
//! data: emission accounting lives in the schedule, not in the block buffer.

use serde::{Deserialize, Serialize};
use crate::crypto::{Hash, hash_fields};

/// Synthetic transaction carried for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Hash,
    pub amount: f64,
    pub fee: f64,
    /// Short pseudo-address of the sender
    pub from: String,
    /// Short pseudo-address of the recipient
    pub to: String,
}

/// A produced block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    /// Milliseconds since Unix epoch (simulated clock)
    pub timestamp: u64,
    pub hash: Hash,
    pub previous_hash: Hash,
    /// Difficulty in force when the block was produced
    pub difficulty: f64,
    /// Hex-encoded 256-bit work target for `difficulty`
    pub work_target: String,
    /// Newly emitted coins (already clipped to the season budget)
    pub subsidy: f64,
    pub total_fees: f64,
    /// `subsidy + total_fees`
    pub reward: f64,
    /// Logical transaction count shown to users
    pub tx_count: u64,
    /// Cosmetic flag; orphaned blocks still count towards emission
    pub is_orphan: bool,
    /// Bounded sample of transactions
    pub transactions: Vec<Transaction>,
}

/// Inputs for assembling a block
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub height: u64,
    pub timestamp: u64,
    pub previous_hash: Hash,
    pub difficulty: f64,
    pub subsidy: f64,
    pub total_fees: f64,
    pub tx_count: u64,
    pub is_orphan: bool,
    pub transactions: Vec<Transaction>,
    /// Random salt mixed into the block hash
    pub salt: u64,
}

impl Block {
    /// Assemble a block from a template
    pub fn assemble(template: BlockTemplate) -> Self {
        let hash = block_hash(
            template.height,
            template.timestamp,
            &template.previous_hash,
            template.salt,
        );

        Self {
            height: template.height,
            timestamp: template.timestamp,
            hash,
            previous_hash: template.previous_hash,
            difficulty: template.difficulty,
            work_target: super::work_target(template.difficulty).to_hex(),
            subsidy: template.subsidy,
            total_fees: template.total_fees,
            reward: template.subsidy + template.total_fees,
            tx_count: template.tx_count,
            is_orphan: template.is_orphan,
            transactions: template.transactions,
        }
    }

    /// Check if this block starts the chain
    pub fn is_first(&self) -> bool {
        self.previous_hash == Hash::zero()
    }
}

/// Hash of a block's identifying fields
pub fn block_hash(height: u64, timestamp: u64, previous_hash: &Hash, salt: u64) -> Hash {
    hash_fields(&[
        b"block",
        &height.to_le_bytes(),
        &timestamp.to_le_bytes(),
        previous_hash.as_bytes(),
        &salt.to_le_bytes(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(height: u64, salt: u64) -> BlockTemplate {
        BlockTemplate {
            height,
            timestamp: 1_700_000_000_000,
            previous_hash: Hash::zero(),
            difficulty: 1_000_000.0,
            subsidy: 7_407.5,
            total_fees: 0.25,
            tx_count: 512,
            is_orphan: false,
            transactions: vec![],
            salt,
        }
    }

    #[test]
    fn test_reward_is_subsidy_plus_fees() {
        let block = Block::assemble(template(1, 7));
        assert_eq!(block.reward, 7_407.75);
        assert_eq!(block.subsidy, 7_407.5);
        assert_eq!(block.total_fees, 0.25);
    }

    #[test]
    fn test_first_block_detection() {
        let block = Block::assemble(template(1, 7));
        assert!(block.is_first());
    }

    #[test]
    fn test_hash_depends_on_salt_and_height() {
        let a = Block::assemble(template(1, 7));
        let b = Block::assemble(template(1, 8));
        let c = Block::assemble(template(2, 7));
        assert_ne!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
        assert_eq!(a.hash, Block::assemble(template(1, 7)).hash);
    }

    #[test]
    fn test_block_json_shape() {
        let block = Block::assemble(template(3, 1));
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["height"], 3);
        assert!(value["hash"].as_str().unwrap().len() == 64);
        assert_eq!(value["is_orphan"], false);
    }
}
