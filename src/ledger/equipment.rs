//! Mining rigs
//!
//! A rig contributes `hashrate * uptime * quality / 100` to its owner's
//! weight. Quality decays linearly with simulated time since the last
//! service and only comes back through an explicit repair.

use serde::{Deserialize, Serialize};
use crate::constants::{MAX_QUALITY, MS_PER_HOUR};

/// Rig price class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RigCategory {
    Basic,
    Advanced,
    Professional,
    Legendary,
}

impl RigCategory {
    /// Price in block rewards; prices track the current subsidy so the
    /// payback period stays roughly constant across halvings
    pub fn price_units(self) -> f64 {
        match self {
            RigCategory::Basic => 1_200.0,
            RigCategory::Advanced => 7_000.0,
            RigCategory::Professional => 15_000.0,
            RigCategory::Legendary => 30_000.0,
        }
    }
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigTier {
    pub id: String,
    pub name: String,
    /// Nominal rate (TH/s)
    pub hashrate: f64,
    /// Fraction of time the rig is running
    pub uptime: f64,
    pub category: RigCategory,
    pub description: String,
}

impl RigTier {
    fn new(
        id: &str,
        name: &str,
        hashrate: f64,
        uptime: f64,
        category: RigCategory,
        description: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            hashrate,
            uptime,
            category,
            description: description.to_string(),
        }
    }

    /// Current price, `round(category units * current reward)`
    pub fn price(&self, current_reward: f64) -> f64 {
        (self.category.price_units() * current_reward).round()
    }
}

/// Catalog entry with its current price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedTier {
    #[serde(flatten)]
    pub tier: RigTier,
    pub price: f64,
}

/// The rig catalog
pub fn rig_catalog() -> Vec<RigTier> {
    vec![
        RigTier::new(
            "antminer-s9",
            "Antminer S9",
            13.5,
            0.95,
            RigCategory::Basic,
            "Entry-level mining rig from 2016.",
        ),
        RigTier::new(
            "antminer-s19-pro",
            "Antminer S19 Pro",
            110.0,
            0.97,
            RigCategory::Advanced,
            "High-performance mining rig.",
        ),
        RigTier::new(
            "whatsminer-m30s",
            "WhatsMiner M30S++",
            112.0,
            0.94,
            RigCategory::Professional,
            "Professional-grade mining rig.",
        ),
        RigTier::new(
            "golden-dragon",
            "Golden Dragon Miner",
            250.0,
            0.99,
            RigCategory::Legendary,
            "Legendary mining rig with premium components.",
        ),
    ]
}

/// Look up a catalog entry by id
pub fn find_tier(tier_id: &str) -> Option<RigTier> {
    rig_catalog().into_iter().find(|tier| tier.id == tier_id)
}

/// An owned rig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rig {
    pub id: String,
    pub tier_id: String,
    pub name: String,
    pub hashrate: f64,
    pub uptime: f64,
    /// Price paid, the basis of repair costs
    pub purchase_price: f64,
    pub purchased_at: u64,
    /// Quality right after the last service
    pub quality_at_service: f64,
    /// Timestamp of the last service (or purchase)
    pub serviced_at: u64,
    pub active: bool,
}

impl Rig {
    pub fn new(id: String, tier: &RigTier, purchase_price: f64, now: u64) -> Self {
        Self {
            id,
            tier_id: tier.id.clone(),
            name: tier.name.clone(),
            hashrate: tier.hashrate,
            uptime: tier.uptime,
            purchase_price,
            purchased_at: now,
            quality_at_service: MAX_QUALITY,
            serviced_at: now,
            active: true,
        }
    }

    /// Quality at `now`, decayed linearly and floored at 0
    pub fn quality_at(&self, now: u64, decay_per_hour: f64) -> f64 {
        let hours = now.saturating_sub(self.serviced_at) as f64 / MS_PER_HOUR;
        (self.quality_at_service - decay_per_hour * hours).clamp(0.0, MAX_QUALITY)
    }

    /// Contribution to the owner's weight
    pub fn effective_rate(&self, now: u64, decay_per_hour: f64) -> f64 {
        if !self.active {
            return 0.0;
        }
        let quality = self.quality_at(now, decay_per_hour);
        if quality <= 0.0 {
            return 0.0;
        }
        self.hashrate * self.uptime * quality / MAX_QUALITY
    }

    /// Cost to restore full quality: restored points × purchase price × rate,
    /// rounded up
    pub fn repair_cost(&self, now: u64, decay_per_hour: f64, cost_rate: f64) -> f64 {
        let restored = MAX_QUALITY - self.quality_at(now, decay_per_hour);
        (restored * self.purchase_price * cost_rate).ceil()
    }

    /// Reset quality to full and restart the decay clock
    pub fn service(&mut self, now: u64) {
        self.quality_at_service = MAX_QUALITY;
        self.serviced_at = now;
    }
}
