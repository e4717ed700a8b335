//! Momentum Universe Configuration

use serde::{Deserialize, Serialize};

/// Momentum Universe Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumUniverseConfig {
    /// Minimum share price for the coarse filter
    pub min_price: f64,
    /// Symbols kept by the coarse (dollar volume) filter
    pub coarse_size: usize,
    /// Symbols kept by the fine (market cap) filter
    pub fine_size: usize,
    /// Days between rebalances
    pub rebalance_days: i64,
}

impl Default for MomentumUniverseConfig {
    fn default() -> Self {
        MomentumUniverseConfig {
            min_price: 10.0,
            coarse_size: 200,
            fine_size: 10,
            rebalance_days: 30,
        }
    }
}
