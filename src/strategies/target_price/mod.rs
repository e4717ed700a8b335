//! Target price strategy
//!
//! Trades a pre-planned ladder of daily entry bands per symbol.

mod config;
mod strategy;

pub use config::{DailyTargets, TargetPriceConfig};
pub use strategy::TargetPriceStrategy;

use crate::{Config, strategies::Strategy};
use anyhow::Result;

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn Strategy>> {
    let strategy_config: TargetPriceConfig = serde_json::from_value(config.strategy.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse target_price config: {}", e))?;
    Ok(Box::new(TargetPriceStrategy::new(strategy_config)))
}
