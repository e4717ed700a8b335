//! Moving-average crossover strategy
//!
//! Daily SMA trend filter combined with 52-week range proximity.

mod config;
mod strategy;

pub use config::MaCrossoverConfig;
pub use strategy::MaCrossoverStrategy;

use crate::{Config, strategies::Strategy};
use anyhow::Result;

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn Strategy>> {
    let strategy_config: MaCrossoverConfig = serde_json::from_value(config.strategy.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse ma_crossover config: {}", e))?;
    Ok(Box::new(MaCrossoverStrategy::new(strategy_config)))
}
