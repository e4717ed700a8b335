//! Opening range breakout strategy
//!
//! Breakout of the session's first consolidated candle.

mod config;
mod strategy;

pub use config::OpeningRangeConfig;
pub use strategy::OpeningRangeStrategy;

use crate::{Config, strategies::Strategy};
use anyhow::Result;

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn Strategy>> {
    let strategy_config: OpeningRangeConfig = serde_json::from_value(config.strategy.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse opening_range config: {}", e))?;
    Ok(Box::new(OpeningRangeStrategy::new(strategy_config)))
}
