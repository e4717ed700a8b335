//! VWAP breakout strategy
//!
//! Intraday breakouts around the session VWAP, long and short.

mod config;
mod strategy;

pub use config::VwapBreakoutConfig;
pub use strategy::VwapBreakoutStrategy;

use crate::{Config, strategies::Strategy};
use anyhow::Result;

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn Strategy>> {
    let strategy_config: VwapBreakoutConfig = serde_json::from_value(config.strategy.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse vwap_breakout config: {}", e))?;
    Ok(Box::new(VwapBreakoutStrategy::new(strategy_config)))
}
