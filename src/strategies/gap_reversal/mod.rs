//! Gap reversal strategy
//!
//! Fades the overnight gap on the first bar after the open.

mod config;
mod strategy;

pub use config::GapReversalConfig;
pub use strategy::GapReversalStrategy;

use crate::{Config, strategies::Strategy};
use anyhow::Result;

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn Strategy>> {
    let strategy_config: GapReversalConfig = serde_json::from_value(config.strategy.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse gap_reversal config: {}", e))?;
    Ok(Box::new(GapReversalStrategy::new(strategy_config)))
}
