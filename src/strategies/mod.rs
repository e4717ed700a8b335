//! Trading strategies
//!
//! Strategies implement a single trait the session algorithm drives on
//! every tick. New strategies register a factory under a name; configs
//! select them by that name.

pub mod gap_reversal;
pub mod ma_crossover;
pub mod momentum_universe;
pub mod opening_range;
pub mod target_price;
pub mod vwap_breakout;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::broker::{Broker, BrokerError, OrderEvent, OrderId};
use crate::equity::TradeState;
use crate::session::SessionClock;
use crate::{Config, Side, Signal, Symbol};

// =============================================================================
// Strategy Trait
// =============================================================================

/// Everything a strategy may look at on one tick
#[derive(Debug)]
pub struct StrategyContext<'a> {
    pub symbol: &'a Symbol,
    pub state: &'a TradeState,
    /// Latest trade price for the symbol
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub session: &'a SessionClock,
    /// Side of the open position, if any
    pub invested_side: Option<Side>,
}

/// Price anchors for a new entry
#[derive(Debug, Clone, Copy)]
pub struct EntryLevels {
    pub entry_price: f64,
    pub stop_price: f64,
    /// Optional profit-taking level the algorithm liquidates at
    pub win_price: Option<f64>,
}

impl EntryLevels {
    /// The ratchet increment for this entry
    pub fn risk_step(&self) -> f64 {
        (self.entry_price - self.stop_price).abs()
    }
}

/// A ratcheted stop produced by `update_stop`
#[derive(Debug, Clone, Copy)]
pub struct StopAdjustment {
    /// New reference entry price after advancing one risk step
    pub entry_anchor: f64,
    pub stop_price: f64,
    pub limit_price: f64,
}

/// Trading strategy trait - the contract the session algorithm drives.
///
/// `generate_signal` runs on every eligible tick. While flat, Long/Short
/// starts an entry; while invested, the opposite direction flips the
/// position and Flat exits it. The remaining methods shape how the entry
/// is priced, placed, and protected.
pub trait Strategy: Send + Sync {
    /// Strategy identifier (must match config's strategy_name)
    fn name(&self) -> &'static str;

    /// Direction decision for the current tick
    fn generate_signal(&self, ctx: &StrategyContext<'_>) -> Signal;

    /// Entry and stop prices for a new position. None skips the trade;
    /// the algorithm also skips when the resulting risk step is zero.
    fn entry_levels(&self, ctx: &StrategyContext<'_>, side: Side) -> Option<EntryLevels>;

    /// Submit the entry order. Default: market order.
    fn place_entry(
        &self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
        _levels: &EntryLevels,
    ) -> Result<OrderId, BrokerError> {
        broker.market_order(symbol, side, quantity)
    }

    /// Whether a protective stop-limit order rests at the stop level
    fn uses_protective_stop(&self) -> bool {
        true
    }

    /// Whether a still-resting entry order should be cancelled on this
    /// tick (e.g. an entry window elapsed)
    fn entry_expired(&self, _ctx: &StrategyContext<'_>) -> bool {
        false
    }

    /// Distance between the stop and its limit price on stop-limit orders
    fn stop_limit_slack(&self) -> f64 {
        0.05
    }

    /// Ratchet an open position's stop once price has moved one full risk
    /// step in its favor: the stop advances to the old anchor plus half a
    /// step and the anchor moves one step (mirrored for shorts).
    fn update_stop(&self, ctx: &StrategyContext<'_>) -> Option<StopAdjustment> {
        let entry = ctx.state.last_entry_price?;
        let step = ctx.state.risk_step?;
        if step <= 0.0 {
            return None;
        }
        let slack = self.stop_limit_slack();

        match ctx.invested_side? {
            Side::Buy if ctx.price - entry > step => {
                let stop = entry + step / 2.0;
                Some(StopAdjustment {
                    entry_anchor: entry + step,
                    stop_price: stop,
                    limit_price: stop - slack,
                })
            }
            Side::Sell if entry - ctx.price > step => {
                let stop = entry - step / 2.0;
                Some(StopAdjustment {
                    entry_anchor: entry - step,
                    stop_price: stop,
                    limit_price: stop + slack,
                })
            }
            _ => None,
        }
    }

    /// Called once at the start of each trading day
    fn on_day_start(&mut self) {}

    /// Notification when an order changes state
    fn notify_order(&mut self, _event: &OrderEvent) {}

    /// Initialize strategy (called once before trading starts)
    fn init(&mut self) {}
}

// =============================================================================
// Strategy Registry
// =============================================================================

/// Factory function type for creating strategies from config
pub type StrategyFactory = fn(&Config) -> Result<Box<dyn Strategy>>;

static REGISTRY: OnceLock<RwLock<HashMap<&'static str, StrategyFactory>>> = OnceLock::new();

fn get_registry() -> &'static RwLock<HashMap<&'static str, StrategyFactory>> {
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("vwap_breakout", vwap_breakout::create as StrategyFactory);
        map.insert("opening_range", opening_range::create as StrategyFactory);
        map.insert("gap_reversal", gap_reversal::create as StrategyFactory);
        map.insert("ma_crossover", ma_crossover::create as StrategyFactory);
        map.insert("target_price", target_price::create as StrategyFactory);
        RwLock::new(map)
    })
}

/// Create a strategy from configuration
pub fn create_strategy(config: &Config) -> Result<Box<dyn Strategy>> {
    let registry = get_registry().read().unwrap();

    let factory = registry.get(config.strategy_name.as_str()).ok_or_else(|| {
        let mut available: Vec<_> = registry.keys().copied().collect();
        available.sort_unstable();
        anyhow::anyhow!(
            "Unknown strategy: '{}'. Available: {}",
            config.strategy_name,
            available.join(", ")
        )
    })?;

    factory(config)
}

/// Get list of available strategy names
pub fn available_strategies() -> Vec<&'static str> {
    let mut names: Vec<_> = get_registry().read().unwrap().keys().copied().collect();
    names.sort_unstable();
    names
}

/// Register a new strategy (for plugins or testing)
pub fn register_strategy(name: &'static str, factory: StrategyFactory) {
    get_registry().write().unwrap().insert(name, factory);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_knows_builtin_strategies() {
        let names = available_strategies();
        for expected in [
            "gap_reversal",
            "ma_crossover",
            "opening_range",
            "target_price",
            "vwap_breakout",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_unknown_strategy_is_an_error() {
        let config = Config {
            strategy_name: "does_not_exist".to_string(),
            ..Config::default()
        };
        let err = create_strategy(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown strategy"));
    }

    #[test]
    fn test_create_default_strategy() {
        let config = Config::default();
        let strategy = create_strategy(&config).unwrap();
        assert_eq!(strategy.name(), "vwap_breakout");
    }
}
