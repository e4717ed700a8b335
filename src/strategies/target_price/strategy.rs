//! Target Price Strategy Implementation
//!
//! Each symbol carries a pre-planned ladder of daily price bands. A long
//! enters when price trades inside the day's buy band with the stop at the
//! band low; a short mirrors inside the sell band with the stop at the
//! band high. Stops ratchet with the shared risk-step rule. When the
//! ladder runs out of days the strategy goes quiet.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::strategies::{EntryLevels, Strategy, StrategyContext};
use crate::{Side, Signal};

use super::config::{DailyTargets, TargetPriceConfig};

/// Target Price Strategy
pub struct TargetPriceStrategy {
    config: TargetPriceConfig,
    /// Index into each symbol's ladder; bumped on day start. Atomic so the
    /// read path can stay `&self`.
    current_day: AtomicUsize,
    started: bool,
}

impl TargetPriceStrategy {
    pub fn new(config: TargetPriceConfig) -> Self {
        TargetPriceStrategy {
            config,
            current_day: AtomicUsize::new(0),
            started: false,
        }
    }

    fn targets_for(&self, symbol: &str) -> Option<&DailyTargets> {
        let day = self.current_day.load(Ordering::Relaxed);
        self.config.targets.get(symbol)?.get(day)
    }
}

impl Strategy for TargetPriceStrategy {
    fn name(&self) -> &'static str {
        "target_price"
    }

    fn on_day_start(&mut self) {
        // The first day stays at index zero.
        if self.started {
            self.current_day.fetch_add(1, Ordering::Relaxed);
        }
        self.started = true;
    }

    fn generate_signal(&self, ctx: &StrategyContext<'_>) -> Signal {
        if let Some(side) = ctx.invested_side {
            return match side {
                Side::Buy => Signal::Long,
                Side::Sell => Signal::Short,
            };
        }

        let targets = match self.targets_for(ctx.symbol.as_str()) {
            Some(t) => t,
            None => return Signal::Flat,
        };

        let price = ctx.price;
        if price >= targets.buy_low && price <= targets.buy_high {
            Signal::Long
        } else if price >= targets.sell_low && price <= targets.sell_high {
            Signal::Short
        } else {
            Signal::Flat
        }
    }

    fn entry_levels(&self, ctx: &StrategyContext<'_>, side: Side) -> Option<EntryLevels> {
        let targets = self.targets_for(ctx.symbol.as_str())?;

        let stop_price = match side {
            Side::Buy => targets.buy_low,
            Side::Sell => targets.sell_high,
        };

        Some(EntryLevels {
            entry_price: ctx.price,
            stop_price,
            win_price: None,
        })
    }

    fn stop_limit_slack(&self) -> f64 {
        self.config.stop_limit_slack
    }
}
