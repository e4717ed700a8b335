//! Opening Range Strategy Implementation
//!
//! ## Entry Logic
//! 1. Capture the first consolidated candle of the session
//! 2. Within the entry window, price clearing the first candle's high
//!    triggers a limit buy a tick above the breakout
//!
//! ## Exit Logic
//! 1. Protective stop-limit at the window low
//! 2. Profit target at entry + win multiple × risk step
//! 3. Unfilled entry orders are cancelled once the window closes

use crate::broker::{Broker, BrokerError, OrderId};
use crate::strategies::{EntryLevels, Strategy, StrategyContext};
use crate::{Side, Signal, Symbol};

use super::config::OpeningRangeConfig;

/// Opening Range Strategy
pub struct OpeningRangeStrategy {
    config: OpeningRangeConfig,
}

impl OpeningRangeStrategy {
    pub fn new(config: OpeningRangeConfig) -> Self {
        OpeningRangeStrategy { config }
    }

    fn in_entry_window(&self, ctx: &StrategyContext<'_>) -> bool {
        ctx.session
            .minutes_since_open(ctx.timestamp)
            .is_some_and(|m| m <= self.config.entry_window_minutes)
    }
}

impl Strategy for OpeningRangeStrategy {
    fn name(&self) -> &'static str {
        "opening_range"
    }

    fn generate_signal(&self, ctx: &StrategyContext<'_>) -> Signal {
        if let Some(side) = ctx.invested_side {
            // Exits are the stop and the profit target.
            return match side {
                Side::Buy => Signal::Long,
                Side::Sell => Signal::Short,
            };
        }

        if !self.in_entry_window(ctx) {
            return Signal::Flat;
        }

        let first = match &ctx.state.first_candle {
            Some(c) => c,
            None => return Signal::Flat,
        };

        if ctx.price > first.high {
            Signal::Long
        } else {
            Signal::Flat
        }
    }

    fn entry_levels(&self, ctx: &StrategyContext<'_>, side: Side) -> Option<EntryLevels> {
        if side != Side::Buy {
            return None;
        }
        let minute = ctx.state.minute_window.get(0)?;
        let low_candle = ctx.state.low_window.get(0)?;

        let entry_price = ctx.price;
        let stop_price = low_candle.low.min(minute.low);
        let step = entry_price - stop_price;
        if step <= 0.0 {
            return None;
        }

        Some(EntryLevels {
            entry_price,
            stop_price,
            win_price: Some(entry_price + self.config.win_multiple * step),
        })
    }

    fn place_entry(
        &self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
        levels: &EntryLevels,
    ) -> Result<OrderId, BrokerError> {
        broker.limit_order(
            symbol,
            side,
            quantity,
            levels.entry_price + self.config.limit_offset,
        )
    }

    fn entry_expired(&self, ctx: &StrategyContext<'_>) -> bool {
        !self.in_entry_window(ctx)
    }

    fn stop_limit_slack(&self) -> f64 {
        self.config.stop_limit_slack
    }

    /// The opening-range trade rides to its fixed levels; no ratchet.
    fn update_stop(&self, _ctx: &StrategyContext<'_>) -> Option<crate::strategies::StopAdjustment> {
        None
    }
}
