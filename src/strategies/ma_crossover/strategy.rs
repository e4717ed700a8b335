//! MA Crossover Strategy Implementation
//!
//! ## Entry Logic
//! 1. Long when price is within the proximity band of the trailing high
//!    and above the daily SMA (uptrend near new highs)
//! 2. Short when price is within the band of the trailing low and below
//!    the SMA (downtrend near new lows)
//! 3. Anything else flattens the position

use crate::indicators::sma;
use crate::strategies::{EntryLevels, Strategy, StrategyContext};
use crate::{Side, Signal};

use super::config::MaCrossoverConfig;

/// MA Crossover Strategy
pub struct MaCrossoverStrategy {
    config: MaCrossoverConfig,
}

impl MaCrossoverStrategy {
    pub fn new(config: MaCrossoverConfig) -> Self {
        MaCrossoverStrategy { config }
    }

    /// Daily SMA and trailing high/low from the symbol's daily window
    fn daily_view(&self, ctx: &StrategyContext<'_>) -> Option<(f64, f64, f64)> {
        let window = &ctx.state.daily_window;
        if window.len() < self.config.sma_period {
            return None;
        }

        // The window iterates newest first; indicators expect oldest first.
        let mut closes: Vec<f64> = window.iter().map(|c| c.close).collect();
        closes.reverse();
        let sma_value = sma(&closes, self.config.sma_period).last().copied()??;

        let lookback = window.len().min(self.config.lookback_days);
        let mut high = f64::MIN;
        let mut low = f64::MAX;
        for candle in window.iter().take(lookback) {
            high = high.max(candle.high);
            low = low.min(candle.low);
        }

        Some((sma_value, high, low))
    }
}

impl Strategy for MaCrossoverStrategy {
    fn name(&self) -> &'static str {
        "ma_crossover"
    }

    fn generate_signal(&self, ctx: &StrategyContext<'_>) -> Signal {
        let (sma_value, high, low) = match self.daily_view(ctx) {
            Some(v) => v,
            None => return Signal::Flat,
        };

        let proximity = self.config.proximity_percent / 100.0;
        let price = ctx.price;

        if price * (1.0 + proximity) >= high && price > sma_value {
            Signal::Long
        } else if price * (1.0 - proximity) <= low && price < sma_value {
            Signal::Short
        } else {
            Signal::Flat
        }
    }

    fn entry_levels(&self, ctx: &StrategyContext<'_>, side: Side) -> Option<EntryLevels> {
        let factor = self.config.stop_percent / 100.0;
        let stop_price = match side {
            Side::Buy => ctx.price * (1.0 - factor),
            Side::Sell => ctx.price * (1.0 + factor),
        };
        Some(EntryLevels {
            entry_price: ctx.price,
            stop_price,
            win_price: None,
        })
    }

    /// Exits come from the signal turning flat; no ratchet.
    fn update_stop(&self, _ctx: &StrategyContext<'_>) -> Option<crate::strategies::StopAdjustment> {
        None
    }
}
