//! VWAP Breakout Strategy Implementation
//!
//! ## Entry Logic
//! 1. Long when price is above VWAP and VWAP sits above the previous
//!    candle's high (the candle pulled back under VWAP and price broke out)
//! 2. Short on the mirrored condition when enabled
//! 3. Optional confirmation: a candle must have straddled VWAP and closed
//!    above it (the "broken candle"), and stayed armed for a minimum time
//!
//! ## Exit Logic
//! 1. Protective stop-limit at the window low (high for shorts)
//! 2. Stop ratchets one half risk step each time price advances a full step
//! 3. Session liquidation near the close (handled by the algorithm)

use crate::strategies::{EntryLevels, Strategy, StrategyContext};
use crate::{Side, Signal};

use super::config::VwapBreakoutConfig;

/// VWAP Breakout Strategy
pub struct VwapBreakoutStrategy {
    config: VwapBreakoutConfig,
}

impl VwapBreakoutStrategy {
    pub fn new(config: VwapBreakoutConfig) -> Self {
        VwapBreakoutStrategy { config }
    }

    fn long_condition(&self, ctx: &StrategyContext<'_>) -> bool {
        let last_candle = match ctx.state.minute_window.get(0) {
            Some(c) => c,
            None => return false,
        };
        let vwap = ctx.state.vwap.value();

        if self.config.require_broken_candle {
            let broken = match &ctx.state.last_broken_candle {
                Some(b) => b,
                None => return false,
            };
            let armed_secs = (last_candle.datetime - broken.datetime).num_seconds();
            armed_secs >= self.config.accumulate_positive_secs
                && last_candle.close >= vwap
                && ctx.price > last_candle.high
        } else {
            ctx.price > vwap && vwap > last_candle.high
        }
    }

    fn short_condition(&self, ctx: &StrategyContext<'_>) -> bool {
        if !self.config.allow_short {
            return false;
        }
        let last_candle = match ctx.state.minute_window.get(0) {
            Some(c) => c,
            None => return false,
        };
        let vwap = ctx.state.vwap.value();
        ctx.price < vwap && vwap < last_candle.low
    }
}

impl Strategy for VwapBreakoutStrategy {
    fn name(&self) -> &'static str {
        "vwap_breakout"
    }

    fn generate_signal(&self, ctx: &StrategyContext<'_>) -> Signal {
        if !ctx.state.vwap.is_ready() {
            return Signal::Flat;
        }

        match ctx.invested_side {
            // Flat: look for a breakout either way.
            None => {
                if self.long_condition(ctx) {
                    Signal::Long
                } else if self.short_condition(ctx) {
                    Signal::Short
                } else {
                    Signal::Flat
                }
            }
            // Invested: hold unless the opposite breakout fires, which
            // flips the position.
            Some(Side::Buy) => {
                if self.short_condition(ctx) {
                    Signal::Short
                } else {
                    Signal::Long
                }
            }
            Some(Side::Sell) => {
                if self.long_condition(ctx) {
                    Signal::Long
                } else {
                    Signal::Short
                }
            }
        }
    }

    fn entry_levels(&self, ctx: &StrategyContext<'_>, side: Side) -> Option<EntryLevels> {
        let minute = ctx.state.minute_window.get(0)?;
        let low_candle = ctx.state.low_window.get(0)?;

        let stop_price = match side {
            Side::Buy => low_candle.low.min(minute.low),
            Side::Sell => low_candle.high.max(minute.high),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equity::{TradeState, WindowSpec};
    use crate::session::{MarketHours, SessionClock};
    use crate::{Candle, Symbol};
    use chrono::{TimeZone, Utc};

    fn candle(minute: u32, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            datetime: Utc.with_ymd_and_hms(2021, 1, 4, 10, minute, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    struct Fixture {
        symbol: Symbol,
        state: TradeState,
        session: SessionClock,
    }

    fn fixture() -> Fixture {
        let symbol = Symbol::new("SPY");
        let mut state = TradeState::new(symbol.clone(), 0.0, WindowSpec::default());
        // VWAP near 100
        state.vwap.update(&candle(0, 101.0, 99.0, 100.0));
        Fixture {
            symbol,
            state,
            session: SessionClock::new(MarketHours::default(), 10, 10, 5),
        }
    }

    fn ctx<'a>(f: &'a Fixture, price: f64) -> StrategyContext<'a> {
        StrategyContext {
            symbol: &f.symbol,
            state: &f.state,
            price,
            timestamp: Utc.with_ymd_and_hms(2021, 1, 4, 10, 5, 0).unwrap(),
            session: &f.session,
            invested_side: None,
        }
    }

    #[test]
    fn test_long_breakout_over_vwap() {
        let mut f = fixture();
        // Previous candle entirely below VWAP (high 99.8 < vwap ~100)
        f.state.observe_minute_candle(candle(1, 99.8, 99.2, 99.5));

        let strategy = VwapBreakoutStrategy::new(VwapBreakoutConfig::default());
        // Price above VWAP while VWAP is above the candle high
        assert_eq!(strategy.generate_signal(&ctx(&f, 100.5)), Signal::Long);
        // Price still below VWAP: no entry
        assert_eq!(strategy.generate_signal(&ctx(&f, 99.6)), Signal::Flat);
    }

    #[test]
    fn test_short_breakout_under_vwap() {
        let mut f = fixture();
        // Previous candle entirely above VWAP
        f.state.observe_minute_candle(candle(1, 100.9, 100.2, 100.5));

        let strategy = VwapBreakoutStrategy::new(VwapBreakoutConfig::default());
        assert_eq!(strategy.generate_signal(&ctx(&f, 99.5)), Signal::Short);

        let long_only = VwapBreakoutStrategy::new(VwapBreakoutConfig {
            allow_short: false,
            ..VwapBreakoutConfig::default()
        });
        assert_eq!(long_only.generate_signal(&ctx(&f, 99.5)), Signal::Flat);
    }

    #[test]
    fn test_broken_candle_confirmation() {
        let mut f = fixture();
        let strategy = VwapBreakoutStrategy::new(VwapBreakoutConfig {
            require_broken_candle: true,
            ..VwapBreakoutConfig::default()
        });

        // No broken candle armed yet: flat even above VWAP
        f.state.observe_minute_candle(candle(1, 99.8, 99.2, 99.5));
        assert_eq!(strategy.generate_signal(&ctx(&f, 100.5)), Signal::Flat);

        // Straddle candle closes above VWAP: arms the breakout
        f.state.observe_minute_candle(candle(2, 100.6, 99.7, 100.3));
        assert!(f.state.last_broken_candle.is_some());
        // Price clears the candle high
        assert_eq!(strategy.generate_signal(&ctx(&f, 100.7)), Signal::Long);
        // Price below the candle high: not yet
        assert_eq!(strategy.generate_signal(&ctx(&f, 100.4)), Signal::Flat);
    }

    #[test]
    fn test_entry_levels_use_window_extremes() {
        let mut f = fixture();
        f.state.observe_minute_candle(candle(1, 99.8, 99.2, 99.5));
        f.state.observe_low_candle(candle(1, 99.9, 99.0, 99.5));

        let strategy = VwapBreakoutStrategy::new(VwapBreakoutConfig::default());

        let long = strategy.entry_levels(&ctx(&f, 100.5), Side::Buy).unwrap();
        assert_eq!(long.entry_price, 100.5);
        assert_eq!(long.stop_price, 99.0);
        assert!((long.risk_step() - 1.5).abs() < 1e-9);

        let short = strategy.entry_levels(&ctx(&f, 98.0), Side::Sell).unwrap();
        assert_eq!(short.stop_price, 99.9);
    }

    #[test]
    fn test_invested_holds_until_opposite_breakout() {
        let mut f = fixture();
        f.state.observe_minute_candle(candle(1, 100.9, 100.2, 100.5));

        let strategy = VwapBreakoutStrategy::new(VwapBreakoutConfig::default());
        let mut c = ctx(&f, 100.3);
        c.invested_side = Some(Side::Buy);

        // Holding long with no short condition
        assert_eq!(strategy.generate_signal(&c), Signal::Long);

        // Short condition fires while long: flip
        c.price = 99.5;
        assert_eq!(strategy.generate_signal(&c), Signal::Short);
    }

    #[test]
    fn test_default_stop_ratchet() {
        let mut f = fixture();
        f.state.last_entry_price = Some(100.0);
        f.state.risk_step = Some(0.5);
        f.state.exit_order = Some(1);

        let strategy = VwapBreakoutStrategy::new(VwapBreakoutConfig::default());
        let mut c = ctx(&f, 100.6);
        c.invested_side = Some(Side::Buy);

        let adj = strategy.update_stop(&c).unwrap();
        assert!((adj.stop_price - 100.25).abs() < 1e-9);
        assert!((adj.entry_anchor - 100.5).abs() < 1e-9);
        assert!((adj.limit_price - 100.20).abs() < 1e-9);

        // No ratchet until price clears a full step
        c.price = 100.4;
        assert!(strategy.update_stop(&c).is_none());
    }
}
