//! Gap Reversal Strategy Implementation
//!
//! Gap up at the open is sold, gap down is bought, both on the assumption
//! the gap partially fills during the session. The position is flattened a
//! fixed number of minutes before the close.

use crate::strategies::{EntryLevels, Strategy, StrategyContext};
use crate::{Side, Signal};

use super::config::GapReversalConfig;

/// Gap Reversal Strategy
pub struct GapReversalStrategy {
    config: GapReversalConfig,
}

impl GapReversalStrategy {
    pub fn new(config: GapReversalConfig) -> Self {
        GapReversalStrategy { config }
    }
}

impl Strategy for GapReversalStrategy {
    fn name(&self) -> &'static str {
        "gap_reversal"
    }

    fn generate_signal(&self, ctx: &StrategyContext<'_>) -> Signal {
        // Flatten ahead of the close.
        if ctx.invested_side.is_some() {
            if ctx.session.minutes_to_close(ctx.timestamp) <= self.config.exit_minutes_before_close
            {
                return Signal::Flat;
            }
            return match ctx.invested_side {
                Some(Side::Buy) => Signal::Long,
                Some(Side::Sell) => Signal::Short,
                None => Signal::Flat,
            };
        }

        // The gap is only evaluated once, on the configured minute.
        if ctx.session.minutes_since_open(ctx.timestamp) != Some(self.config.entry_minute) {
            return Signal::Flat;
        }

        let (prev_close, day_open) = match (ctx.state.last_day_close, ctx.state.day_open) {
            (Some(c), Some(o)) => (c, o),
            _ => return Signal::Flat,
        };

        let factor = self.config.gap_percent / 100.0;
        if day_open >= prev_close * (1.0 + factor) {
            Signal::Short
        } else if day_open <= prev_close * (1.0 - factor) {
            Signal::Long
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

    /// The fade rides until the timed exit; no ratchet.
    fn update_stop(&self, _ctx: &StrategyContext<'_>) -> Option<crate::strategies::StopAdjustment> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equity::{TradeState, WindowSpec};
    use crate::session::{MarketHours, SessionClock};
    use crate::Symbol;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 4, h, m, 0).unwrap()
    }

    struct Fixture {
        symbol: Symbol,
        state: TradeState,
        session: SessionClock,
    }

    fn fixture(prev_close: f64, day_open: f64) -> Fixture {
        let symbol = Symbol::new("SPY");
        let mut state = TradeState::new(symbol.clone(), 0.0, WindowSpec::default());
        state.last_day_close = Some(prev_close);
        state.day_open = Some(day_open);
        Fixture {
            symbol,
            state,
            session: SessionClock::new(MarketHours::default(), 10, 10, 5),
        }
    }

    fn ctx<'a>(f: &'a Fixture, price: f64, timestamp: DateTime<Utc>) -> StrategyContext<'a> {
        StrategyContext {
            symbol: &f.symbol,
            state: &f.state,
            price,
            timestamp,
            session: &f.session,
            invested_side: None,
        }
    }

    #[test]
    fn test_gap_up_is_sold() {
        let f = fixture(100.0, 101.5);
        let strategy = GapReversalStrategy::new(GapReversalConfig::default());
        assert_eq!(
            strategy.generate_signal(&ctx(&f, 101.5, at(9, 31))),
            Signal::Short
        );
    }

    #[test]
    fn test_gap_down_is_bought() {
        let f = fixture(100.0, 98.5);
        let strategy = GapReversalStrategy::new(GapReversalConfig::default());
        assert_eq!(
            strategy.generate_signal(&ctx(&f, 98.5, at(9, 31))),
            Signal::Long
        );
    }

    #[test]
    fn test_small_gap_ignored() {
        let f = fixture(100.0, 100.5);
        let strategy = GapReversalStrategy::new(GapReversalConfig::default());
        assert_eq!(
            strategy.generate_signal(&ctx(&f, 100.5, at(9, 31))),
            Signal::Flat
        );
    }

    #[test]
    fn test_only_on_entry_minute() {
        let f = fixture(100.0, 98.0);
        let strategy = GapReversalStrategy::new(GapReversalConfig::default());
        assert_eq!(
            strategy.generate_signal(&ctx(&f, 98.0, at(9, 32))),
            Signal::Flat
        );
        assert_eq!(
            strategy.generate_signal(&ctx(&f, 98.0, at(12, 0))),
            Signal::Flat
        );
    }

    #[test]
    fn test_timed_exit_before_close() {
        let f = fixture(100.0, 98.0);
        let strategy = GapReversalStrategy::new(GapReversalConfig::default());

        let mut held = ctx(&f, 99.0, at(12, 0));
        held.invested_side = Some(Side::Buy);
        assert_eq!(strategy.generate_signal(&held), Signal::Long);

        let mut near_close = ctx(&f, 99.0, at(15, 45));
        near_close.invested_side = Some(Side::Buy);
        assert_eq!(strategy.generate_signal(&near_close), Signal::Flat);
    }

    #[test]
    fn test_percent_stop_levels() {
        let f = fixture(100.0, 98.0);
        let strategy = GapReversalStrategy::new(GapReversalConfig::default());

        let long = strategy
            .entry_levels(&ctx(&f, 98.0, at(9, 31)), Side::Buy)
            .unwrap();
        assert!((long.stop_price - 97.02).abs() < 1e-9);

        let short = strategy
            .entry_levels(&ctx(&f, 101.5, at(9, 31)), Side::Sell)
            .unwrap();
        assert!((short.stop_price - 102.515).abs() < 1e-9);
    }
}
