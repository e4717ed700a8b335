//! Per-symbol trading state
//!
//! `TradeState` is the mutable record every strategy reads and writes for
//! one symbol: entry/stop anchors, the risk step used to ratchet stops,
//! consolidated price windows, the session VWAP, gap gating and order
//! handles. `EquityBook` holds one per traded symbol together with the
//! daily entry-capacity register.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::broker::OrderId;
use crate::indicators::SessionVwap;
use crate::window::RollingWindow;
use crate::{Candle, Symbol};

/// Window sizing for a symbol's consolidated state
#[derive(Debug, Clone, Copy)]
pub struct WindowSpec {
    /// Consolidated trading candles kept (the "previous candle" window)
    pub minute_window: usize,
    /// Low-price candles kept for stop placement
    pub low_window: usize,
    /// Daily candles kept (252 covers a trading year)
    pub daily_window: usize,
}

impl Default for WindowSpec {
    fn default() -> Self {
        WindowSpec {
            minute_window: 2,
            low_window: 1,
            daily_window: 252,
        }
    }
}

/// Mutable per-symbol trading record
#[derive(Debug, Clone)]
pub struct TradeState {
    symbol: Symbol,

    /// Reference entry price; advances one risk step on each stop ratchet
    pub last_entry_price: Option<f64>,
    /// Protective stop level at entry
    pub last_stop_entry_price: Option<f64>,
    /// |entry - stop| at entry; the ratchet increment
    pub risk_step: Option<f64>,
    /// Profit-taking level (opening-range style exits)
    pub win_exit_price: Option<f64>,

    /// Previous session's closing price, kept across days for gap gating
    pub last_day_close: Option<f64>,
    /// First price seen in the current session
    pub day_open: Option<f64>,
    /// Most recent price seen for this symbol
    pub last_price: Option<f64>,

    pub entry_order: Option<OrderId>,
    pub exit_order: Option<OrderId>,
    pub last_trade_time: Option<DateTime<Utc>>,

    /// Whether today's overnight gap permits trading this symbol
    pub allowed_by_gap: bool,
    gap_threshold_pct: f64,

    pub minute_window: RollingWindow<Candle>,
    pub low_window: RollingWindow<Candle>,
    pub daily_window: RollingWindow<Candle>,
    pub vwap: SessionVwap,

    /// First consolidated candle of the session
    pub first_candle: Option<Candle>,
    /// Candle that straddled VWAP and closed above it, arming a breakout
    pub last_broken_candle: Option<Candle>,
}

impl TradeState {
    pub fn new(symbol: Symbol, gap_threshold_pct: f64, windows: WindowSpec) -> Self {
        TradeState {
            symbol,
            last_entry_price: None,
            last_stop_entry_price: None,
            risk_step: None,
            win_exit_price: None,
            last_day_close: None,
            day_open: None,
            last_price: None,
            entry_order: None,
            exit_order: None,
            last_trade_time: None,
            allowed_by_gap: true,
            gap_threshold_pct,
            minute_window: RollingWindow::new(windows.minute_window),
            low_window: RollingWindow::new(windows.low_window),
            daily_window: RollingWindow::new(windows.daily_window),
            vwap: SessionVwap::new(),
            first_candle: None,
            last_broken_candle: None,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Intraday windows and VWAP have warmed up for the session
    pub fn is_ready(&self) -> bool {
        self.minute_window.is_ready() && self.low_window.is_ready() && self.vwap.is_ready()
    }

    /// Clear per-trade anchors after an exit or at session end
    pub fn reset_trade_prices(&mut self) {
        self.last_entry_price = None;
        self.last_stop_entry_price = None;
        self.risk_step = None;
        self.win_exit_price = None;
        self.exit_order = None;
    }

    /// Fresh session state; daily window and last close survive the roll
    pub fn reset_for_day(&mut self) {
        self.minute_window.reset();
        self.low_window.reset();
        self.vwap.reset();
        self.first_candle = None;
        self.last_broken_candle = None;
        self.day_open = None;
        self.entry_order = None;
        self.reset_trade_prices();
    }

    pub fn set_last_trade_time(&mut self, time: DateTime<Utc>) {
        self.last_trade_time = Some(time);
    }

    /// Seconds since the last trade, or None if the symbol has not traded
    pub fn seconds_since_last_trade(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_trade_time.map(|t| (now - t).num_seconds())
    }

    /// Gate the day's trading on the overnight gap. Trading stays allowed
    /// when no previous close is known (first day in the feed).
    pub fn update_gap_allowance(&mut self, day_open_price: f64) {
        self.day_open = Some(day_open_price);
        if let Some(last_close) = self.last_day_close {
            let gap = crate::session::market_gap_percent(last_close, day_open_price);
            self.allowed_by_gap = gap > self.gap_threshold_pct;
            if !self.allowed_by_gap {
                tracing::debug!(
                    symbol = %self.symbol,
                    gap_percent = gap,
                    threshold = self.gap_threshold_pct,
                    "trading disallowed by overnight gap"
                );
            }
        }
    }

    /// Absorb a consolidated trading candle
    pub fn observe_minute_candle(&mut self, candle: Candle) {
        if self.first_candle.is_none() {
            self.first_candle = Some(candle.clone());
        }
        self.update_broken_candle(&candle);
        self.minute_window.add(candle);
    }

    /// Absorb a consolidated low-price candle
    pub fn observe_low_candle(&mut self, candle: Candle) {
        self.low_window.add(candle);
    }

    /// Absorb a completed daily candle
    pub fn observe_daily_candle(&mut self, candle: Candle) {
        self.daily_window.add(candle);
    }

    /// A candle that straddles VWAP and closes at or above it
    fn is_positive_broken(&self, candle: &Candle) -> bool {
        let vwap = self.vwap.value();
        candle.high > vwap && candle.low < vwap && candle.close >= vwap
    }

    /// Track the candle that armed a VWAP breakout. A candle whose low and
    /// close both fall below VWAP disarms it.
    fn update_broken_candle(&mut self, candle: &Candle) {
        if !self.vwap.is_ready() {
            return;
        }
        let vwap = self.vwap.value();
        if self.last_broken_candle.is_some() && candle.low < vwap && candle.close < vwap {
            self.last_broken_candle = None;
            return;
        }
        if self.last_broken_candle.is_none() && self.is_positive_broken(candle) {
            self.last_broken_candle = Some(candle.clone());
        }
    }
}

/// All traded symbols plus the per-day entry capacity register
#[derive(Debug)]
pub struct EquityBook {
    equities: HashMap<Symbol, TradeState>,
    /// None = unlimited entries per symbol per day
    max_trades_per_day: Option<u32>,
    entries_today: HashMap<Symbol, u32>,
}

impl EquityBook {
    pub fn new(max_trades_per_day: Option<u32>) -> Self {
        EquityBook {
            equities: HashMap::new(),
            max_trades_per_day,
            entries_today: HashMap::new(),
        }
    }

    /// Register a symbol. Returns false if it is already tracked.
    pub fn add_equity(&mut self, state: TradeState) -> bool {
        let symbol = state.symbol().clone();
        if self.equities.contains_key(&symbol) {
            return false;
        }
        self.equities.insert(symbol, state);
        true
    }

    pub fn remove_equity(&mut self, symbol: &Symbol) -> Option<TradeState> {
        self.equities.remove(symbol)
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&TradeState> {
        self.equities.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &Symbol) -> Option<&mut TradeState> {
        self.equities.get_mut(symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.equities.contains_key(symbol)
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.equities.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn states_mut(&mut self) -> impl Iterator<Item = &mut TradeState> {
        self.equities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.equities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equities.is_empty()
    }

    /// Count one entry order against today's capacity
    pub fn register_entry(&mut self, symbol: &Symbol) {
        *self.entries_today.entry(symbol.clone()).or_insert(0) += 1;
    }

    /// Whether the symbol still has entry capacity today
    pub fn entry_capacity_left(&self, symbol: &Symbol) -> bool {
        match self.max_trades_per_day {
            None => true,
            Some(max) => self.entries_today.get(symbol).copied().unwrap_or(0) < max,
        }
    }

    /// Fresh capacity register at the start of each day
    pub fn reset_daily_register(&mut self) {
        self.entries_today.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state() -> TradeState {
        TradeState::new(Symbol::new("SPY"), 0.0, WindowSpec::default())
    }

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle {
            datetime: Utc::now(),
            open: close,
            high,
            low,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn test_readiness_requires_windows_and_vwap() {
        let mut s = state();
        assert!(!s.is_ready());

        s.vwap.update(&candle(101.0, 99.0, 100.0));
        s.observe_minute_candle(candle(101.0, 99.0, 100.0));
        s.observe_minute_candle(candle(102.0, 100.0, 101.0));
        assert!(!s.is_ready());

        s.observe_low_candle(candle(101.0, 99.0, 100.0));
        assert!(s.is_ready());
    }

    #[test]
    fn test_gap_allowance() {
        let mut s = state();

        // First day: no previous close, trading allowed
        s.update_gap_allowance(100.0);
        assert!(s.allowed_by_gap);

        // Gap down below the threshold disallows the day
        s.last_day_close = Some(100.0);
        s.update_gap_allowance(99.0);
        assert!(!s.allowed_by_gap);

        // Gap up above it allows
        s.update_gap_allowance(101.0);
        assert!(s.allowed_by_gap);
    }

    #[test]
    fn test_broken_candle_arm_and_disarm() {
        let mut s = state();
        // VWAP around 100
        s.vwap.update(&candle(101.0, 99.0, 100.0));

        // Straddles VWAP, closes above: arms
        s.observe_minute_candle(candle(100.8, 99.5, 100.4));
        assert!(s.last_broken_candle.is_some());

        // Dips below but closes above: stays armed
        s.observe_minute_candle(candle(100.5, 99.4, 100.2));
        assert!(s.last_broken_candle.is_some());

        // Low and close both below VWAP: disarms
        s.observe_minute_candle(candle(99.9, 99.0, 99.2));
        assert!(s.last_broken_candle.is_none());
    }

    #[test]
    fn test_day_reset_preserves_close_and_daily_window() {
        let mut s = state();
        s.vwap.update(&candle(101.0, 99.0, 100.0));
        s.observe_minute_candle(candle(101.0, 99.0, 100.0));
        s.observe_daily_candle(candle(101.0, 99.0, 100.0));
        s.last_day_close = Some(100.0);
        s.last_entry_price = Some(100.5);
        s.exit_order = Some(7);

        s.reset_for_day();

        assert!(s.minute_window.is_empty());
        assert!(!s.vwap.is_ready());
        assert!(s.last_entry_price.is_none());
        assert!(s.exit_order.is_none());
        assert_eq!(s.last_day_close, Some(100.0));
        assert_eq!(s.daily_window.len(), 1);
    }

    #[test]
    fn test_entry_capacity() {
        let spy = Symbol::new("SPY");
        let mut book = EquityBook::new(Some(1));
        book.add_equity(TradeState::new(spy.clone(), 0.0, WindowSpec::default()));

        assert!(book.entry_capacity_left(&spy));
        book.register_entry(&spy);
        assert!(!book.entry_capacity_left(&spy));

        book.reset_daily_register();
        assert!(book.entry_capacity_left(&spy));

        let mut unlimited = EquityBook::new(None);
        unlimited.add_equity(TradeState::new(spy.clone(), 0.0, WindowSpec::default()));
        for _ in 0..10 {
            unlimited.register_entry(&spy);
        }
        assert!(unlimited.entry_capacity_left(&spy));
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let mut book = EquityBook::new(None);
        assert!(book.add_equity(state()));
        assert!(!book.add_equity(state()));
        assert_eq!(book.len(), 1);
    }
}
