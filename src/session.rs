//! Trading session clock and liquidation gating
//!
//! Replaces the hosted platform's scheduled callbacks (after market open,
//! N minutes before close) with a clock driven purely by bar timestamps:
//! each `advance` compares the incoming timestamp against the session
//! thresholds and emits the events that were crossed, in order.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// How an open position must be handled as the close approaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidateState {
    /// It is not mandatory to liquidate.
    Normal,
    /// Liquidate as soon as the position is at or above its entry price.
    ToWin,
    /// Liquidate now.
    Force,
}

/// Regular market hours, compared against bar time-of-day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for MarketHours {
    fn default() -> Self {
        MarketHours {
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        }
    }
}

/// Session transitions, in the order they occur within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// First bar of a new calendar day, before the open fires.
    DayStarted,
    MarketOpened,
    /// New entries are no longer allowed.
    BuyCutoff,
    /// Open positions must exit on the first non-losing tick.
    ToWin,
    /// Open positions must exit immediately.
    ForceLiquidate,
    /// Session over: orders cancelled, day close recorded.
    MarketClosed,
}

/// Bar-driven session state machine.
#[derive(Debug, Clone)]
pub struct SessionClock {
    hours: MarketHours,
    buy_cutoff_minutes: u32,
    to_win_minutes: u32,
    force_minutes: u32,

    current_day: Option<NaiveDate>,
    opened: bool,
    buy_cutoff_fired: bool,
    to_win_fired: bool,
    force_fired: bool,
    closed: bool,

    liquidate_state: LiquidateState,
    trading_window: bool,
    entries_allowed: bool,
}

impl SessionClock {
    pub fn new(
        hours: MarketHours,
        buy_cutoff_minutes: u32,
        to_win_minutes: u32,
        force_minutes: u32,
    ) -> Self {
        SessionClock {
            hours,
            buy_cutoff_minutes,
            to_win_minutes,
            force_minutes,
            current_day: None,
            opened: false,
            buy_cutoff_fired: false,
            to_win_fired: false,
            force_fired: false,
            closed: false,
            liquidate_state: LiquidateState::Normal,
            trading_window: false,
            entries_allowed: false,
        }
    }

    fn minutes_before_close(&self, minutes: u32) -> NaiveTime {
        self.hours.close - chrono::Duration::minutes(minutes as i64)
    }

    /// Advance the clock to `timestamp`, emitting crossed transitions in order.
    pub fn advance(&mut self, timestamp: DateTime<Utc>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let date = timestamp.date_naive();
        let time = timestamp.time();

        if self.current_day != Some(date) {
            if self.opened && !self.closed {
                // The feed never reached the close threshold yesterday.
                self.apply_close();
                events.push(SessionEvent::MarketClosed);
            }
            self.current_day = Some(date);
            self.opened = false;
            self.buy_cutoff_fired = false;
            self.to_win_fired = false;
            self.force_fired = false;
            self.closed = false;
            self.liquidate_state = LiquidateState::Normal;
            self.trading_window = false;
            self.entries_allowed = false;
            events.push(SessionEvent::DayStarted);
        }

        if !self.opened && time >= self.hours.open {
            self.opened = true;
            self.trading_window = true;
            self.entries_allowed = true;
            self.liquidate_state = LiquidateState::Normal;
            events.push(SessionEvent::MarketOpened);
        }

        if self.opened {
            if !self.buy_cutoff_fired && time >= self.minutes_before_close(self.buy_cutoff_minutes)
            {
                self.buy_cutoff_fired = true;
                self.entries_allowed = false;
                events.push(SessionEvent::BuyCutoff);
            }

            if !self.to_win_fired && time >= self.minutes_before_close(self.to_win_minutes) {
                self.to_win_fired = true;
                if self.liquidate_state == LiquidateState::Normal {
                    self.liquidate_state = LiquidateState::ToWin;
                }
                events.push(SessionEvent::ToWin);
            }

            if !self.force_fired && time >= self.minutes_before_close(self.force_minutes) {
                self.force_fired = true;
                self.liquidate_state = LiquidateState::Force;
                events.push(SessionEvent::ForceLiquidate);
            }

            if !self.closed && time >= self.hours.close {
                self.apply_close();
                events.push(SessionEvent::MarketClosed);
            }
        }

        events
    }

    fn apply_close(&mut self) {
        self.closed = true;
        self.trading_window = false;
        self.entries_allowed = false;
    }

    pub fn liquidate_state(&self) -> LiquidateState {
        self.liquidate_state
    }

    /// True between market open and close for the current day
    pub fn in_trading_window(&self) -> bool {
        self.trading_window
    }

    /// True while new entries are still allowed
    pub fn entries_allowed(&self) -> bool {
        self.entries_allowed
    }

    /// Whole minutes elapsed since the open, None before the open
    pub fn minutes_since_open(&self, timestamp: DateTime<Utc>) -> Option<u32> {
        let t = timestamp.time();
        if t < self.hours.open {
            return None;
        }
        let elapsed = t.num_seconds_from_midnight() - self.hours.open.num_seconds_from_midnight();
        Some(elapsed / 60)
    }

    /// Whole minutes remaining to the close, 0 at or after the close
    pub fn minutes_to_close(&self, timestamp: DateTime<Utc>) -> u32 {
        let t = timestamp.time();
        if t >= self.hours.close {
            return 0;
        }
        (self.hours.close.num_seconds_from_midnight() - t.num_seconds_from_midnight()) / 60
    }
}

/// Overnight gap in percent of the current open.
///
/// Positive values are gap-ups. Matches how the source scripts gate a
/// day's trading on the open-vs-previous-close move.
pub fn market_gap_percent(last_day_close: f64, current_day_open: f64) -> f64 {
    (current_day_open - last_day_close) / current_day_open * 100.0
}
