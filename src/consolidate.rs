//! Bar consolidation
//!
//! Aggregates fine-grained bars (seconds, minutes) into fixed-period
//! candles. Strategies never look at raw ticks directly; they read the
//! consolidated minute and low-price windows kept on each symbol's state.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::Candle;

/// Aggregates incoming bars into candles of a fixed period.
///
/// A consolidated candle is emitted when an incoming bar crosses the next
/// period boundary. Boundaries are aligned to midnight, so a 60s
/// consolidator emits wall-clock minute candles.
#[derive(Debug, Clone)]
pub struct BarConsolidator {
    period_secs: i64,
    current: Option<Candle>,
    bucket_start: i64,
}

impl BarConsolidator {
    pub fn new(period_secs: u64) -> Self {
        assert!(period_secs > 0, "consolidation period must be positive");
        BarConsolidator {
            period_secs: period_secs as i64,
            current: None,
            bucket_start: 0,
        }
    }

    fn bucket_of(&self, dt: DateTime<Utc>) -> i64 {
        dt.timestamp().div_euclid(self.period_secs)
    }

    /// Feed one bar. Returns the completed candle when the incoming bar
    /// starts a new period.
    pub fn update(&mut self, bar: &Candle) -> Option<Candle> {
        let bucket = self.bucket_of(bar.datetime);

        let completed = match &mut self.current {
            Some(current) if bucket == self.bucket_start => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
                None
            }
            Some(_) => self.current.take(),
            None => None,
        };

        if self.current.is_none() {
            let open_ts = bucket * self.period_secs;
            let open_time = Utc
                .timestamp_opt(open_ts, 0)
                .single()
                .unwrap_or(bar.datetime);
            self.current = Some(Candle {
                datetime: open_time,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            });
            self.bucket_start = bucket;
        }

        completed
    }

    /// Flush the in-progress candle, e.g. at session end
    pub fn flush(&mut self) -> Option<Candle> {
        self.current.take()
    }

    /// Drop any in-progress aggregation
    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Consolidates intraday bars into one candle per calendar day.
///
/// Feeds the long daily windows (52-week high/low, daily SMA) that the
/// moving-average strategy reads.
#[derive(Debug, Clone, Default)]
pub struct DailyConsolidator {
    current: Option<Candle>,
    current_day: Option<(i32, u32, u32)>,
}

impl DailyConsolidator {
    pub fn new() -> Self {
        DailyConsolidator::default()
    }

    fn day_of(dt: DateTime<Utc>) -> (i32, u32, u32) {
        (dt.year(), dt.month(), dt.day())
    }

    /// Feed one bar. Returns the previous day's candle on day roll.
    pub fn update(&mut self, bar: &Candle) -> Option<Candle> {
        let day = Self::day_of(bar.datetime);

        let completed = match (&mut self.current, self.current_day) {
            (Some(current), Some(d)) if d == day => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
                None
            }
            (Some(_), _) => self.current.take(),
            (None, _) => None,
        };

        if self.current.is_none() {
            let midnight = bar
                .datetime
                .with_hour(0)
                .and_then(|d| d.with_minute(0))
                .and_then(|d| d.with_second(0))
                .and_then(|d| d.with_nanosecond(0))
                .unwrap_or(bar.datetime);
            self.current = Some(Candle {
                datetime: midnight,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            });
            self.current_day = Some(day);
        }

        completed
    }

    pub fn flush(&mut self) -> Option<Candle> {
        self.current_day = None;
        self.current.take()
    }
}
