//! Technical indicators
//!
//! Moving averages come from the `ta` crate; VWAP is computed manually
//! because the session-resetting variant the intraday strategies need is
//! not covered by it. Vector functions return `None` during warmup, same
//! convention as the rest of the codebase.

use ta::indicators::SimpleMovingAverage;
use ta::Next;

use crate::Candle;

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match SimpleMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    let mut result = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let sma_val = indicator.next(value);
        if i + 1 >= period {
            result.push(Some(sma_val));
        } else {
            result.push(None);
        }
    }

    result
}

/// Calculate cumulative Volume Weighted Average Price over a slice
pub fn vwap(candles: &[Candle]) -> Vec<f64> {
    let mut cumulative_tp_vol = 0.0;
    let mut cumulative_vol = 0.0;
    let mut result = Vec::with_capacity(candles.len());

    for candle in candles {
        cumulative_tp_vol += candle.typical_price() * candle.volume;
        cumulative_vol += candle.volume;

        if cumulative_vol > 0.0 {
            result.push(cumulative_tp_vol / cumulative_vol);
        } else {
            result.push(candle.close);
        }
    }

    result
}

/// Highest high over the most recent `period` candles
pub fn rolling_high(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period || period == 0 {
        return None;
    }
    candles[candles.len() - period..]
        .iter()
        .map(|c| c.high)
        .fold(None, |acc: Option<f64>, h| {
            Some(acc.map_or(h, |a| a.max(h)))
        })
}

/// Lowest low over the most recent `period` candles
pub fn rolling_low(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period || period == 0 {
        return None;
    }
    candles[candles.len() - period..]
        .iter()
        .map(|c| c.low)
        .fold(None, |acc: Option<f64>, l| {
            Some(acc.map_or(l, |a| a.min(l)))
        })
}

/// Incremental intraday VWAP that resets at the start of each session.
///
/// Accumulates typical price × volume tick by tick; `is_ready` once it has
/// absorbed any volume for the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionVwap {
    cumulative_tp_vol: f64,
    cumulative_vol: f64,
    current: f64,
}

impl SessionVwap {
    pub fn new() -> Self {
        SessionVwap::default()
    }

    /// Absorb one bar, returning the updated value
    pub fn update(&mut self, candle: &Candle) -> f64 {
        self.cumulative_tp_vol += candle.typical_price() * candle.volume;
        self.cumulative_vol += candle.volume;

        if self.cumulative_vol > 0.0 {
            self.current = self.cumulative_tp_vol / self.cumulative_vol;
        } else {
            self.current = candle.close;
        }
        self.current
    }

    pub fn value(&self) -> f64 {
        self.current
    }

    pub fn is_ready(&self) -> bool {
        self.cumulative_vol > 0.0
    }

    /// Called at market open so the value does not bleed across sessions
    pub fn reset(&mut self) {
        *self = SessionVwap::default();
    }
}
