//! Core data types used across the trading system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when constructing a candle from raw values
#[derive(Debug, Error, PartialEq)]
pub enum CandleValidationError {
    #[error("high ({high}) is below low ({low})")]
    HighBelowLow { high: f64, low: f64 },
    #[error("non-positive close price ({0})")]
    NonPositiveClose(f64),
    #[error("negative volume ({0})")]
    NegativeVolume(f64),
}

/// OHLCV candlestick data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Validating constructor. Data loaders skip rows that fail here.
    pub fn new(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        if high < low {
            return Err(CandleValidationError::HighBelowLow { high, low });
        }
        if close <= 0.0 {
            return Err(CandleValidationError::NonPositiveClose(close));
        }
        if volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(volume));
        }
        Ok(Candle {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Typical price used by volume-weighted indicators
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Traded instrument symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side that closes a position opened on this side
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Trading signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Long,
    Short,
    Flat,
}

impl Signal {
    pub fn side(self) -> Option<Side> {
        match self {
            Signal::Long => Some(Side::Buy),
            Signal::Short => Some(Side::Sell),
            Signal::Flat => None,
        }
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopHit,
    TargetHit,
    Signal,
    LiquidateToWin,
    LiquidateForce,
    SessionEnd,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::StopHit => "stop hit",
            ExitReason::TargetHit => "target hit",
            ExitReason::Signal => "signal",
            ExitReason::LiquidateToWin => "liquidate to win",
            ExitReason::LiquidateForce => "force liquidate",
            ExitReason::SessionEnd => "session end",
        };
        write!(f, "{}", s)
    }
}

/// Completed trade record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: Symbol,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn return_pct(&self) -> f64 {
        match self.side {
            Side::Buy => ((self.exit_price - self.entry_price) / self.entry_price) * 100.0,
            Side::Sell => ((self.entry_price - self.exit_price) / self.entry_price) * 100.0,
        }
    }
}

/// Aggregate statistics for a replayed session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub net_pnl: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl SessionMetrics {
    /// Summarize a set of completed trades
    pub fn from_trades(trades: &[Trade]) -> Self {
        if trades.is_empty() {
            return SessionMetrics::default();
        }

        let winners: Vec<&Trade> = trades.iter().filter(|t| t.pnl > 0.0).collect();
        let losers: Vec<&Trade> = trades.iter().filter(|t| t.pnl <= 0.0).collect();

        let gross_wins: f64 = winners.iter().map(|t| t.pnl).sum();
        let gross_losses: f64 = losers.iter().map(|t| t.pnl.abs()).sum();

        let avg_win = if winners.is_empty() {
            0.0
        } else {
            gross_wins / winners.len() as f64
        };
        let avg_loss = if losers.is_empty() {
            0.0
        } else {
            gross_losses / losers.len() as f64
        };

        SessionMetrics {
            net_pnl: trades.iter().map(|t| t.pnl).sum(),
            win_rate: (winners.len() as f64 / trades.len() as f64) * 100.0,
            total_trades: trades.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            avg_win,
            avg_loss,
            largest_win: winners.iter().map(|t| t.pnl).fold(0.0, f64::max),
            largest_loss: losers.iter().map(|t| t.pnl).fold(0.0, f64::min),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(pnl: f64) -> Trade {
        Trade {
            symbol: Symbol::new("SPY"),
            side: Side::Buy,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            quantity: 1.0,
            entry_time: Utc::now(),
            exit_time: Utc::now(),
            pnl,
            exit_reason: ExitReason::Signal,
        }
    }

    #[test]
    fn test_candle_validation() {
        let now = Utc::now();
        assert!(Candle::new(now, 10.0, 11.0, 9.0, 10.5, 100.0).is_ok());
        assert_eq!(
            Candle::new(now, 10.0, 9.0, 11.0, 10.5, 100.0),
            Err(CandleValidationError::HighBelowLow {
                high: 9.0,
                low: 11.0
            })
        );
        assert!(Candle::new(now, 10.0, 11.0, 9.0, 0.0, 100.0).is_err());
        assert!(Candle::new(now, 10.0, 11.0, 9.0, 10.5, -1.0).is_err());
    }

    #[test]
    fn test_trade_return_pct_by_side() {
        let mut t = trade(5.0);
        assert!((t.return_pct() - 5.0).abs() < 1e-9);
        t.side = Side::Sell;
        assert!((t.return_pct() + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_session_metrics() {
        let trades = vec![trade(10.0), trade(-4.0), trade(6.0)];
        let m = SessionMetrics::from_trades(&trades);

        assert_eq!(m.total_trades, 3);
        assert_eq!(m.winning_trades, 2);
        assert_eq!(m.losing_trades, 1);
        assert!((m.net_pnl - 12.0).abs() < 1e-9);
        assert!((m.avg_win - 8.0).abs() < 1e-9);
        assert!((m.avg_loss - 4.0).abs() < 1e-9);
        assert!((m.largest_win - 10.0).abs() < 1e-9);
        assert!((m.largest_loss + 4.0).abs() < 1e-9);
    }
}
