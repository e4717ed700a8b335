//! MA Crossover Strategy Configuration

use serde::{Deserialize, Serialize};

/// MA Crossover Strategy Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossoverConfig {
    /// Daily SMA period for the trend filter
    pub sma_period: usize,
    /// Daily candles considered for the trailing high/low range
    pub lookback_days: usize,
    /// How close to the range extreme price must be, in percent
    pub proximity_percent: f64,
    /// Stop distance in percent of the entry price
    pub stop_percent: f64,
}

impl Default for MaCrossoverConfig {
    fn default() -> Self {
        MaCrossoverConfig {
            sma_period: 30,
            lookback_days: 252,
            proximity_percent: 5.0,
            stop_percent: 2.0,
        }
    }
}
