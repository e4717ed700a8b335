//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files. The strategy
//! section is kept as raw JSON and deserialized by whichever strategy the
//! registry instantiates.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::equity::WindowSpec;
use crate::session::MarketHours;
use crate::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default = "default_strategy_name")]
    pub strategy_name: String,
    #[serde(default = "default_strategy_section")]
    pub strategy: serde_json::Value,
    #[serde(default)]
    pub data: DataConfig,
}

fn default_strategy_name() -> String {
    "vwap_breakout".to_string()
}

fn default_strategy_section() -> serde_json::Value {
    serde_json::json!({})
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            session: SessionConfig::default(),
            trading: TradingConfig::default(),
            strategy_name: default_strategy_name(),
            strategy: default_strategy_section(),
            data: DataConfig::default(),
        }
    }
}

fn default_market_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap()
}

fn default_market_close() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap()
}

/// Session timing and gating configuration.
/// All second-valued fields are in seconds, minute-valued in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(default = "default_market_open")]
    pub market_open: NaiveTime,
    #[serde(default = "default_market_close")]
    pub market_close: NaiveTime,

    /// Period of the trading candle window
    pub consolidate_seconds: u64,
    /// Period of the low-price candle window used for stop placement
    pub low_price_seconds: u64,
    /// Minimum spacing between trades on the same symbol
    pub time_between_trades_secs: i64,

    /// Minutes before close when new entries stop
    pub buy_cutoff_minutes: u32,
    /// Minutes before close when positions exit on the first non-losing tick
    pub to_win_minutes: u32,
    /// Minutes before close when positions exit unconditionally
    pub force_minutes: u32,

    /// Overnight gap (percent of open) that must be exceeded to trade the day
    pub gap_percent_to_trade: f64,

    /// Consolidated trading candles kept per symbol
    pub minute_window: usize,
    /// Low-price candles kept per symbol
    pub low_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            market_open: default_market_open(),
            market_close: default_market_close(),
            consolidate_seconds: 60,
            low_price_seconds: 60,
            time_between_trades_secs: 60,
            buy_cutoff_minutes: 10,
            to_win_minutes: 10,
            force_minutes: 5,
            gap_percent_to_trade: 0.0,
            minute_window: 2,
            low_window: 1,
        }
    }
}

impl SessionConfig {
    pub fn market_hours(&self) -> MarketHours {
        MarketHours {
            open: self.market_open,
            close: self.market_close,
        }
    }

    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec {
            minute_window: self.minute_window,
            low_window: self.low_window,
            ..WindowSpec::default()
        }
    }
}

/// Trading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub symbols: Vec<String>,
    /// Currency amount risked per trade
    pub risk_per_trade: f64,
    /// None = unlimited entries per symbol per day
    #[serde(default)]
    pub max_trades_per_day: Option<u32>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            symbols: vec!["SPY".to_string(), "QQQ".to_string()],
            risk_per_trade: 200.0,
            max_trades_per_day: None,
        }
    }
}

impl TradingConfig {
    pub fn symbols(&self) -> Vec<Symbol> {
        self.symbols.iter().map(Symbol::new).collect()
    }
}

/// Data file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: String,
    /// Timeframe token used in data file names, e.g. `1m` in `SPY_1m.csv`
    pub timeframe: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: "data".to_string(),
            timeframe: "1m".to_string(),
        }
    }
}
