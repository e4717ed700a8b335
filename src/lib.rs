//! Intraday Trading Strategies
//!
//! Intraday equity strategies driven by a per-symbol trading state
//! machine: entry/stop anchors with a ratcheting risk step, rolling
//! consolidated price windows, a session-resetting VWAP, overnight-gap
//! trade gating and staged end-of-day liquidation (normal / to-win /
//! force).
//!
//! Strategies plug into a single trait and are driven bar by bar by the
//! session algorithm; the session replay runs recorded data against an
//! in-process paper broker.
//!
//! ## Example
//! ```no_run
//! use intraday_strategies::replay::SessionReplay;
//! use intraday_strategies::{data, strategies, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("configs/spy_vwap.json")?;
//!     let strategy = strategies::create_strategy(&config)?;
//!     let data = data::load_multi_symbol(
//!         &config.data.data_dir,
//!         &config.trading.symbols(),
//!         &config.data.timeframe,
//!     )?;
//!
//!     let mut replay = SessionReplay::new(config, strategy);
//!     let result = replay.run(data)?;
//!     println!("{} trades, net {:.2}", result.metrics.total_trades, result.metrics.net_pnl);
//!     Ok(())
//! }
//! ```

pub mod algorithm;
pub mod broker;
pub mod config;
pub mod consolidate;
pub mod data;
pub mod equity;
pub mod indicators;
pub mod replay;
pub mod risk;
pub mod session;
pub mod strategies;
pub mod types;
pub mod window;

pub use config::Config;
pub use strategies::Strategy;
pub use types::*;
