//! Opening Range Strategy Configuration

use serde::{Deserialize, Serialize};

/// Opening Range Strategy Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningRangeConfig {
    /// Minutes after the open during which entries may trigger
    pub entry_window_minutes: u32,
    /// Profit target as a multiple of the entry risk step
    pub win_multiple: f64,
    /// Ticks added above the breakout price on the entry limit order
    pub limit_offset: f64,
    /// Distance between the stop and its limit on protective orders
    pub stop_limit_slack: f64,
}

impl Default for OpeningRangeConfig {
    fn default() -> Self {
        OpeningRangeConfig {
            entry_window_minutes: 30,
            win_multiple: 2.0,
            limit_offset: 0.01,
            stop_limit_slack: 0.05,
        }
    }
}
