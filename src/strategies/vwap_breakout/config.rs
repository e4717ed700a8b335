//! VWAP Breakout Strategy Configuration

use serde::{Deserialize, Serialize};

/// VWAP Breakout Strategy Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VwapBreakoutConfig {
    /// Allow short entries on the mirrored condition
    pub allow_short: bool,

    /// Require an armed "broken candle" (a candle that straddled VWAP and
    /// closed above it) before taking the breakout
    pub require_broken_candle: bool,
    /// Seconds the broken candle must stay armed before an entry counts
    pub accumulate_positive_secs: i64,

    /// Distance between the stop and its limit on protective orders
    pub stop_limit_slack: f64,
}

impl Default for VwapBreakoutConfig {
    fn default() -> Self {
        VwapBreakoutConfig {
            allow_short: true,
            require_broken_candle: false,
            accumulate_positive_secs: 0,
            stop_limit_slack: 0.05,
        }
    }
}
