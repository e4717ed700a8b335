//! Gap Reversal Strategy Configuration

use serde::{Deserialize, Serialize};

/// Gap Reversal Strategy Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GapReversalConfig {
    /// Overnight gap (percent of previous close) that triggers a fade
    pub gap_percent: f64,
    /// Minute after the open on which the gap is evaluated
    pub entry_minute: u32,
    /// Minutes before the close when the position is flattened
    pub exit_minutes_before_close: u32,
    /// Stop distance in percent of the entry price
    pub stop_percent: f64,
}

impl Default for GapReversalConfig {
    fn default() -> Self {
        GapReversalConfig {
            gap_percent: 1.0,
            entry_minute: 1,
            exit_minutes_before_close: 15,
            stop_percent: 1.0,
        }
    }
}
