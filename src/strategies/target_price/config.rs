//! Target Price Strategy Configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One day's planned entry bands for a symbol.
/// A long enters inside the buy band, a short inside the sell band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DailyTargets {
    pub buy_low: f64,
    pub buy_high: f64,
    pub sell_low: f64,
    pub sell_high: f64,
}

/// Target Price Strategy Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetPriceConfig {
    /// Symbol -> one entry per trading day, consumed in order
    pub targets: HashMap<String, Vec<DailyTargets>>,
    /// Distance between the stop and its limit on protective orders
    pub stop_limit_slack: f64,
}

impl Default for TargetPriceConfig {
    fn default() -> Self {
        TargetPriceConfig {
            targets: HashMap::new(),
            stop_limit_slack: 0.05,
        }
    }
}
