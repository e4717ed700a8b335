//! Universe selection and rebalancing

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use std::collections::BTreeSet;

use crate::Symbol;

use super::config::MomentumUniverseConfig;

/// One symbol's row in a daily universe snapshot
#[derive(Debug, Clone)]
pub struct UniverseEntry {
    pub symbol: Symbol,
    pub price: f64,
    pub dollar_volume: f64,
    pub market_cap: f64,
    pub has_fundamentals: bool,
}

/// Desired portfolio weight for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioTarget {
    pub symbol: Symbol,
    pub weight: f64,
}

/// Instructions produced by one rebalance
#[derive(Debug, Clone, Default)]
pub struct RebalancePlan {
    /// Symbols that left the universe and must be closed
    pub liquidate: Vec<Symbol>,
    /// Equal-weight targets over the new universe
    pub targets: Vec<PortfolioTarget>,
}

/// Two-stage universe filter: liquidity first, then fundamentals.
#[derive(Debug, Clone)]
pub struct UniverseSelector {
    config: MomentumUniverseConfig,
}

impl UniverseSelector {
    pub fn new(config: MomentumUniverseConfig) -> Self {
        UniverseSelector { config }
    }

    /// Coarse: highest dollar volume with a price floor and fundamental
    /// data. Fine: smallest positive market caps among the survivors.
    pub fn select(&self, universe: &[UniverseEntry]) -> Vec<Symbol> {
        let coarse: Vec<&UniverseEntry> = universe
            .iter()
            .filter(|e| e.price > self.config.min_price && e.has_fundamentals)
            .sorted_by(|a, b| {
                b.dollar_volume
                    .partial_cmp(&a.dollar_volume)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .take(self.config.coarse_size)
            .collect();

        coarse
            .into_iter()
            .filter(|e| e.market_cap > 0.0)
            .sorted_by(|a, b| {
                a.market_cap
                    .partial_cmp(&b.market_cap)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .take(self.config.fine_size)
            .map(|e| e.symbol.clone())
            .collect()
    }
}

/// Applies the selector on a fixed cadence and tracks the active set.
#[derive(Debug)]
pub struct MomentumRebalancer {
    selector: UniverseSelector,
    rebalance_days: i64,
    active: BTreeSet<Symbol>,
    next_rebalance: Option<DateTime<Utc>>,
}

impl MomentumRebalancer {
    pub fn new(config: MomentumUniverseConfig) -> Self {
        MomentumRebalancer {
            rebalance_days: config.rebalance_days,
            selector: UniverseSelector::new(config),
            active: BTreeSet::new(),
            next_rebalance: None,
        }
    }

    pub fn active_symbols(&self) -> Vec<Symbol> {
        self.active.iter().cloned().collect()
    }

    /// Feed one universe snapshot. Returns a plan when a rebalance is due,
    /// None between rebalances.
    pub fn on_universe(
        &mut self,
        now: DateTime<Utc>,
        universe: &[UniverseEntry],
    ) -> Option<RebalancePlan> {
        if let Some(next) = self.next_rebalance {
            if now < next {
                return None;
            }
        }
        self.next_rebalance = Some(now + Duration::days(self.rebalance_days));

        let selected: BTreeSet<Symbol> = self.selector.select(universe).into_iter().collect();

        let liquidate: Vec<Symbol> = self.active.difference(&selected).cloned().collect();

        self.active = selected;
        if self.active.is_empty() {
            tracing::warn!("universe selection produced no symbols");
            return Some(RebalancePlan {
                liquidate,
                targets: Vec::new(),
            });
        }

        let weight = 1.0 / self.active.len() as f64;
        let targets = self
            .active
            .iter()
            .map(|symbol| PortfolioTarget {
                symbol: symbol.clone(),
                weight,
            })
            .collect();

        tracing::info!(
            selected = self.active.len(),
            dropped = liquidate.len(),
            "universe rebalanced"
        );

        Some(RebalancePlan { liquidate, targets })
    }
}
