//! Universe-selection momentum
//!
//! Unlike the tick-driven strategies, this one works on daily universe
//! snapshots: a coarse liquidity filter feeds a fine fundamental filter,
//! and the surviving symbols are rebalanced into equal weights on a fixed
//! cadence. Dropped symbols are liquidated.

mod config;
mod selector;

pub use config::MomentumUniverseConfig;
pub use selector::{
    MomentumRebalancer, PortfolioTarget, RebalancePlan, UniverseEntry, UniverseSelector,
};
