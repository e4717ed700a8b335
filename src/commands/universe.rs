//! Universe command implementation
//!
//! Runs the momentum universe rebalancer over daily snapshot data and
//! prints each rebalance plan.

use anyhow::Result;
use chrono::{DateTime, Utc};
use intraday_strategies::strategies::momentum_universe::{
    MomentumRebalancer, MomentumUniverseConfig,
};
use intraday_strategies::{data, Config};
use tracing::info;

pub fn run(snapshots_path: String, config_path: Option<String>) -> Result<()> {
    info!("Starting universe rebalance run");

    let universe_config: MomentumUniverseConfig = match config_path {
        Some(path) => {
            let config = Config::from_file(&path)?;
            serde_json::from_value(config.strategy.clone())
                .map_err(|e| anyhow::anyhow!("Failed to parse momentum_universe config: {}", e))?
        }
        None => MomentumUniverseConfig::default(),
    };

    let snapshots = data::load_universe_snapshots(&snapshots_path)?;
    if snapshots.is_empty() {
        anyhow::bail!("No universe snapshots found in {}", snapshots_path);
    }

    let mut rebalancer = MomentumRebalancer::new(universe_config);
    let mut rebalances = 0usize;

    println!("\n{}", "=".repeat(60));
    println!("UNIVERSE REBALANCES");
    println!("{}", "=".repeat(60));

    for (date, entries) in &snapshots {
        let timestamp: DateTime<Utc> = date
            .and_hms_opt(0, 0, 0)
            .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc))
            .ok_or_else(|| anyhow::anyhow!("Invalid snapshot date: {}", date))?;

        if let Some(plan) = rebalancer.on_universe(timestamp, entries) {
            rebalances += 1;
            println!("{}", date.format("%Y-%m-%d"));
            if !plan.liquidate.is_empty() {
                let dropped: Vec<&str> = plan.liquidate.iter().map(|s| s.as_str()).collect();
                println!("  liquidate: {}", dropped.join(", "));
            }
            for target in &plan.targets {
                println!("  {:<8} weight {:.2}%", target.symbol, target.weight * 100.0);
            }
        }
    }

    println!("{}", "-".repeat(60));
    println!("Snapshot days:      {}", snapshots.len());
    println!("Rebalances:         {}", rebalances);
    let active: Vec<String> = rebalancer
        .active_symbols()
        .iter()
        .map(|s| s.to_string())
        .collect();
    println!("Final universe:     {}", active.join(", "));
    println!("{}", "=".repeat(60));

    info!("Universe run completed");
    Ok(())
}
