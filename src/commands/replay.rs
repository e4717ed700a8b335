//! Replay command implementation

use anyhow::Result;
use intraday_strategies::replay::SessionReplay;
use intraday_strategies::{data, strategies, Config};
use tracing::{debug, info};

pub fn run(
    config_path: String,
    strategy_override: Option<String>,
    risk_override: Option<f64>,
    start: Option<String>,
    end: Option<String>,
) -> Result<()> {
    info!("Starting session replay");

    let mut config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    if let Some(strategy) = strategy_override {
        info!("Overriding strategy to: {}", strategy);
        config.strategy_name = strategy;
    }
    if let Some(risk) = risk_override {
        info!("Overriding risk per trade to: {:.2}", risk);
        config.trading.risk_per_trade = risk;
    }

    let start = start.map(|s| data::parse_date(&s)).transpose()?;
    let end = end.map(|s| data::parse_date(&s)).transpose()?;

    info!("Loading data from: {}", config.data.data_dir);
    let symbols = config.trading.symbols();
    debug!("Symbols: {:?}", symbols);

    let candles = data::load_multi_symbol_with_range(
        &config.data.data_dir,
        &symbols,
        &config.data.timeframe,
        start,
        end,
    )?;
    info!("Loaded data for {} symbols", candles.len());

    info!("Creating strategy: {}", config.strategy_name);
    let strategy = strategies::create_strategy(&config)?;

    let mut replay = SessionReplay::new(config, strategy);
    let result = replay.run(candles)?;

    let m = &result.metrics;
    println!("\n{}", "=".repeat(60));
    println!("REPLAY RESULTS ({})", replay.strategy_name());
    println!("{}", "=".repeat(60));
    println!("Net PnL:            {:.2}", m.net_pnl);
    println!("Win Rate:           {:.2}%", m.win_rate);
    println!("Total Trades:       {}", m.total_trades);
    println!("Winning Trades:     {}", m.winning_trades);
    println!("Losing Trades:      {}", m.losing_trades);
    println!("Average Win:        {:.2}", m.avg_win);
    println!("Average Loss:       {:.2}", m.avg_loss);
    println!("Largest Win:        {:.2}", m.largest_win);
    println!("Largest Loss:       {:.2}", m.largest_loss);
    println!("{}", "-".repeat(60));

    for trade in &result.trades {
        println!(
            "{}  {:<6} {:>4?} qty {:>8.0} in {:>9.2} out {:>9.2} pnl {:>9.2}  ({})",
            trade.exit_time.format("%Y-%m-%d %H:%M"),
            trade.symbol,
            trade.side,
            trade.quantity,
            trade.entry_price,
            trade.exit_price,
            trade.pnl,
            trade.exit_reason
        );
    }
    println!("{}", "=".repeat(60));

    info!("Replay completed successfully");
    Ok(())
}
