//! Session replay
//!
//! Feeds recorded candles through the algorithm against the paper broker.
//! This is the driver the tests and the CLI use to exercise a strategy;
//! the real feed and execution belong to the hosted trading platform.

use anyhow::Result;
use std::collections::HashMap;

use crate::algorithm::IntradayAlgorithm;
use crate::broker::{Broker, PaperBroker};
use crate::config::Config;
use crate::strategies::Strategy;
use crate::{Candle, ExitReason, SessionMetrics, Symbol, Trade};

/// Outcome of one replay run
#[derive(Debug)]
pub struct ReplayResult {
    pub trades: Vec<Trade>,
    pub metrics: SessionMetrics,
}

/// Replays candle series in timestamp order through one strategy.
pub struct SessionReplay {
    algorithm: IntradayAlgorithm,
    broker: PaperBroker,
}

impl SessionReplay {
    pub fn new(config: Config, strategy: Box<dyn Strategy>) -> Self {
        SessionReplay {
            algorithm: IntradayAlgorithm::new(config, strategy),
            broker: PaperBroker::new(),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.algorithm.strategy_name()
    }

    /// Run the full feed. Bars across symbols are interleaved by
    /// timestamp so session events fire exactly once per threshold.
    pub fn run(&mut self, data: HashMap<Symbol, Vec<Candle>>) -> Result<ReplayResult> {
        let mut merged: Vec<(Symbol, Candle)> = data
            .into_iter()
            .flat_map(|(symbol, candles)| {
                candles.into_iter().map(move |c| (symbol.clone(), c))
            })
            .collect();
        merged.sort_by(|a, b| a.1.datetime.cmp(&b.1.datetime).then_with(|| a.0.cmp(&b.0)));

        tracing::info!(
            bars = merged.len(),
            strategy = self.algorithm.strategy_name(),
            "replay started"
        );

        for (symbol, bar) in &merged {
            self.broker.on_bar(symbol, bar);
            self.process_order_events();

            self.algorithm.on_bar(&mut self.broker, symbol, bar)?;
            self.process_order_events();
        }

        // Flatten whatever survived the feed.
        for symbol in self.algorithm.symbols() {
            self.broker.cancel_open_orders(&symbol);
            self.broker.liquidate(&symbol, ExitReason::SessionEnd)?;
        }
        self.process_order_events();

        let trades = self.broker.take_trades();
        let metrics = SessionMetrics::from_trades(&trades);

        tracing::info!(
            trades = metrics.total_trades,
            net_pnl = metrics.net_pnl,
            "replay finished"
        );

        Ok(ReplayResult { trades, metrics })
    }

    fn process_order_events(&mut self) {
        for event in self.broker.drain_events() {
            self.algorithm.on_order_event(&mut self.broker, &event);
        }
    }
}
