//! Intraday session algorithm
//!
//! The generalized per-bar handler every strategy runs under. One tick
//! flows through the same gates the source scripts applied in `OnData`:
//! day roll and gap update, session liquidation (ToWin/Force), readiness
//! and spacing checks, stop ratcheting, then entry evaluation with
//! risk-based sizing and a protective stop-limit.

use anyhow::Result;
use std::collections::HashMap;

use crate::broker::{Broker, BrokerError, OrderEvent, OrderStatus};
use crate::config::Config;
use crate::consolidate::{BarConsolidator, DailyConsolidator};
use crate::equity::{EquityBook, TradeState};
use crate::risk::RiskManager;
use crate::session::{LiquidateState, SessionClock, SessionEvent};
use crate::strategies::{Strategy, StrategyContext};
use crate::{Candle, ExitReason, Side, Symbol};

struct SymbolConsolidators {
    minute: BarConsolidator,
    low: BarConsolidator,
    daily: DailyConsolidator,
}

/// Drives one strategy over a set of symbols through a broker.
pub struct IntradayAlgorithm {
    config: Config,
    session: SessionClock,
    book: EquityBook,
    risk: RiskManager,
    strategy: Box<dyn Strategy>,
    consolidators: HashMap<Symbol, SymbolConsolidators>,
}

impl IntradayAlgorithm {
    pub fn new(config: Config, mut strategy: Box<dyn Strategy>) -> Self {
        let session = SessionClock::new(
            config.session.market_hours(),
            config.session.buy_cutoff_minutes,
            config.session.to_win_minutes,
            config.session.force_minutes,
        );

        let mut book = EquityBook::new(config.trading.max_trades_per_day);
        let mut consolidators = HashMap::new();
        for symbol in config.trading.symbols() {
            book.add_equity(TradeState::new(
                symbol.clone(),
                config.session.gap_percent_to_trade,
                config.session.window_spec(),
            ));
            consolidators.insert(
                symbol,
                SymbolConsolidators {
                    minute: BarConsolidator::new(config.session.consolidate_seconds),
                    low: BarConsolidator::new(config.session.low_price_seconds),
                    daily: DailyConsolidator::new(),
                },
            );
        }

        let risk = RiskManager::new(config.trading.risk_per_trade);
        strategy.init();

        IntradayAlgorithm {
            config,
            session,
            book,
            risk,
            strategy,
            consolidators,
        }
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.book.symbols()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Handle one bar for one symbol.
    pub fn on_bar(&mut self, broker: &mut dyn Broker, symbol: &Symbol, bar: &Candle) -> Result<()> {
        let events = self.session.advance(bar.datetime);
        if !events.is_empty() {
            self.apply_session_events(broker, &events);
        }

        if !self.book.contains(symbol) {
            return Ok(());
        }

        self.consume_bar(symbol, bar);

        // Mandatory liquidation ahead of everything else.
        if self.check_session_liquidation(broker, symbol, bar)? {
            return Ok(());
        }

        if self.should_ignore_tick(symbol, bar) {
            return Ok(());
        }

        self.expire_stale_entry(broker, symbol, bar)?;

        // Profit-target exit for strategies that carry one.
        if self.check_win_target(broker, symbol, bar)? {
            return Ok(());
        }

        self.ratchet_stop(broker, symbol, bar)?;

        self.dispatch_signal(broker, symbol, bar)?;

        Ok(())
    }

    /// Route broker notifications into the per-symbol state.
    pub fn on_order_event(&mut self, broker: &mut dyn Broker, event: &OrderEvent) {
        let mut protect_side: Option<Side> = None;

        if let Some(state) = self.book.get_mut(&event.symbol) {
            if state.exit_order == Some(event.order_id)
                && matches!(event.status, OrderStatus::Filled | OrderStatus::Canceled)
            {
                state.exit_order = None;
                if event.status == OrderStatus::Filled {
                    state.set_last_trade_time(event.timestamp);
                    state.reset_trade_prices();
                }
            } else if state.entry_order == Some(event.order_id) {
                match event.status {
                    OrderStatus::Filled => {
                        state.entry_order = None;
                        protect_side = Some(event.side);
                    }
                    OrderStatus::Canceled => {
                        state.entry_order = None;
                        state.reset_trade_prices();
                    }
                    OrderStatus::Submitted => {}
                }
            }
        }

        if let Some(side) = protect_side {
            if let Err(e) = self.place_protective_stop(broker, &event.symbol, side) {
                tracing::warn!(symbol = %event.symbol, error = %e, "protective stop failed");
            }
        }

        self.strategy.notify_order(event);
    }

    fn apply_session_events(&mut self, broker: &mut dyn Broker, events: &[SessionEvent]) {
        for event in events {
            match event {
                SessionEvent::MarketClosed => {
                    for symbol in self.book.symbols() {
                        broker.cancel_open_orders(&symbol);
                        if let Some(state) = self.book.get_mut(&symbol) {
                            // The state's own last price, not the broker
                            // mark: a day-roll close fires while the next
                            // day's bar is already the broker's mark.
                            if let Some(price) = state.last_price {
                                state.last_day_close = Some(price);
                            }
                            state.entry_order = None;
                            state.reset_trade_prices();
                        }
                    }
                    tracing::debug!("market closed, open orders cancelled");
                }
                SessionEvent::DayStarted => {
                    self.book.reset_daily_register();
                    self.strategy.on_day_start();
                    for state in self.book.states_mut() {
                        state.reset_for_day();
                    }
                    for cons in self.consolidators.values_mut() {
                        cons.minute.reset();
                        cons.low.reset();
                    }
                }
                SessionEvent::MarketOpened => {
                    tracing::debug!("market opened");
                }
                SessionEvent::BuyCutoff => {
                    tracing::debug!("entry window closed for the day");
                }
                SessionEvent::ToWin => {
                    tracing::debug!("liquidate-to-win window entered");
                }
                SessionEvent::ForceLiquidate => {
                    tracing::debug!("force-liquidation window entered");
                }
            }
        }
    }

    fn consume_bar(&mut self, symbol: &Symbol, bar: &Candle) {
        let cons = match self.consolidators.get_mut(symbol) {
            Some(c) => c,
            None => return,
        };
        let minute_candle = cons.minute.update(bar);
        let low_candle = cons.low.update(bar);
        let daily_candle = cons.daily.update(bar);

        let state = match self.book.get_mut(symbol) {
            Some(s) => s,
            None => return,
        };

        if state.day_open.is_none() {
            state.update_gap_allowance(bar.open);
        }
        state.last_price = Some(bar.close);
        state.vwap.update(bar);

        if let Some(candle) = minute_candle {
            state.observe_minute_candle(candle);
        }
        if let Some(candle) = low_candle {
            state.observe_low_candle(candle);
        }
        if let Some(candle) = daily_candle {
            state.observe_daily_candle(candle);
        }
    }

    /// ToWin and Force exits near the close. Returns true when the tick is
    /// consumed by a liquidation.
    fn check_session_liquidation(
        &mut self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        bar: &Candle,
    ) -> Result<bool> {
        if !broker.is_invested(symbol) {
            return Ok(false);
        }

        let reason = match self.session.liquidate_state() {
            LiquidateState::Force => Some(ExitReason::LiquidateForce),
            LiquidateState::ToWin => {
                let entry = self.book.get(symbol).and_then(|s| s.last_entry_price);
                // Win or break-even only: exit once price is back at entry
                // (at or below it for shorts).
                let qty = broker.position_qty(symbol);
                match entry {
                    Some(entry)
                        if (qty > 0.0 && bar.close >= entry)
                            || (qty < 0.0 && bar.close <= entry) =>
                    {
                        Some(ExitReason::LiquidateToWin)
                    }
                    _ => None,
                }
            }
            LiquidateState::Normal => None,
        };

        if let Some(reason) = reason {
            self.liquidate(broker, symbol, bar, reason)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn liquidate(
        &mut self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        bar: &Candle,
        reason: ExitReason,
    ) -> Result<()> {
        broker.cancel_open_orders(symbol);
        broker.liquidate(symbol, reason)?;
        if let Some(state) = self.book.get_mut(symbol) {
            state.entry_order = None;
            state.reset_trade_prices();
            state.set_last_trade_time(bar.datetime);
        }
        tracing::info!(%symbol, %reason, "liquidated");
        Ok(())
    }

    /// The skip gates from the scripts' `ShouldIgnoreOnDataEvent`.
    fn should_ignore_tick(&self, symbol: &Symbol, bar: &Candle) -> bool {
        let state = match self.book.get(symbol) {
            Some(s) => s,
            None => return true,
        };
        if !state.allowed_by_gap {
            return true;
        }
        if !self.session.in_trading_window() {
            return true;
        }
        if !state.is_ready() {
            return true;
        }
        if let Some(secs) = state.seconds_since_last_trade(bar.datetime) {
            if secs < self.config.session.time_between_trades_secs {
                return true;
            }
        }
        false
    }

    fn expire_stale_entry(
        &mut self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        bar: &Candle,
    ) -> Result<()> {
        let entry_order = match self.book.get(symbol).and_then(|s| s.entry_order) {
            Some(id) => id,
            None => return Ok(()),
        };

        let expired = match self.context(symbol, broker, bar) {
            Some(ctx) => self.strategy.entry_expired(&ctx),
            None => false,
        };

        if expired || !self.session.entries_allowed() {
            match broker.cancel(entry_order) {
                Ok(()) | Err(BrokerError::UnknownOrder(_)) => {}
                Err(e) => return Err(e.into()),
            }
            if let Some(state) = self.book.get_mut(symbol) {
                state.entry_order = None;
                state.reset_trade_prices();
            }
            tracing::debug!(%symbol, "stale entry order cancelled");
        }
        Ok(())
    }

    fn check_win_target(
        &mut self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        bar: &Candle,
    ) -> Result<bool> {
        if !broker.is_invested(symbol) {
            return Ok(false);
        }
        let win = match self.book.get(symbol).and_then(|s| s.win_exit_price) {
            Some(w) => w,
            None => return Ok(false),
        };
        let hit = if broker.position_qty(symbol) > 0.0 {
            bar.close >= win
        } else {
            bar.close <= win
        };
        if hit {
            self.liquidate(broker, symbol, bar, ExitReason::TargetHit)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn ratchet_stop(
        &mut self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        bar: &Candle,
    ) -> Result<()> {
        let exit_order = match self.book.get(symbol).and_then(|s| s.exit_order) {
            Some(id) => id,
            None => return Ok(()),
        };
        if !broker.is_invested(symbol) {
            return Ok(());
        }

        let adjustment = self
            .context(symbol, broker, bar)
            .and_then(|ctx| self.strategy.update_stop(&ctx));

        if let Some(adj) = adjustment {
            match broker.update_stop_limit(exit_order, adj.stop_price, adj.limit_price) {
                Ok(()) => {
                    if let Some(state) = self.book.get_mut(symbol) {
                        state.last_entry_price = Some(adj.entry_anchor);
                    }
                    tracing::debug!(%symbol, stop = adj.stop_price, "stop ratcheted");
                }
                // The stop filled on this very bar; the order event already
                // cleared the state.
                Err(BrokerError::UnknownOrder(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn dispatch_signal(
        &mut self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        bar: &Candle,
    ) -> Result<()> {
        let invested_side = Self::invested_side(broker, symbol);

        let signal = match self.context(symbol, broker, bar) {
            Some(ctx) => self.strategy.generate_signal(&ctx),
            None => return Ok(()),
        };

        match (signal.side(), invested_side) {
            // Hold.
            (Some(signal_side), Some(open_side)) if signal_side == open_side => {}
            // Flat while invested: exit.
            (None, Some(_)) => {
                self.liquidate(broker, symbol, bar, ExitReason::Signal)?;
            }
            // Opposite direction while invested: flip, but only when a new
            // entry is actually possible. Otherwise keep holding.
            (Some(signal_side), Some(_)) => {
                if self.can_enter(symbol) {
                    self.liquidate(broker, symbol, bar, ExitReason::Signal)?;
                    self.try_enter(broker, symbol, bar, signal_side)?;
                }
            }
            // Fresh entry.
            (Some(signal_side), None) => {
                self.try_enter(broker, symbol, bar, signal_side)?;
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Entries require the session window, daily capacity, and no other
    /// working entry order.
    fn can_enter(&self, symbol: &Symbol) -> bool {
        self.session.entries_allowed()
            && self.book.entry_capacity_left(symbol)
            && self.book.get(symbol).and_then(|s| s.entry_order).is_none()
    }

    fn try_enter(
        &mut self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        bar: &Candle,
        side: Side,
    ) -> Result<()> {
        if !self.can_enter(symbol) {
            return Ok(());
        }

        let levels = self
            .context(symbol, broker, bar)
            .and_then(|ctx| self.strategy.entry_levels(&ctx, side));
        let levels = match levels {
            Some(l) => l,
            None => return Ok(()),
        };

        let step = levels.risk_step();
        let quantity = self.risk.position_size_for_step(step);
        if quantity <= 0.0 {
            return Ok(());
        }

        let order_id = self
            .strategy
            .place_entry(broker, symbol, side, quantity, &levels)?;

        if let Some(state) = self.book.get_mut(symbol) {
            state.last_entry_price = Some(levels.entry_price);
            state.last_stop_entry_price = Some(levels.stop_price);
            state.risk_step = Some(step);
            state.win_exit_price = levels.win_price;
            state.set_last_trade_time(bar.datetime);
        }
        self.book.register_entry(symbol);

        tracing::info!(
            %symbol,
            ?side,
            entry = levels.entry_price,
            stop = levels.stop_price,
            quantity,
            strategy = self.strategy.name(),
            "entry placed"
        );

        // Market entries are in a position already; protect them now.
        // Resting limit entries get their stop when the fill arrives.
        if broker.is_invested(symbol) {
            self.place_protective_stop(broker, symbol, side)?;
        } else if let Some(state) = self.book.get_mut(symbol) {
            state.entry_order = Some(order_id);
        }

        Ok(())
    }

    fn place_protective_stop(
        &mut self,
        broker: &mut dyn Broker,
        symbol: &Symbol,
        side: Side,
    ) -> Result<(), BrokerError> {
        if !self.strategy.uses_protective_stop() {
            return Ok(());
        }
        let stop = match self.book.get(symbol).and_then(|s| s.last_stop_entry_price) {
            Some(s) => s,
            None => return Ok(()),
        };
        let quantity = broker.position_qty(symbol).abs();
        if quantity <= 0.0 {
            return Ok(());
        }

        let slack = self.strategy.stop_limit_slack();
        let (exit_side, limit) = match side {
            Side::Buy => (Side::Sell, stop - slack),
            Side::Sell => (Side::Buy, stop + slack),
        };
        let id = broker.stop_limit_order(symbol, exit_side, quantity, stop, limit)?;
        if let Some(state) = self.book.get_mut(symbol) {
            state.exit_order = Some(id);
        }
        Ok(())
    }

    fn invested_side(broker: &dyn Broker, symbol: &Symbol) -> Option<Side> {
        let qty = broker.position_qty(symbol);
        if qty > 0.0 {
            Some(Side::Buy)
        } else if qty < 0.0 {
            Some(Side::Sell)
        } else {
            None
        }
    }

    fn context<'a>(
        &'a self,
        symbol: &'a Symbol,
        broker: &dyn Broker,
        bar: &Candle,
    ) -> Option<StrategyContext<'a>> {
        Some(StrategyContext {
            symbol,
            state: self.book.get(symbol)?,
            price: bar.close,
            timestamp: bar.datetime,
            session: &self.session,
            invested_side: Self::invested_side(broker, symbol),
        })
    }
}
