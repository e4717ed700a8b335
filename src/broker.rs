//! Broker seam and paper execution
//!
//! The hosted platform owns order routing and fill simulation; this module
//! defines the boundary the strategies talk through (`Broker`) plus a thin
//! in-process implementation used by the session replay and tests.
//!
//! `PaperBroker` is intentionally not an order-matching simulator: market
//! orders fill at the last seen price, resting orders fill whole against
//! each bar's range, there are no partial fills and no margin.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::{Candle, ExitReason, Side, Symbol, Trade};

/// Order ID type
pub type OrderId = u64;

static ORDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate next order ID (thread-safe, lock-free)
pub fn next_order_id() -> OrderId {
    ORDER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Broker-side order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Submitted,
    Filled,
    Canceled,
}

/// Notification pushed back to the algorithm when an order changes state
#[derive(Debug, Clone)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: f64,
    pub status: OrderStatus,
    pub fill_price: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("unknown order id {0}")]
    UnknownOrder(OrderId),
    #[error("no market price seen yet for {0}")]
    NoPrice(Symbol),
    #[error("order {0} does not carry stop/limit prices")]
    NotStopLimit(OrderId),
    #[error("invalid quantity {0}")]
    InvalidQuantity(f64),
}

/// The instruction surface the strategies and the session algorithm use.
///
/// A live implementation would forward these to the external engine; the
/// paper implementation below fills them in-process.
pub trait Broker {
    fn market_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
    ) -> Result<OrderId, BrokerError>;

    fn limit_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
        limit_price: f64,
    ) -> Result<OrderId, BrokerError>;

    fn stop_limit_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
        stop_price: f64,
        limit_price: f64,
    ) -> Result<OrderId, BrokerError>;

    /// Move the stop and limit prices of a resting stop-limit order
    fn update_stop_limit(
        &mut self,
        order_id: OrderId,
        stop_price: f64,
        limit_price: f64,
    ) -> Result<(), BrokerError>;

    fn cancel(&mut self, order_id: OrderId) -> Result<(), BrokerError>;

    /// Cancel every resting order for the symbol
    fn cancel_open_orders(&mut self, symbol: &Symbol);

    /// Close any open position at the market
    fn liquidate(&mut self, symbol: &Symbol, reason: ExitReason) -> Result<(), BrokerError>;

    fn is_invested(&self, symbol: &Symbol) -> bool;

    /// Signed position quantity (negative when short)
    fn position_qty(&self, symbol: &Symbol) -> f64;

    fn last_price(&self, symbol: &Symbol) -> Option<f64>;
}

#[derive(Debug, Clone, Copy)]
enum RestingKind {
    Limit { limit: f64 },
    StopLimit { stop: f64, limit: f64 },
}

#[derive(Debug, Clone)]
struct RestingOrder {
    id: OrderId,
    symbol: Symbol,
    side: Side,
    quantity: f64,
    kind: RestingKind,
}

#[derive(Debug, Clone)]
struct PaperPosition {
    side: Side,
    quantity: f64,
    entry_price: f64,
    entry_time: DateTime<Utc>,
}

/// In-memory broker for replay and tests
#[derive(Debug, Default)]
pub struct PaperBroker {
    last_prices: HashMap<Symbol, (f64, DateTime<Utc>)>,
    resting: Vec<RestingOrder>,
    positions: HashMap<Symbol, PaperPosition>,
    events: Vec<OrderEvent>,
    trades: Vec<Trade>,
}

impl PaperBroker {
    pub fn new() -> Self {
        PaperBroker::default()
    }

    /// Feed one bar: refresh the mark price and fill any triggered orders
    pub fn on_bar(&mut self, symbol: &Symbol, bar: &Candle) {
        self.last_prices
            .insert(symbol.clone(), (bar.close, bar.datetime));

        let triggered: Vec<RestingOrder> = self
            .resting
            .iter()
            .filter(|o| o.symbol == *symbol && Self::fill_price(o, bar).is_some())
            .cloned()
            .collect();

        for order in triggered {
            let price = match Self::fill_price(&order, bar) {
                Some(p) => p,
                None => continue,
            };
            self.resting.retain(|o| o.id != order.id);
            let reason = match order.kind {
                RestingKind::Limit { .. } => ExitReason::Signal,
                RestingKind::StopLimit { .. } => ExitReason::StopHit,
            };
            self.apply_fill(
                order.id,
                &order.symbol,
                order.side,
                order.quantity,
                price,
                bar.datetime,
                reason,
            );
        }
    }

    /// Fill rules against a bar's range: limit orders fill through the
    /// price, stops trigger when the range crosses the stop level.
    fn fill_price(order: &RestingOrder, bar: &Candle) -> Option<f64> {
        match (order.side, order.kind) {
            (Side::Buy, RestingKind::Limit { limit }) => (bar.low <= limit).then_some(limit),
            (Side::Sell, RestingKind::Limit { limit }) => (bar.high >= limit).then_some(limit),
            (Side::Sell, RestingKind::StopLimit { stop, .. }) => (bar.low <= stop).then_some(stop),
            (Side::Buy, RestingKind::StopLimit { stop, .. }) => (bar.high >= stop).then_some(stop),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_fill(
        &mut self,
        order_id: OrderId,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
        price: f64,
        timestamp: DateTime<Utc>,
        close_reason: ExitReason,
    ) {
        match self.positions.get(symbol).cloned() {
            Some(pos) if pos.side != side => {
                // Opposite-side fill closes the open position.
                let pnl = match pos.side {
                    Side::Buy => (price - pos.entry_price) * pos.quantity,
                    Side::Sell => (pos.entry_price - price) * pos.quantity,
                };
                self.trades.push(Trade {
                    symbol: symbol.clone(),
                    side: pos.side,
                    entry_price: pos.entry_price,
                    exit_price: price,
                    quantity: pos.quantity,
                    entry_time: pos.entry_time,
                    exit_time: timestamp,
                    pnl,
                    exit_reason: close_reason,
                });
                self.positions.remove(symbol);
                tracing::debug!(
                    %symbol,
                    exit_price = price,
                    pnl,
                    reason = %close_reason,
                    "position closed"
                );
            }
            Some(mut pos) => {
                // Same-side fill extends the position at a weighted price.
                let total = pos.quantity + quantity;
                pos.entry_price = (pos.entry_price * pos.quantity + price * quantity) / total;
                pos.quantity = total;
                self.positions.insert(symbol.clone(), pos);
            }
            None => {
                self.positions.insert(
                    symbol.clone(),
                    PaperPosition {
                        side,
                        quantity,
                        entry_price: price,
                        entry_time: timestamp,
                    },
                );
                tracing::debug!(%symbol, ?side, entry_price = price, quantity, "position opened");
            }
        }

        self.events.push(OrderEvent {
            order_id,
            symbol: symbol.clone(),
            side,
            quantity,
            status: OrderStatus::Filled,
            fill_price: Some(price),
            timestamp,
        });
    }

    /// Take accumulated order events, oldest first
    pub fn drain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn take_trades(&mut self) -> Vec<Trade> {
        std::mem::take(&mut self.trades)
    }

    pub fn open_order_count(&self, symbol: &Symbol) -> usize {
        self.resting.iter().filter(|o| o.symbol == *symbol).count()
    }

    fn mark(&self, symbol: &Symbol) -> Result<(f64, DateTime<Utc>), BrokerError> {
        self.last_prices
            .get(symbol)
            .copied()
            .ok_or_else(|| BrokerError::NoPrice(symbol.clone()))
    }
}

impl Broker for PaperBroker {
    fn market_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
    ) -> Result<OrderId, BrokerError> {
        if quantity <= 0.0 {
            return Err(BrokerError::InvalidQuantity(quantity));
        }
        let (price, timestamp) = self.mark(symbol)?;
        let id = next_order_id();
        self.apply_fill(
            id,
            symbol,
            side,
            quantity,
            price,
            timestamp,
            ExitReason::Signal,
        );
        Ok(id)
    }

    fn limit_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
        limit_price: f64,
    ) -> Result<OrderId, BrokerError> {
        if quantity <= 0.0 {
            return Err(BrokerError::InvalidQuantity(quantity));
        }
        let id = next_order_id();
        self.resting.push(RestingOrder {
            id,
            symbol: symbol.clone(),
            side,
            quantity,
            kind: RestingKind::Limit { limit: limit_price },
        });
        Ok(id)
    }

    fn stop_limit_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
        stop_price: f64,
        limit_price: f64,
    ) -> Result<OrderId, BrokerError> {
        if quantity <= 0.0 {
            return Err(BrokerError::InvalidQuantity(quantity));
        }
        let id = next_order_id();
        self.resting.push(RestingOrder {
            id,
            symbol: symbol.clone(),
            side,
            quantity,
            kind: RestingKind::StopLimit {
                stop: stop_price,
                limit: limit_price,
            },
        });
        Ok(id)
    }

    fn update_stop_limit(
        &mut self,
        order_id: OrderId,
        stop_price: f64,
        limit_price: f64,
    ) -> Result<(), BrokerError> {
        let order = self
            .resting
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(BrokerError::UnknownOrder(order_id))?;

        match &mut order.kind {
            RestingKind::StopLimit { stop, limit } => {
                *stop = stop_price;
                *limit = limit_price;
                Ok(())
            }
            RestingKind::Limit { .. } => Err(BrokerError::NotStopLimit(order_id)),
        }
    }

    fn cancel(&mut self, order_id: OrderId) -> Result<(), BrokerError> {
        let order = self
            .resting
            .iter()
            .position(|o| o.id == order_id)
            .ok_or(BrokerError::UnknownOrder(order_id))?;
        let order = self.resting.remove(order);
        let timestamp = self
            .last_prices
            .get(&order.symbol)
            .map(|(_, t)| *t)
            .unwrap_or_default();
        self.events.push(OrderEvent {
            order_id,
            symbol: order.symbol,
            side: order.side,
            quantity: order.quantity,
            status: OrderStatus::Canceled,
            fill_price: None,
            timestamp,
        });
        Ok(())
    }

    fn cancel_open_orders(&mut self, symbol: &Symbol) {
        let ids: Vec<OrderId> = self
            .resting
            .iter()
            .filter(|o| o.symbol == *symbol)
            .map(|o| o.id)
            .collect();
        for id in ids {
            // Ids were just collected from the book; cancel cannot fail.
            let _ = self.cancel(id);
        }
    }

    fn liquidate(&mut self, symbol: &Symbol, reason: ExitReason) -> Result<(), BrokerError> {
        let pos = match self.positions.get(symbol).cloned() {
            Some(p) => p,
            None => return Ok(()),
        };
        let (price, timestamp) = self.mark(symbol)?;
        let id = next_order_id();
        self.apply_fill(
            id,
            symbol,
            pos.side.opposite(),
            pos.quantity,
            price,
            timestamp,
            reason,
        );
        Ok(())
    }

    fn is_invested(&self, symbol: &Symbol) -> bool {
        self.positions.contains_key(symbol)
    }

    fn position_qty(&self, symbol: &Symbol) -> f64 {
        self.positions
            .get(symbol)
            .map(|p| match p.side {
                Side::Buy => p.quantity,
                Side::Sell => -p.quantity,
            })
            .unwrap_or(0.0)
    }

    fn last_price(&self, symbol: &Symbol) -> Option<f64> {
        self.last_prices.get(symbol).map(|(p, _)| *p)
    }
}
