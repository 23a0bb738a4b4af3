//! Simulated execution engine
//!
//! `ExecutionClient` is the full, fixed interface every execution engine must
//! satisfy; components never probe for optional capabilities. `PaperBroker`
//! is the in-process implementation: market orders fill instantly at the last
//! known price, money and position state are authoritative here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::oms::types::{Order, OrderId, OrderState};
use crate::{Side, Statistics, Symbol, TradeRecord};

/// Submission failure reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderRejected {
    #[error("not connected to execution engine")]
    NotConnected,
}

/// Execution-engine-owned position record; the authoritative source of truth
/// for whether a fill occurred
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u32,
    pub entry_price: f64,
    pub unrealized_pnl: f64,
}

impl BrokerPosition {
    fn update_pnl(&mut self, current_price: f64, point_value: f64) {
        let per_point = self.quantity as f64 * point_value;
        self.unrealized_pnl = match self.side {
            Side::Buy => (current_price - self.entry_price) * per_point,
            Side::Sell => (self.entry_price - current_price) * per_point,
        };
    }
}

/// Fixed interface between the strategy/execution layers. Every
/// implementation must answer every query; there is no optional capability
/// surface.
pub trait ExecutionClient {
    fn connect(&mut self) -> bool;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;

    /// Record the latest traded price for a symbol; refreshes unrealized P&L
    fn update_market_price(&mut self, symbol: &Symbol, price: f64, timestamp: DateTime<Utc>);

    /// Submit a market order. Acceptance does not imply a fill: with no known
    /// price the order stays `Submitted` and is never retried internally.
    fn submit_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: u32,
    ) -> Result<OrderId, OrderRejected>;

    fn order_state(&self, id: OrderId) -> OrderState;
    fn position(&self, symbol: &Symbol) -> Option<&BrokerPosition>;
    fn has_open_position(&self) -> bool;

    fn account_balance(&self) -> f64;
    /// Realized P&L today plus unrealized P&L of open positions
    fn daily_pnl(&self) -> f64;
    /// Count of order fills today (entry and exit fills both count)
    fn trades_today(&self) -> u32;
    fn reset_daily_stats(&mut self);

    fn trade_history(&self) -> &[TradeRecord];
    fn statistics(&self) -> Statistics;
}

/// Paper trading broker for simulation and testing
pub struct PaperBroker {
    point_value: f64,
    balance: f64,
    connected: bool,
    last_prices: HashMap<Symbol, (f64, DateTime<Utc>)>,
    orders: HashMap<OrderId, Order>,
    positions: HashMap<Symbol, BrokerPosition>,
    trade_history: Vec<TradeRecord>,
    daily_realized: f64,
    trades_today: u32,
}

impl PaperBroker {
    pub fn new(initial_balance: f64, point_value: f64) -> Self {
        PaperBroker {
            point_value,
            balance: initial_balance,
            connected: false,
            last_prices: HashMap::new(),
            orders: HashMap::new(),
            positions: HashMap::new(),
            trade_history: Vec::new(),
            daily_realized: 0.0,
            trades_today: 0,
        }
    }

    fn fill_order(&mut self, id: OrderId) {
        let Some(order) = self.orders.get(&id) else {
            return;
        };
        let symbol = order.symbol.clone();
        let side = order.side;
        let quantity = order.quantity;

        let Some(&(fill_price, fill_time)) = self.last_prices.get(&symbol) else {
            warn!("No price data for {}, order {} left unfilled", symbol, id);
            return;
        };

        if let Some(order) = self.orders.get_mut(&id) {
            order.filled_price = Some(fill_price);
            order.state = OrderState::Filled;
        }
        self.trades_today += 1;
        info!("Order {} filled at {:.2}", id, fill_price);

        self.apply_fill(symbol, side, quantity, fill_price, fill_time);
    }

    fn apply_fill(
        &mut self,
        symbol: Symbol,
        side: Side,
        quantity: u32,
        price: f64,
        timestamp: DateTime<Utc>,
    ) {
        match self.positions.get_mut(&symbol) {
            Some(position) if position.side != side => {
                if quantity >= position.quantity {
                    // Full close; any excess quantity is ignored under the
                    // single-bracket design
                    let pnl = realized_pnl(position, price, self.point_value);
                    self.balance += pnl;
                    self.daily_realized += pnl;

                    info!("Position closed: {}, P&L: {:.2}", symbol, pnl);

                    self.trade_history.push(TradeRecord {
                        symbol: symbol.clone(),
                        side: position.side,
                        quantity: position.quantity,
                        entry_price: position.entry_price,
                        exit_price: price,
                        pnl,
                        closed_at: timestamp,
                    });
                    self.positions.remove(&symbol);
                } else {
                    position.quantity -= quantity;
                    position.update_pnl(price, self.point_value);
                }
            }
            Some(position) => {
                // Same direction: quantity-weighted average entry
                let prev_value = position.entry_price * position.quantity as f64;
                let new_value = price * quantity as f64;
                let total = position.quantity + quantity;
                position.entry_price = (prev_value + new_value) / total as f64;
                position.quantity = total;
                position.update_pnl(price, self.point_value);
            }
            None => {
                let position = BrokerPosition {
                    symbol: symbol.clone(),
                    side,
                    quantity,
                    entry_price: price,
                    unrealized_pnl: 0.0,
                };
                info!(
                    "Position opened: {} {:?} {} @ {:.2}",
                    symbol, side, quantity, price
                );
                self.positions.insert(symbol, position);
            }
        }
    }
}

fn realized_pnl(position: &BrokerPosition, exit_price: f64, point_value: f64) -> f64 {
    let per_point = position.quantity as f64 * point_value;
    match position.side {
        Side::Buy => (exit_price - position.entry_price) * per_point,
        Side::Sell => (position.entry_price - exit_price) * per_point,
    }
}

impl ExecutionClient for PaperBroker {
    fn connect(&mut self) -> bool {
        info!("Connected to paper trading broker");
        self.connected = true;
        true
    }

    fn disconnect(&mut self) {
        info!("Disconnected from paper trading broker");
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn update_market_price(&mut self, symbol: &Symbol, price: f64, timestamp: DateTime<Utc>) {
        self.last_prices.insert(symbol.clone(), (price, timestamp));
        if let Some(position) = self.positions.get_mut(symbol) {
            position.update_pnl(price, self.point_value);
        }
    }

    fn submit_order(
        &mut self,
        symbol: &Symbol,
        side: Side,
        quantity: u32,
    ) -> Result<OrderId, OrderRejected> {
        if !self.connected {
            return Err(OrderRejected::NotConnected);
        }

        let created_at = self
            .last_prices
            .get(symbol)
            .map(|&(_, ts)| ts)
            .unwrap_or_else(Utc::now);
        let order = Order::market(symbol.clone(), side, quantity, created_at);
        let id = order.id;
        info!(
            "Order submitted: {} {:?} {} x {}",
            id, side, quantity, symbol
        );
        self.orders.insert(id, order);

        // Market orders fill immediately at the last known price
        self.fill_order(id);
        Ok(id)
    }

    fn order_state(&self, id: OrderId) -> OrderState {
        self.orders
            .get(&id)
            .map(|o| o.state)
            .unwrap_or(OrderState::Rejected)
    }

    fn position(&self, symbol: &Symbol) -> Option<&BrokerPosition> {
        self.positions.get(symbol)
    }

    fn has_open_position(&self) -> bool {
        !self.positions.is_empty()
    }

    fn account_balance(&self) -> f64 {
        self.balance
    }

    fn daily_pnl(&self) -> f64 {
        let unrealized: f64 = self.positions.values().map(|p| p.unrealized_pnl).sum();
        self.daily_realized + unrealized
    }

    fn trades_today(&self) -> u32 {
        self.trades_today
    }

    fn reset_daily_stats(&mut self) {
        self.daily_realized = 0.0;
        self.trades_today = 0;
        info!("Daily broker stats reset");
    }

    fn trade_history(&self) -> &[TradeRecord] {
        &self.trade_history
    }

    fn statistics(&self) -> Statistics {
        if self.trade_history.is_empty() {
            return Statistics {
                current_balance: self.balance,
                ..Statistics::default()
            };
        }

        let (wins, losses): (Vec<&TradeRecord>, Vec<&TradeRecord>) =
            self.trade_history.iter().partition(|t| t.pnl > 0.0);

        let total_pnl: f64 = self.trade_history.iter().map(|t| t.pnl).sum();
        let average_win = if wins.is_empty() {
            0.0
        } else {
            wins.iter().map(|t| t.pnl).sum::<f64>() / wins.len() as f64
        };
        let average_loss = if losses.is_empty() {
            0.0
        } else {
            losses.iter().map(|t| t.pnl).sum::<f64>() / losses.len() as f64
        };

        Statistics {
            total_trades: self.trade_history.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: wins.len() as f64 / self.trade_history.len() as f64 * 100.0,
            total_pnl,
            average_win,
            average_loss,
            current_balance: self.balance,
        }
    }
}
