//! Order types shared by the bracket manager and execution engines

use crate::{Side, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub type OrderId = u64;

static ORDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate the next order ID (thread-safe, lock-free)
pub fn next_order_id() -> OrderId {
    ORDER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Order state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Accepted by the execution engine, not yet filled
    Submitted,
    /// Completely filled
    Filled,
    /// Cancelled before fill
    Cancelled,
    /// Refused by the execution engine (also reported for unknown IDs)
    Rejected,
}

/// Market order record. Entries and bracket exits are the only order flow,
/// so there is no limit/stop price plumbing here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u32,
    pub state: OrderState,
    pub filled_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn market(symbol: Symbol, side: Side, quantity: u32, created_at: DateTime<Utc>) -> Self {
        Order {
            id: next_order_id(),
            symbol,
            side,
            quantity,
            state: OrderState::Submitted,
            filled_price: None,
            created_at,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.state == OrderState::Filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_ids_are_monotonic() {
        let id1 = next_order_id();
        let id2 = next_order_id();
        assert!(id2 > id1);
    }

    #[test]
    fn market_order_starts_submitted() {
        let order = Order::market(Symbol::new("ES"), Side::Buy, 2, Utc::now());
        assert_eq!(order.state, OrderState::Submitted);
        assert_eq!(order.filled_price, None);
        assert!(!order.is_filled());
    }
}
