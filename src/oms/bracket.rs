//! Bracket order management
//!
//! Turns an accepted breakout signal into a market entry with a derived stop
//! and target, then watches each new price for an exit. Owns the trade
//! *intent*; the execution engine stays authoritative for fills.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::oms::paper::ExecutionClient;
use crate::oms::types::{OrderId, OrderState};
use crate::strategy::breakout::{BreakoutDirection, BreakoutSignal};
use crate::strategy::opening_range::OpeningRange;
use crate::{Side, Symbol};

/// Why a position was (or is being) closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    Target,
    TimeLimit,
    Shutdown,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Target => "target",
            ExitReason::TimeLimit => "time_limit",
            ExitReason::Shutdown => "shutdown",
        };
        write!(f, "{}", s)
    }
}

/// Read-only projection of the live bracket for status snapshots
#[derive(Debug, Clone, Serialize)]
pub struct PositionInfo {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u32,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub risk_points: f64,
    pub reward_points: f64,
}

/// Manages the single live bracket: entry order plus derived stop/target
pub struct BracketManager {
    symbol: Symbol,
    point_value: f64,
    entry_order: Option<OrderId>,
    side: Side,
    quantity: u32,
    entry_price: f64,
    stop_price: f64,
    target_price: f64,
}

impl BracketManager {
    pub fn new(symbol: Symbol, point_value: f64) -> Self {
        BracketManager {
            symbol,
            point_value,
            entry_order: None,
            side: Side::Buy,
            quantity: 0,
            entry_price: 0.0,
            stop_price: 0.0,
            target_price: 0.0,
        }
    }

    /// Submit the market entry for `signal` and derive stop/target from the
    /// opening range. Returns false (no state mutated) when the execution
    /// engine rejects the submission.
    pub fn create_bracket(
        &mut self,
        signal: &BreakoutSignal,
        opening_range: &OpeningRange,
        quantity: u32,
        risk_reward_ratio: f64,
        broker: &mut dyn ExecutionClient,
    ) -> bool {
        let (side, stop_price) = match signal.direction {
            BreakoutDirection::Bullish => (Side::Buy, opening_range.low()),
            BreakoutDirection::Bearish => (Side::Sell, opening_range.high()),
        };
        let Some(stop_price) = stop_price else {
            warn!("Cannot create bracket: opening range not computed");
            return false;
        };

        let entry_order = match broker.submit_order(&self.symbol, side, quantity) {
            Ok(id) => id,
            Err(reason) => {
                error!("Failed to submit entry order: {}", reason);
                return false;
            }
        };

        let entry_price = signal.price;
        let risk = match side {
            Side::Buy => entry_price - stop_price,
            Side::Sell => stop_price - entry_price,
        };
        let target_price = match side {
            Side::Buy => entry_price + risk * risk_reward_ratio,
            Side::Sell => entry_price - risk * risk_reward_ratio,
        };

        self.entry_order = Some(entry_order);
        self.side = side;
        self.quantity = quantity;
        self.entry_price = entry_price;
        self.stop_price = stop_price;
        self.target_price = target_price;

        info!(
            "{:?} entry at {:.2}, stop at {:.2}, risk: {:.2} points ({:.2})",
            side,
            entry_price,
            stop_price,
            risk,
            risk * self.point_value * quantity as f64
        );
        info!(
            "Target set at {:.2}, reward: {:.2} points ({:.2})",
            target_price,
            risk * risk_reward_ratio,
            risk * risk_reward_ratio * self.point_value * quantity as f64
        );

        true
    }

    /// Check stop and target against `current_price`. Only meaningful once
    /// the entry order is confirmed filled; stop wins when both apply.
    pub fn check_exit(
        &self,
        current_price: f64,
        broker: &dyn ExecutionClient,
    ) -> Option<ExitReason> {
        let entry_order = self.entry_order?;
        if broker.order_state(entry_order) != OrderState::Filled {
            return None;
        }

        match self.side {
            Side::Buy => {
                if current_price <= self.stop_price {
                    Some(ExitReason::StopLoss)
                } else if current_price >= self.target_price {
                    Some(ExitReason::Target)
                } else {
                    None
                }
            }
            Side::Sell => {
                if current_price >= self.stop_price {
                    Some(ExitReason::StopLoss)
                } else if current_price <= self.target_price {
                    Some(ExitReason::Target)
                } else {
                    None
                }
            }
        }
    }

    /// Submit an opposite-side market order for the full quantity and clear
    /// the bracket. The clear is unconditional once the close order is
    /// accepted; under the synchronous-fill model acceptance and fill are the
    /// same step.
    pub fn close_position(&mut self, reason: ExitReason, broker: &mut dyn ExecutionClient) -> bool {
        if self.entry_order.is_none() {
            warn!("No open position to close");
            return false;
        }

        let exit_side = self.side.opposite();
        if let Err(e) = broker.submit_order(&self.symbol, exit_side, self.quantity) {
            error!("Failed to submit exit order: {}", e);
            return false;
        }

        info!("Position closed: {}", reason);

        self.entry_order = None;
        self.quantity = 0;
        self.entry_price = 0.0;
        self.stop_price = 0.0;
        self.target_price = 0.0;

        true
    }

    /// A bracket counts as open only when the execution engine reports the
    /// entry order filled
    pub fn has_open_position(&self, broker: &dyn ExecutionClient) -> bool {
        match self.entry_order {
            Some(id) => broker.order_state(id) == OrderState::Filled,
            None => false,
        }
    }

    pub fn position_info(&self, broker: &dyn ExecutionClient) -> Option<PositionInfo> {
        if !self.has_open_position(broker) {
            return None;
        }
        Some(PositionInfo {
            symbol: self.symbol.clone(),
            side: self.side,
            quantity: self.quantity,
            entry_price: self.entry_price,
            stop_price: self.stop_price,
            target_price: self.target_price,
            risk_points: (self.entry_price - self.stop_price).abs(),
            reward_points: (self.target_price - self.entry_price).abs(),
        })
    }
}
