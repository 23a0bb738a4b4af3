//! Risk management
//!
//! Stateless policy over broker-reported daily P&L, trade count, and open
//! positions. The execution engine owns the counters; this module only
//! decides.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::oms::paper::ExecutionClient;

/// Why trading is currently denied; checks run in this order and the first
/// failure is reported
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeDenial {
    #[error("daily loss limit reached: {0:.2}")]
    DailyLossLimit(f64),
    #[error("daily trade limit reached: {0} trades")]
    DailyTradeLimit(u32),
    #[error("position already open")]
    PositionOpen,
}

/// Risk status projection for the control surface
#[derive(Debug, Clone, Serialize)]
pub struct RiskStatus {
    pub max_position_size: u32,
    pub max_daily_loss: f64,
    pub max_daily_trades: u32,
    pub daily_pnl: f64,
    pub remaining_loss_limit: f64,
    pub trades_today: u32,
    pub remaining_trades: u32,
    pub can_trade: bool,
    pub reason: Option<String>,
}

/// Trade gate and position sizing policy
#[derive(Debug, Clone)]
pub struct RiskManager {
    max_position_size: u32,
    max_daily_loss: f64,
    max_daily_trades: u32,
    point_value: f64,
}

impl RiskManager {
    pub fn new(
        max_position_size: u32,
        max_daily_loss: f64,
        max_daily_trades: u32,
        point_value: f64,
    ) -> Self {
        RiskManager {
            max_position_size,
            max_daily_loss,
            max_daily_trades,
            point_value,
        }
    }

    /// All three checks run on every call: daily loss, then trade count,
    /// then open position
    pub fn check_can_trade(&self, broker: &dyn ExecutionClient) -> Result<(), TradeDenial> {
        let daily_pnl = broker.daily_pnl();
        let trades = broker.trades_today();
        let position_open = broker.has_open_position();

        if daily_pnl <= -self.max_daily_loss {
            return Err(TradeDenial::DailyLossLimit(daily_pnl));
        }
        if trades >= self.max_daily_trades {
            return Err(TradeDenial::DailyTradeLimit(trades));
        }
        if position_open {
            return Err(TradeDenial::PositionOpen);
        }
        Ok(())
    }

    /// Contracts to trade for a given risk budget, clamped to
    /// `[1, max_position_size]`. Non-positive `risk_points` falls back to a
    /// single contract with a warning.
    pub fn position_size(&self, balance: f64, risk_points: f64, risk_percent: f64) -> u32 {
        if risk_points <= 0.0 {
            warn!("Invalid risk points for position sizing, defaulting to 1 contract");
            return 1;
        }

        let max_risk = balance * risk_percent;
        let risk_per_contract = risk_points * self.point_value;
        let size = (max_risk / risk_per_contract) as u32;
        let size = size.clamp(1, self.max_position_size);

        info!(
            "Position sizing: balance={:.2}, risk={:.2} points ({:.2}), max risk={:.2}, size={} contracts",
            balance, risk_points, risk_per_contract, max_risk, size
        );
        size
    }

    pub fn risk_status(&self, broker: &dyn ExecutionClient) -> RiskStatus {
        let daily_pnl = broker.daily_pnl();
        let trades = broker.trades_today();
        let verdict = self.check_can_trade(broker);

        RiskStatus {
            max_position_size: self.max_position_size,
            max_daily_loss: self.max_daily_loss,
            max_daily_trades: self.max_daily_trades,
            daily_pnl,
            remaining_loss_limit: self.max_daily_loss + daily_pnl,
            trades_today: trades,
            remaining_trades: self.max_daily_trades.saturating_sub(trades),
            can_trade: verdict.is_ok(),
            reason: verdict.err().map(|d| d.to_string()),
        }
    }
}
