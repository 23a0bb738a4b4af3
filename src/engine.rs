//! Day/session state machine
//!
//! The orchestrator: each bar flows through the window, the broker price
//! update, the day-rollover check, and then exactly one state handler.
//! Everything is synchronous and bar-driven; there is no polling.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::calendar::NewsCalendar;
use crate::config::Config;
use crate::data::BarWindow;
use crate::oms::bracket::{BracketManager, ExitReason, PositionInfo};
use crate::oms::paper::ExecutionClient;
use crate::risk::{RiskManager, RiskStatus};
use crate::strategy::breakout::{BreakoutDetector, BreakoutDirection, BreakoutSignal};
use crate::strategy::opening_range::{OpeningRange, RangeSnapshot};
use crate::types::{Bar, Statistics, Symbol, TradeRecord};

/// Session phases, advanced once per incoming bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Initializing,
    WaitingForOpen,
    CalculatingRange,
    WaitingForBreakout,
    InPosition,
    WindowClosed,
    Stopped,
}

/// Read-only status projection for the control surface
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub is_running: bool,
    pub symbol: Symbol,
    pub current_date: Option<NaiveDate>,
    pub opening_range: Option<RangeSnapshot>,
    pub position: Option<PositionInfo>,
    pub risk: RiskStatus,
    pub account_balance: f64,
    pub daily_pnl: f64,
}

/// Opening range breakout engine for a single instrument
pub struct TradingEngine {
    config: Config,
    symbol: Symbol,
    timezone: Tz,
    window_start: NaiveTime,
    window_end: NaiveTime,
    bars: BarWindow,
    broker: Box<dyn ExecutionClient + Send>,
    opening_range: OpeningRange,
    detector: BreakoutDetector,
    bracket: BracketManager,
    risk: RiskManager,
    calendar: NewsCalendar,
    state: EngineState,
    is_running: bool,
    current_date: Option<NaiveDate>,
}

impl TradingEngine {
    /// Build the engine from a validated configuration. Configuration
    /// problems surface here and are fatal.
    pub fn new(config: Config, broker: Box<dyn ExecutionClient + Send>) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let symbol = config.symbol();
        let timezone = config.session_timezone()?;
        let window_start = config.window_start()?;
        let window_end = config.window_end()?;
        let point_value = config.trading.point_value;

        let opening_range = OpeningRange::new(
            config.strategy.opening_range_minutes,
            window_start,
            timezone,
        );
        let detector = BreakoutDetector::new(
            config.strategy.entry_rules.min_breakout_points,
            config.strategy.entry_rules.volume_multiplier,
            config.strategy.entry_rules.volume_lookback,
        );
        let bracket = BracketManager::new(symbol.clone(), point_value);
        let risk = RiskManager::new(
            config.risk.max_position_size,
            config.risk.max_daily_loss,
            config.risk.max_daily_trades,
            point_value,
        );
        let calendar = NewsCalendar::new(config.filters.avoid_news_days);

        Ok(TradingEngine {
            config,
            symbol,
            timezone,
            window_start,
            window_end,
            bars: BarWindow::new(),
            broker,
            opening_range,
            detector,
            bracket,
            risk,
            calendar,
            state: EngineState::Initializing,
            is_running: false,
            current_date: None,
        })
    }

    /// Connect the execution engine and begin accepting bars
    pub fn start(&mut self) -> Result<()> {
        if self.is_running {
            anyhow::bail!("engine already running");
        }
        if !self.broker.connect() {
            anyhow::bail!("failed to connect to execution engine");
        }

        self.is_running = true;
        self.state = EngineState::WaitingForOpen;

        info!("Opening range breakout engine started");
        info!("Symbol: {}", self.symbol);
        info!(
            "Opening range: {} minutes",
            self.config.strategy.opening_range_minutes
        );
        info!(
            "Trading window: {} - {} ({})",
            self.config.strategy.trading_window.start,
            self.config.strategy.trading_window.end,
            self.config.trading.timezone
        );
        info!(
            "Risk/reward ratio: {}",
            self.config.strategy.exit_rules.risk_reward_ratio
        );
        info!(
            "Max position size: {} contracts",
            self.config.risk.max_position_size
        );
        info!("Max daily loss: {:.2}", self.config.risk.max_daily_loss);
        Ok(())
    }

    /// Cooperative shutdown: force-close any open position through the
    /// normal close path, then disconnect
    pub fn stop(&mut self) {
        info!("Stopping trading engine...");
        self.is_running = false;

        if self.bracket.has_open_position(self.broker.as_ref()) {
            self.bracket
                .close_position(ExitReason::Shutdown, self.broker.as_mut());
        }

        self.broker.disconnect();
        self.state = EngineState::Stopped;
        info!("Engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Process one bar to completion. Callers must serialize delivery; the
    /// engine holds no queue.
    pub fn on_bar(&mut self, bar: Bar) {
        if !self.is_running {
            return;
        }

        self.bars.push(bar.clone());
        self.broker
            .update_market_price(&self.symbol, bar.close, bar.timestamp);

        let local = bar.timestamp.with_timezone(&self.timezone);
        let bar_date = local.date_naive();
        let bar_time = local.time();

        if self.current_date != Some(bar_date) {
            self.handle_new_day(bar_date);
        }

        match self.state {
            EngineState::WaitingForOpen => self.handle_waiting_for_open(bar_time),
            EngineState::CalculatingRange => self.handle_calculating_range(&bar),
            EngineState::WaitingForBreakout => self.handle_waiting_for_breakout(&bar, bar_time),
            EngineState::InPosition => self.handle_in_position(&bar, bar_time),
            // Wait for the next day (or for start/stop)
            EngineState::WindowClosed | EngineState::Initializing | EngineState::Stopped => {}
        }
    }

    fn handle_new_day(&mut self, date: NaiveDate) {
        info!("New trading day: {}", date);
        self.current_date = Some(date);

        self.calendar.log_status(date);
        if let Some(event) = self.calendar.blocking_event(date) {
            warn!("Trading suspended today: {}", event);
            self.state = EngineState::WindowClosed;
            return;
        }

        self.opening_range.reset();
        self.detector.reset();
        self.broker.reset_daily_stats();
        self.state = EngineState::WaitingForOpen;
    }

    fn handle_waiting_for_open(&mut self, bar_time: NaiveTime) {
        if bar_time >= self.window_start {
            info!("Market open");
            self.state = EngineState::CalculatingRange;
        }
    }

    fn handle_calculating_range(&mut self, bar: &Bar) {
        if self.opening_range.calculate(bar.timestamp, &self.bars) {
            self.state = EngineState::WaitingForBreakout;
        }
    }

    fn handle_waiting_for_breakout(&mut self, bar: &Bar, bar_time: NaiveTime) {
        if bar_time >= self.window_end {
            info!("Trading window closed, no breakout occurred");
            self.state = EngineState::WindowClosed;
            return;
        }

        if let Err(denial) = self.risk.check_can_trade(self.broker.as_ref()) {
            warn!("Cannot trade: {}", denial);
            self.state = EngineState::WindowClosed;
            return;
        }

        let require_volume = self.config.strategy.entry_rules.volume_confirmation;
        let signal = self
            .detector
            .check(bar, &self.opening_range, &self.bars, require_volume);

        if let Some(signal) = signal {
            self.handle_breakout_signal(&signal);
        }
    }

    fn handle_breakout_signal(&mut self, signal: &BreakoutSignal) {
        info!("Breakout detected: {:?} at {:.2}", signal.direction, signal.price);

        let balance = self.broker.account_balance();
        let risk_points = match signal.direction {
            BreakoutDirection::Bullish => {
                signal.price - self.opening_range.low().unwrap_or(signal.price)
            }
            BreakoutDirection::Bearish => {
                self.opening_range.high().unwrap_or(signal.price) - signal.price
            }
        };
        let quantity =
            self.risk
                .position_size(balance, risk_points, self.config.risk.risk_percent);

        let created = self.bracket.create_bracket(
            signal,
            &self.opening_range,
            quantity,
            self.config.strategy.exit_rules.risk_reward_ratio,
            self.broker.as_mut(),
        );

        if created {
            info!("Bracket created");
            self.state = EngineState::InPosition;
        } else {
            // Submission rejection ends the day's opportunity; the detector
            // is latched either way
            error!("Failed to create bracket, closing day");
            self.state = EngineState::WindowClosed;
        }
    }

    fn handle_in_position(&mut self, bar: &Bar, bar_time: NaiveTime) {
        let current_price = bar.close;

        if let Some(reason) = self.bracket.check_exit(current_price, self.broker.as_ref()) {
            info!("Exit signal: {}", reason);
            self.bracket.close_position(reason, self.broker.as_mut());
            self.log_day_summary();
            self.state = EngineState::WindowClosed;
            return;
        }

        if bar_time >= self.window_end {
            info!("Trading window closed, closing position");
            self.bracket
                .close_position(ExitReason::TimeLimit, self.broker.as_mut());
            self.log_day_summary();
            self.state = EngineState::WindowClosed;
        }
    }

    fn log_day_summary(&self) {
        let stats = self.broker.statistics();
        info!(
            "Trade statistics: {} trades, win rate {:.1}%, total P&L {:.2}",
            stats.total_trades, stats.win_rate, stats.total_pnl
        );
        info!("Daily P&L: {:.2}", self.broker.daily_pnl());
    }

    /// Status snapshot for the control surface; pure projection
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state,
            is_running: self.is_running,
            symbol: self.symbol.clone(),
            current_date: self.current_date,
            opening_range: self.opening_range.snapshot(),
            position: self.bracket.position_info(self.broker.as_ref()),
            risk: self.risk.risk_status(self.broker.as_ref()),
            account_balance: self.broker.account_balance(),
            daily_pnl: self.broker.daily_pnl(),
        }
    }

    pub fn statistics(&self) -> Statistics {
        self.broker.statistics()
    }

    pub fn trade_history(&self) -> Vec<TradeRecord> {
        self.broker.trade_history().to_vec()
    }
}
