//! Integration tests for the opening range breakout engine
//!
//! Drives the full per-bar state machine through realistic trading days and
//! verifies range computation, breakout handling, bracket exits, risk gating,
//! and day-rollover resets.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::New_York;

use orb_bot::oms::{BrokerPosition, ExecutionClient, OrderId, OrderRejected, OrderState};
use orb_bot::{
    Bar, Config, EngineState, PaperBroker, Side, Statistics, Symbol, TradeRecord, TradingEngine,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn et(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    New_York
        .with_ymd_and_hms(2026, 3, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

#[allow(clippy::too_many_arguments)]
fn bar(
    day: u32,
    hour: u32,
    minute: u32,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
) -> Bar {
    Bar::new(et(day, hour, minute), open, high, low, close, volume).unwrap()
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.filters.avoid_news_days = false;
    config
}

fn engine_with(config: Config) -> TradingEngine {
    let broker = PaperBroker::new(config.trading.initial_balance, config.trading.point_value);
    let mut engine = TradingEngine::new(config, Box::new(broker)).unwrap();
    engine.start().unwrap();
    engine
}

/// Opening-range session on `day`: high 5010, low 5000, then a quiet bar at
/// 09:36 that latches the range
fn feed_opening_session(engine: &mut TradingEngine, day: u32) {
    engine.on_bar(bar(day, 9, 30, 5005.0, 5006.0, 5000.0, 5004.0, 1000));
    engine.on_bar(bar(day, 9, 31, 5004.0, 5008.0, 5002.0, 5006.0, 1000));
    engine.on_bar(bar(day, 9, 32, 5006.0, 5010.0, 5004.0, 5008.0, 1000));
    engine.on_bar(bar(day, 9, 33, 5008.0, 5009.0, 5003.0, 5005.0, 1000));
    engine.on_bar(bar(day, 9, 34, 5005.0, 5007.0, 5001.0, 5003.0, 1000));
    engine.on_bar(bar(day, 9, 36, 5003.0, 5005.0, 5002.0, 5004.0, 1000));
}

fn bullish_breakout_bar(day: u32) -> Bar {
    bar(day, 9, 37, 5004.0, 5011.5, 5004.0, 5011.0, 3000)
}

// =============================================================================
// Opening range computation
// =============================================================================

#[test]
fn opening_range_from_first_five_minutes() {
    let mut engine = engine_with(test_config());
    let day = 10;

    // Highs [5005, 5008, 5010, 5012, 5013], lows [4998, 5002, 5004, 5007, 5009]
    engine.on_bar(bar(day, 9, 30, 5000.0, 5005.0, 4998.0, 5003.0, 1000));
    engine.on_bar(bar(day, 9, 31, 5003.0, 5008.0, 5002.0, 5006.0, 1200));
    engine.on_bar(bar(day, 9, 32, 5006.0, 5010.0, 5004.0, 5009.0, 1100));
    engine.on_bar(bar(day, 9, 33, 5009.0, 5012.0, 5007.0, 5011.0, 900));
    engine.on_bar(bar(day, 9, 34, 5011.0, 5013.0, 5009.0, 5010.0, 1000));

    let status = engine.status();
    assert_eq!(status.state, EngineState::CalculatingRange);
    assert!(status.opening_range.is_none());

    engine.on_bar(bar(day, 9, 36, 5010.0, 5011.0, 5009.0, 5010.0, 1000));

    let status = engine.status();
    assert_eq!(status.state, EngineState::WaitingForBreakout);
    let range = status.opening_range.unwrap();
    assert_eq!(range.high, 5013.0);
    assert_eq!(range.low, 4998.0);
    assert_eq!(range.range, 15.0);
}

#[test]
fn opening_range_is_stable_for_the_day() {
    let mut engine = engine_with(test_config());
    feed_opening_session(&mut engine, 10);

    // Wild bar after the latch must not move the range
    engine.on_bar(bar(10, 9, 38, 5004.0, 5500.0, 4500.0, 5005.0, 100));
    let range = engine.status().opening_range.unwrap();
    assert_eq!(range.high, 5010.0);
    assert_eq!(range.low, 5000.0);
    assert!(range.high >= range.low);
}

#[test]
fn pre_open_bars_keep_waiting() {
    let mut engine = engine_with(test_config());
    engine.on_bar(bar(10, 9, 0, 5000.0, 5001.0, 4999.0, 5000.0, 500));

    let status = engine.status();
    assert_eq!(status.state, EngineState::WaitingForOpen);
    assert!(status.opening_range.is_none());
}

// =============================================================================
// Breakout detection and bracket creation
// =============================================================================

#[test]
fn bullish_breakout_opens_bracket() {
    let mut engine = engine_with(test_config());
    let day = 10;
    feed_opening_session(&mut engine, day);

    engine.on_bar(bullish_breakout_bar(day));

    let status = engine.status();
    assert_eq!(status.state, EngineState::InPosition);

    let position = status.position.unwrap();
    assert_eq!(position.side, Side::Buy);
    assert_eq!(position.entry_price, 5011.0);
    assert_eq!(position.stop_price, 5000.0);
    // target = 5011 + (5011 - 5000) * 2
    assert_eq!(position.target_price, 5033.0);
    // floor(100000 * 0.02 / (11 * 50)) = 3, within [1, 3]
    assert_eq!(position.quantity, 3);
}

#[test]
fn breakout_without_volume_stays_flat() {
    let mut config = test_config();
    config.strategy.entry_rules.volume_confirmation = true;
    let mut engine = engine_with(config);
    feed_opening_session(&mut engine, 10);

    // Breaks the band but volume is in line with the average
    engine.on_bar(bar(10, 9, 37, 5004.0, 5011.5, 5004.0, 5011.0, 1000));
    assert_eq!(engine.status().state, EngineState::WaitingForBreakout);
}

#[test]
fn volume_confirmation_disabled_takes_quiet_breakout() {
    let mut config = test_config();
    config.strategy.entry_rules.volume_confirmation = false;
    let mut engine = engine_with(config);
    feed_opening_session(&mut engine, 10);

    engine.on_bar(bar(10, 9, 37, 5004.0, 5011.5, 5004.0, 5011.0, 800));
    assert_eq!(engine.status().state, EngineState::InPosition);
}

#[test]
fn target_exit_realizes_profit() {
    let mut engine = engine_with(test_config());
    let day = 10;
    feed_opening_session(&mut engine, day);
    engine.on_bar(bullish_breakout_bar(day));

    engine.on_bar(bar(day, 9, 45, 5011.0, 5033.5, 5010.5, 5033.0, 1500));

    let status = engine.status();
    assert_eq!(status.state, EngineState::WindowClosed);
    assert!(status.position.is_none());

    let history = engine.trade_history();
    assert_eq!(history.len(), 1);
    let trade = &history[0];
    assert_eq!(trade.side, Side::Buy);
    assert_eq!(trade.quantity, 3);
    // (5033 - 5011) * 3 contracts * $50/pt
    assert_eq!(trade.pnl, 3300.0);
    assert_eq!(status.account_balance, 103_300.0);

    let stats = engine.statistics();
    assert_eq!(stats.total_trades, 1);
    assert_eq!(stats.winning_trades, 1);
    assert_eq!(stats.win_rate, 100.0);
}

#[test]
fn stop_exit_realizes_loss() {
    let mut engine = engine_with(test_config());
    let day = 10;
    feed_opening_session(&mut engine, day);
    engine.on_bar(bullish_breakout_bar(day));

    engine.on_bar(bar(day, 9, 45, 5011.0, 5011.0, 4999.5, 5000.0, 1500));

    let status = engine.status();
    assert_eq!(status.state, EngineState::WindowClosed);

    let history = engine.trade_history();
    assert_eq!(history.len(), 1);
    // (5000 - 5011) * 3 * 50
    assert_eq!(history[0].pnl, -1650.0);
    assert_eq!(status.daily_pnl, -1650.0);
}

#[test]
fn bearish_breakout_mirrors_bracket() {
    let mut engine = engine_with(test_config());
    let day = 10;
    feed_opening_session(&mut engine, day);

    engine.on_bar(bar(day, 9, 37, 5003.0, 5003.0, 4988.5, 4989.0, 3000));

    let status = engine.status();
    assert_eq!(status.state, EngineState::InPosition);
    let position = status.position.unwrap();
    assert_eq!(position.side, Side::Sell);
    assert_eq!(position.stop_price, 5010.0);
    // risk = 5010 - 4989 = 21; target = 4989 - 42 = 4947
    assert_eq!(position.target_price, 4947.0);
    assert_eq!(position.quantity, 1);

    // Price back above the range high stops the short out
    engine.on_bar(bar(day, 9, 50, 4989.0, 5010.5, 4989.0, 5010.0, 1500));
    let history = engine.trade_history();
    assert_eq!(history.len(), 1);
    // (4989 - 5010) * 1 * 50
    assert_eq!(history[0].pnl, -1050.0);
}

#[test]
fn only_one_breakout_per_day() {
    let mut engine = engine_with(test_config());
    let day = 10;
    feed_opening_session(&mut engine, day);
    engine.on_bar(bullish_breakout_bar(day));
    engine.on_bar(bar(day, 9, 45, 5011.0, 5033.5, 5010.5, 5033.0, 1500));
    assert_eq!(engine.trade_history().len(), 1);

    // Condition keeps holding after the round trip; no second entry
    engine.on_bar(bar(day, 9, 50, 5033.0, 5040.0, 5032.0, 5039.0, 4000));
    engine.on_bar(bar(day, 9, 51, 5039.0, 5045.0, 5038.0, 5044.0, 4000));

    let status = engine.status();
    assert_eq!(status.state, EngineState::WindowClosed);
    assert_eq!(engine.trade_history().len(), 1);
}

// =============================================================================
// Window close and no-trade days
// =============================================================================

#[test]
fn no_breakout_day_closes_at_window_end() {
    let mut engine = engine_with(test_config());
    feed_opening_session(&mut engine, 10);

    engine.on_bar(bar(10, 15, 45, 5004.0, 5005.0, 5003.0, 5004.0, 900));

    let status = engine.status();
    assert_eq!(status.state, EngineState::WindowClosed);
    assert!(engine.trade_history().is_empty());
}

#[test]
fn open_position_is_force_closed_at_window_end() {
    let mut engine = engine_with(test_config());
    let day = 10;
    feed_opening_session(&mut engine, day);
    engine.on_bar(bullish_breakout_bar(day));

    // Price meanders inside the bracket until the window closes
    engine.on_bar(bar(day, 12, 0, 5011.0, 5016.0, 5010.5, 5015.0, 900));
    assert_eq!(engine.status().state, EngineState::InPosition);

    engine.on_bar(bar(day, 15, 45, 5015.0, 5016.0, 5014.0, 5015.0, 900));

    let status = engine.status();
    assert_eq!(status.state, EngineState::WindowClosed);
    assert!(status.position.is_none());
    let history = engine.trade_history();
    assert_eq!(history.len(), 1);
    // (5015 - 5011) * 3 * 50
    assert_eq!(history[0].pnl, 600.0);
}

#[test]
fn stop_force_closes_open_position() {
    let mut engine = engine_with(test_config());
    let day = 10;
    feed_opening_session(&mut engine, day);
    engine.on_bar(bullish_breakout_bar(day));
    assert_eq!(engine.status().state, EngineState::InPosition);

    engine.stop();

    let status = engine.status();
    assert_eq!(status.state, EngineState::Stopped);
    assert!(!status.is_running);
    assert_eq!(engine.trade_history().len(), 1);

    // Bars after stop are ignored
    engine.on_bar(bar(day, 10, 0, 5011.0, 5040.0, 5010.0, 5039.0, 3000));
    assert_eq!(engine.trade_history().len(), 1);
}

// =============================================================================
// Day rollover
// =============================================================================

#[test]
fn day_rollover_resets_daily_state() {
    let mut engine = engine_with(test_config());

    // Day 1: full winning round trip
    feed_opening_session(&mut engine, 10);
    engine.on_bar(bullish_breakout_bar(10));
    engine.on_bar(bar(10, 9, 45, 5011.0, 5033.5, 5010.5, 5033.0, 1500));
    assert_eq!(engine.status().daily_pnl, 3300.0);
    assert_eq!(engine.status().risk.trades_today, 2);

    // Day 2: first bar resets range, detector, and daily counters
    engine.on_bar(bar(11, 9, 0, 5030.0, 5031.0, 5029.0, 5030.0, 500));
    let status = engine.status();
    assert_eq!(status.state, EngineState::WaitingForOpen);
    assert!(status.opening_range.is_none());
    assert_eq!(status.daily_pnl, 0.0);
    assert_eq!(status.risk.trades_today, 0);
    // Balance survives the rollover
    assert_eq!(status.account_balance, 103_300.0);

    // Day 2: range latches again but no breakout is taken
    feed_opening_session(&mut engine, 11);
    assert_eq!(engine.status().state, EngineState::WaitingForBreakout);
    assert!(engine.status().opening_range.is_some());

    // Day 3: rollover out of a no-trade day works the same way
    engine.on_bar(bar(12, 9, 0, 5010.0, 5011.0, 5009.0, 5010.0, 500));
    let status = engine.status();
    assert_eq!(status.state, EngineState::WaitingForOpen);
    assert!(status.opening_range.is_none());
    assert_eq!(status.risk.trades_today, 0);
}

#[test]
fn news_day_suspends_trading() {
    let mut config = test_config();
    config.filters.avoid_news_days = true;
    let mut engine = engine_with(config);

    // 2026-03-17 is an FOMC day
    engine.on_bar(bar(17, 9, 30, 5005.0, 5006.0, 5004.0, 5005.0, 1000));
    assert_eq!(engine.status().state, EngineState::WindowClosed);

    // Bars later in the day stay ignored
    engine.on_bar(bar(17, 9, 40, 5005.0, 5100.0, 5004.0, 5099.0, 9000));
    let status = engine.status();
    assert_eq!(status.state, EngineState::WindowClosed);
    assert!(status.opening_range.is_none());
    assert!(engine.trade_history().is_empty());

    // The next ordinary day trades normally
    engine.on_bar(bar(19, 9, 0, 5005.0, 5006.0, 5004.0, 5005.0, 500));
    assert_eq!(engine.status().state, EngineState::WaitingForOpen);
}

// =============================================================================
// Policy denials through stub execution clients
// =============================================================================

/// Broker stub with a fixed daily P&L, for exercising the risk gate
struct DeepLossBroker {
    connected: bool,
}

impl ExecutionClient for DeepLossBroker {
    fn connect(&mut self) -> bool {
        self.connected = true;
        true
    }
    fn disconnect(&mut self) {
        self.connected = false;
    }
    fn is_connected(&self) -> bool {
        self.connected
    }
    fn update_market_price(&mut self, _: &Symbol, _: f64, _: DateTime<Utc>) {}
    fn submit_order(&mut self, _: &Symbol, _: Side, _: u32) -> Result<OrderId, OrderRejected> {
        Ok(1)
    }
    fn order_state(&self, _: OrderId) -> OrderState {
        OrderState::Filled
    }
    fn position(&self, _: &Symbol) -> Option<&BrokerPosition> {
        None
    }
    fn has_open_position(&self) -> bool {
        false
    }
    fn account_balance(&self) -> f64 {
        100_000.0
    }
    fn daily_pnl(&self) -> f64 {
        -500.0
    }
    fn trades_today(&self) -> u32 {
        0
    }
    fn reset_daily_stats(&mut self) {}
    fn trade_history(&self) -> &[TradeRecord] {
        &[]
    }
    fn statistics(&self) -> Statistics {
        Statistics::default()
    }
}

#[test]
fn daily_loss_at_limit_ends_the_day() {
    let broker = DeepLossBroker { connected: false };
    let mut engine = TradingEngine::new(test_config(), Box::new(broker)).unwrap();
    engine.start().unwrap();

    feed_opening_session(&mut engine, 10);
    // Range latched; the next bar hits the risk gate before any breakout
    engine.on_bar(bar(10, 9, 37, 5004.0, 5005.0, 5003.0, 5004.0, 1000));

    let status = engine.status();
    assert_eq!(status.state, EngineState::WindowClosed);
    assert!(!status.risk.can_trade);
    assert!(status.risk.reason.unwrap().contains("daily loss limit"));
}

/// Broker stub that refuses every order submission
struct RejectingBroker;

impl ExecutionClient for RejectingBroker {
    fn connect(&mut self) -> bool {
        true
    }
    fn disconnect(&mut self) {}
    fn is_connected(&self) -> bool {
        true
    }
    fn update_market_price(&mut self, _: &Symbol, _: f64, _: DateTime<Utc>) {}
    fn submit_order(&mut self, _: &Symbol, _: Side, _: u32) -> Result<OrderId, OrderRejected> {
        Err(OrderRejected::NotConnected)
    }
    fn order_state(&self, _: OrderId) -> OrderState {
        OrderState::Rejected
    }
    fn position(&self, _: &Symbol) -> Option<&BrokerPosition> {
        None
    }
    fn has_open_position(&self) -> bool {
        false
    }
    fn account_balance(&self) -> f64 {
        100_000.0
    }
    fn daily_pnl(&self) -> f64 {
        0.0
    }
    fn trades_today(&self) -> u32 {
        0
    }
    fn reset_daily_stats(&mut self) {}
    fn trade_history(&self) -> &[TradeRecord] {
        &[]
    }
    fn statistics(&self) -> Statistics {
        Statistics::default()
    }
}

#[test]
fn rejected_entry_order_ends_the_day() {
    let mut engine = TradingEngine::new(test_config(), Box::new(RejectingBroker)).unwrap();
    engine.start().unwrap();

    feed_opening_session(&mut engine, 10);
    engine.on_bar(bullish_breakout_bar(10));

    let status = engine.status();
    assert_eq!(status.state, EngineState::WindowClosed);
    assert!(status.position.is_none());
    assert!(engine.trade_history().is_empty());
}
