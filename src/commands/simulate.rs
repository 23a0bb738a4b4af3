//! Simulate command
//!
//! Synthesizes a plausible trading day - opening range, breakout with a
//! volume spike, drive toward the target - and feeds it through the engine
//! bar by bar, then prints statistics and the trade history.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use orb_bot::{Bar, Config, EngineState, PaperBroker, TradingEngine};

pub fn run(config_path: String, start_price: f64, seed: Option<u64>) -> Result<()> {
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    let timezone = config.session_timezone()?;
    let window_start = config.window_start()?;
    let or_minutes = config.strategy.opening_range_minutes;

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let broker = PaperBroker::new(config.trading.initial_balance, config.trading.point_value);
    let mut engine = TradingEngine::new(config, Box::new(broker))?;
    engine.start()?;

    // Session open on today's calendar day in the exchange timezone
    let local_date = Utc::now().with_timezone(&timezone).date_naive();
    let session_open = timezone
        .from_local_datetime(&local_date.and_time(window_start))
        .earliest()
        .context("session open time does not exist today")?
        .with_timezone(&Utc);

    info!("=== SIMULATING FULL TRADING DAY ===");

    let mut sim = Simulator {
        engine: &mut engine,
        rng: &mut rng,
        price: start_price,
    };

    // 1. Opening range bars
    let range_size = sim.rng.gen_range(3.0..8.0);
    let or_high = start_price + range_size / 2.0;
    let or_low = start_price - range_size / 2.0;
    let mut minute = sim.opening_range_phase(session_open, or_minutes, or_high, or_low);

    // One bar past the window so the range latches
    minute = sim.drift_phase(session_open, minute, 1);

    // 2. Breakout toward a random direction
    let bullish = sim.rng.gen_bool(0.5);
    let target = if bullish {
        or_high + sim.rng.gen_range(2.0..5.0)
    } else {
        or_low - sim.rng.gen_range(2.0..5.0)
    };
    info!(
        "=== SIMULATING {} BREAKOUT ===",
        if bullish { "BULLISH" } else { "BEARISH" }
    );
    minute = sim.breakout_phase(session_open, minute, target);

    // 3. Drive toward the bracket target until the position closes
    if let Some(position) = sim.engine.status().position {
        info!("=== MOVING TOWARD TARGET: {:.2} ===", position.target_price);
        sim.target_phase(session_open, minute, position.target_price);
    }

    // 4. Final statistics
    info!("=== SIMULATION COMPLETE ===");
    let stats = engine.statistics();
    info!(
        "Trades: {} (wins: {}, losses: {}), win rate {:.1}%",
        stats.total_trades, stats.winning_trades, stats.losing_trades, stats.win_rate
    );
    info!(
        "Total P&L: {:.2}, balance: {:.2}",
        stats.total_pnl, stats.current_balance
    );
    for (i, trade) in engine.trade_history().iter().enumerate() {
        info!(
            "Trade {}: {:?} {} @ {:.2} -> {:.2}, P&L: {:.2}",
            i + 1,
            trade.side,
            trade.quantity,
            trade.entry_price,
            trade.exit_price,
            trade.pnl
        );
    }

    engine.stop();
    Ok(())
}

struct Simulator<'a> {
    engine: &'a mut TradingEngine,
    rng: &'a mut StdRng,
    price: f64,
}

impl Simulator<'_> {
    fn send(&mut self, timestamp: DateTime<Utc>, next_price: f64, volume: u64) {
        let open = self.price;
        let close = next_price;
        let high = open.max(close) + self.rng.gen_range(0.0..0.5);
        let low = open.min(close) - self.rng.gen_range(0.0..0.5);
        let bar = Bar::new_unchecked(timestamp, open, high, low, close, volume);

        info!(
            "  {} - O:{:.2} H:{:.2} L:{:.2} C:{:.2} V:{}",
            timestamp.format("%H:%M"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        );

        self.price = next_price;
        self.engine.on_bar(bar);
    }

    /// Bars oscillating inside the opening band
    fn opening_range_phase(
        &mut self,
        session_open: DateTime<Utc>,
        or_minutes: u32,
        high: f64,
        low: f64,
    ) -> u32 {
        info!("=== GENERATING OPENING RANGE ===");
        for minute in 0..or_minutes {
            let ts = session_open + Duration::minutes(minute as i64);
            let price = self.rng.gen_range(low..high);
            let volume = self.rng.gen_range(500..1500);
            self.send(ts, price, volume);
        }
        or_minutes
    }

    /// Quiet bars that let the range latch without breaking it
    fn drift_phase(&mut self, session_open: DateTime<Utc>, start_minute: u32, count: u32) -> u32 {
        for minute in start_minute..start_minute + count {
            let ts = session_open + Duration::minutes(minute as i64);
            let drift = self.rng.gen_range(-0.2..0.2);
            let price = self.price + drift;
            let volume = self.rng.gen_range(500..1200);
            self.send(ts, price, volume);
        }
        start_minute + count
    }

    /// Bars converging on `target`, with a high-volume bar on the move
    fn breakout_phase(&mut self, session_open: DateTime<Utc>, start_minute: u32, target: f64) -> u32 {
        for (i, minute) in (start_minute..start_minute + 10).enumerate() {
            let ts = session_open + Duration::minutes(minute as i64);
            let step = (target - self.price) * 0.3;
            let price = self.price + step + self.rng.gen_range(-0.5..0.5);
            let volume = if i == 3 {
                self.rng.gen_range(2000..3000)
            } else {
                self.rng.gen_range(500..1200)
            };
            self.send(ts, price, volume);

            if self.engine.state() == EngineState::InPosition {
                return minute + 1;
            }
        }
        start_minute + 10
    }

    /// Bars walking toward the bracket target until the position closes
    fn target_phase(&mut self, session_open: DateTime<Utc>, start_minute: u32, target: f64) {
        for minute in start_minute..start_minute + 15 {
            let ts = session_open + Duration::minutes(minute as i64);
            let step = (target - self.price) * 0.2;
            let price = self.price + step + self.rng.gen_range(-0.3..0.3);
            let volume = self.rng.gen_range(500..1200);
            self.send(ts, price, volume);

            if self.engine.state() != EngineState::InPosition {
                info!("  >>> POSITION CLOSED <<<");
                return;
            }
        }
    }
}
