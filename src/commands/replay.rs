//! Replay command
//!
//! Feeds a CSV bar file through the engine in order and prints the final
//! statistics. The engine treats a replay exactly like a live feed.

use anyhow::{Context, Result};
use tracing::info;

use orb_bot::data::load_bars_csv;
use orb_bot::{Config, PaperBroker, TradingEngine};

pub fn run(config_path: String, file: String) -> Result<()> {
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    let timezone = config.session_timezone()?;
    let bars = load_bars_csv(&file, timezone)
        .with_context(|| format!("Failed to load bars from {}", file))?;

    if bars.is_empty() {
        anyhow::bail!("no bars in {}", file);
    }
    info!("Replaying {} bars from {}", bars.len(), file);

    let broker = PaperBroker::new(config.trading.initial_balance, config.trading.point_value);
    let mut engine = TradingEngine::new(config, Box::new(broker))?;
    engine.start()?;

    for bar in bars {
        engine.on_bar(bar);
    }

    let stats = engine.statistics();
    info!(
        "Replay complete: {} trades, win rate {:.1}%, total P&L {:.2}, balance {:.2}",
        stats.total_trades, stats.win_rate, stats.total_pnl, stats.current_balance
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
