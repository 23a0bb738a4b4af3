//! Run command
//!
//! Starts the engine and serves the HTTP control surface until Ctrl+C.
//! Bars arrive through the control surface's injection endpoint; a live
//! feed adapter would deliver them the same way.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{error, info};

use orb_bot::server::{build_router, AppState};
use orb_bot::{Config, PaperBroker, TradingEngine};

pub fn run(config_path: String, bind: String) -> Result<()> {
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    info!("==============================================");
    info!("  OPENING RANGE BREAKOUT ENGINE");
    info!("==============================================");
    info!("Symbol: {}", config.trading.symbol);
    info!(
        "Opening range: {} minutes",
        config.strategy.opening_range_minutes
    );
    info!(
        "Trading window: {} - {}",
        config.strategy.trading_window.start, config.strategy.trading_window.end
    );
    info!("Control surface: http://{}", bind);

    let broker = PaperBroker::new(config.trading.initial_balance, config.trading.point_value);
    let mut engine = TradingEngine::new(config, Box::new(broker))?;
    engine.start()?;

    let state = Arc::new(AppState {
        engine: Mutex::new(engine),
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(serve(state, bind))
}

async fn serve(state: Arc<AppState>, bind: String) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    let router = build_router(state.clone());

    info!("Control surface listening on {}", bind);

    tokio::select! {
        result = async { axum::serve(listener, router).await } => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
    }

    state.engine.lock().await.stop();
    info!("Session ended.");
    Ok(())
}
