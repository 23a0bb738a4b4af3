//! HTTP control surface
//!
//! Thin wrapper over the engine: start/stop, read-only snapshots, and a
//! manual bar-injection endpoint for testing. Every handler serializes
//! through the single engine mutex; the engine itself is not safe for
//! concurrent mutation.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::engine::{EngineStatus, TradingEngine};
use crate::types::{Bar, Statistics, TradeRecord};

pub struct AppState {
    pub engine: Mutex<TradingEngine>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/statistics", get(statistics))
        .route("/api/trades", get(trades))
        .route("/api/start", post(start))
        .route("/api/stop", post(stop))
        .route("/api/bar", post(inject_bar))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ControlResponse {
    ok: bool,
    message: String,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<EngineStatus> {
    let engine = state.engine.lock().await;
    Json(engine.status())
}

async fn statistics(State(state): State<Arc<AppState>>) -> Json<Statistics> {
    let engine = state.engine.lock().await;
    Json(engine.statistics())
}

async fn trades(State(state): State<Arc<AppState>>) -> Json<Vec<TradeRecord>> {
    let engine = state.engine.lock().await;
    Json(engine.trade_history())
}

async fn start(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, (StatusCode, String)> {
    let mut engine = state.engine.lock().await;
    match engine.start() {
        Ok(()) => Ok(Json(ControlResponse {
            ok: true,
            message: "engine started".to_string(),
        })),
        Err(e) => Err((StatusCode::CONFLICT, e.to_string())),
    }
}

async fn stop(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    let mut engine = state.engine.lock().await;
    engine.stop();
    Json(ControlResponse {
        ok: true,
        message: "engine stopped".to_string(),
    })
}

/// Bar as accepted on the wire; validated into a domain `Bar`
#[derive(Debug, Deserialize)]
struct BarPayload {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

async fn inject_bar(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BarPayload>,
) -> Result<Json<EngineStatus>, (StatusCode, String)> {
    let bar = Bar::new(
        payload.timestamp,
        payload.open,
        payload.high,
        payload.low,
        payload.close,
        payload.volume,
    )
    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut engine = state.engine.lock().await;
    engine.on_bar(bar);
    Ok(Json(engine.status()))
}
