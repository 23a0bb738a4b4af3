//! Opening Range Breakout Trading Engine
//!
//! An intraday strategy engine for a single index-futures instrument: it
//! watches a stream of minute bars, computes the opening range of the
//! session, waits for a volume-confirmed breakout, opens one bracketed
//! position, and manages it to exit against a simulated execution engine.
//!
//! The engine is single-threaded and bar-driven; the HTTP control surface in
//! [`server`] wraps it behind one mutex for concurrent front ends.
//!
//! ```no_run
//! use orb_bot::{Config, PaperBroker, TradingEngine};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("configs/es_orb.json")?;
//!     let broker = PaperBroker::new(
//!         config.trading.initial_balance,
//!         config.trading.point_value,
//!     );
//!     let mut engine = TradingEngine::new(config, Box::new(broker))?;
//!     engine.start()?;
//!     // feed bars: engine.on_bar(bar)
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod config;
pub mod data;
pub mod engine;
pub mod oms;
pub mod risk;
pub mod server;
pub mod strategy;
pub mod types;

pub use config::Config;
pub use engine::{EngineState, EngineStatus, TradingEngine};
pub use oms::{ExecutionClient, PaperBroker};
pub use strategy::{BreakoutDetector, BreakoutDirection, BreakoutSignal, OpeningRange};
pub use types::*;
