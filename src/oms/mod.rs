//! Order and execution management
//!
//! Order types, the bracket manager that owns trade intent, and the
//! simulated execution engine that owns money and position truth.

pub mod bracket;
pub mod paper;
pub mod types;

pub use bracket::{BracketManager, ExitReason, PositionInfo};
pub use paper::{BrokerPosition, ExecutionClient, OrderRejected, PaperBroker};
pub use types::{next_order_id, Order, OrderId, OrderState};
