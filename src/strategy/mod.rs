//! Opening range breakout strategy components

pub mod breakout;
pub mod opening_range;

pub use breakout::{BreakoutDetector, BreakoutDirection, BreakoutSignal};
pub use opening_range::{OpeningRange, RangeSnapshot};
