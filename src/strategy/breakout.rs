//! Breakout detection with volume confirmation
//!
//! Fires at most one signal per trading day. The bullish check has priority;
//! after either direction fires the detector is latched until the daily
//! reset, even if the breakout condition keeps holding.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::data::BarWindow;
use crate::strategy::opening_range::OpeningRange;
use crate::types::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakoutDirection {
    Bullish,
    Bearish,
}

/// Immutable breakout event
#[derive(Debug, Clone, Serialize)]
pub struct BreakoutSignal {
    pub direction: BreakoutDirection,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub volume: u64,
}

/// One-shot daily breakout detector
#[derive(Debug, Clone)]
pub struct BreakoutDetector {
    min_breakout_points: f64,
    volume_multiplier: f64,
    volume_lookback: usize,
    last_signal: Option<BreakoutSignal>,
    fired: bool,
}

impl BreakoutDetector {
    pub fn new(min_breakout_points: f64, volume_multiplier: f64, volume_lookback: usize) -> Self {
        BreakoutDetector {
            min_breakout_points,
            volume_multiplier,
            volume_lookback,
            last_signal: None,
            fired: false,
        }
    }

    /// Check `bar` against the latched range. Returns a signal at most once
    /// per day; `require_volume` gates on elevated volume vs. the rolling
    /// average.
    pub fn check(
        &mut self,
        bar: &Bar,
        opening_range: &OpeningRange,
        bars: &BarWindow,
        require_volume: bool,
    ) -> Option<BreakoutSignal> {
        if !opening_range.is_calculated() || self.fired {
            return None;
        }

        let price = bar.close;

        let direction = if opening_range.is_above_high(price, self.min_breakout_points) {
            BreakoutDirection::Bullish
        } else if opening_range.is_below_low(price, self.min_breakout_points) {
            BreakoutDirection::Bearish
        } else {
            return None;
        };

        if require_volume && !self.confirm_volume(bar.volume, bars) {
            debug!(
                "{:?} breakout at {:.2} but volume insufficient: {} vs avg {:.0}",
                direction,
                price,
                bar.volume,
                bars.average_volume(self.volume_lookback)
            );
            return None;
        }

        let signal = BreakoutSignal {
            direction,
            price,
            timestamp: bar.timestamp,
            volume: bar.volume,
        };

        match direction {
            BreakoutDirection::Bullish => info!(
                "BULLISH BREAKOUT: price {:.2} broke above range high {:.2} with volume {}",
                price,
                opening_range.high().unwrap_or(f64::NAN),
                bar.volume
            ),
            BreakoutDirection::Bearish => info!(
                "BEARISH BREAKOUT: price {:.2} broke below range low {:.2} with volume {}",
                price,
                opening_range.low().unwrap_or(f64::NAN),
                bar.volume
            ),
        }

        self.fired = true;
        self.last_signal = Some(signal.clone());
        Some(signal)
    }

    /// Volume must reach `average x multiplier`. With no volume history the
    /// confirmation passes automatically.
    fn confirm_volume(&self, volume: u64, bars: &BarWindow) -> bool {
        let average = bars.average_volume(self.volume_lookback);
        if average == 0.0 {
            warn!("No historical volume data available");
            return true;
        }
        volume as f64 >= average * self.volume_multiplier
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn last_signal(&self) -> Option<&BreakoutSignal> {
        self.last_signal.as_ref()
    }

    /// Reset for a new trading day
    pub fn reset(&mut self) {
        self.last_signal = None;
        self.fired = false;
        info!("Breakout detector reset");
    }
}
