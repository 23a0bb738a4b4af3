//! Opening range calculation and tracking
//!
//! Derives the high/low band of the first minutes of the session and latches
//! it for the rest of the day. Session times are wall-clock in the exchange
//! timezone; bars carry UTC timestamps.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::data::BarWindow;

/// Snapshot of a computed range for status reporting
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RangeSnapshot {
    pub high: f64,
    pub low: f64,
    pub range: f64,
}

/// Per-day opening range; computed once, read-only until the next day reset
#[derive(Debug, Clone)]
pub struct OpeningRange {
    or_minutes: u32,
    session_start: NaiveTime,
    timezone: Tz,
    high: Option<f64>,
    low: Option<f64>,
    calculated: bool,
}

impl OpeningRange {
    pub fn new(or_minutes: u32, session_start: NaiveTime, timezone: Tz) -> Self {
        OpeningRange {
            or_minutes,
            session_start,
            timezone,
            high: None,
            low: None,
            calculated: false,
        }
    }

    /// Try to compute the range as of `now`. Returns true once computed
    /// (latched); false while the window has not elapsed or holds no bars.
    pub fn calculate(&mut self, now: DateTime<Utc>, bars: &BarWindow) -> bool {
        if self.calculated {
            return true;
        }

        let Some(session_open) = self.session_open_utc(now) else {
            // Nonexistent local time (DST gap); recoverable, retried next bar
            warn!("Session open time does not exist on this calendar day");
            return false;
        };

        if now < session_open {
            debug!("Market not yet open");
            return false;
        }

        let or_end = session_open + Duration::minutes(self.or_minutes as i64);
        if now < or_end {
            debug!("Still within opening range period (ends at {})", or_end);
            return false;
        }

        let Some((high, low)) = bars.high_low_range(session_open, or_end) else {
            warn!("No data available for opening range period");
            return false;
        };

        self.high = Some(high);
        self.low = Some(low);
        self.calculated = true;

        info!(
            "Opening range calculated: high={:.2}, low={:.2}, range={:.2} points",
            high,
            low,
            high - low
        );
        true
    }

    /// Session open on the calendar day of `now`, in UTC
    fn session_open_utc(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local_date = now.with_timezone(&self.timezone).date_naive();
        let naive = local_date.and_time(self.session_start);
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn is_calculated(&self) -> bool {
        self.calculated
    }

    pub fn high(&self) -> Option<f64> {
        self.high
    }

    pub fn low(&self) -> Option<f64> {
        self.low
    }

    /// Range size in points (0.0 until calculated)
    pub fn range(&self) -> f64 {
        match (self.high, self.low) {
            (Some(high), Some(low)) => high - low,
            _ => 0.0,
        }
    }

    pub fn midpoint(&self) -> Option<f64> {
        match (self.high, self.low) {
            (Some(high), Some(low)) => Some((high + low) / 2.0),
            _ => None,
        }
    }

    /// Price above the range high by more than `buffer`
    pub fn is_above_high(&self, price: f64, buffer: f64) -> bool {
        match self.high {
            Some(high) if self.calculated => price > high + buffer,
            _ => false,
        }
    }

    /// Price below the range low by more than `buffer`
    pub fn is_below_low(&self, price: f64, buffer: f64) -> bool {
        match self.low {
            Some(low) if self.calculated => price < low - buffer,
            _ => false,
        }
    }

    pub fn snapshot(&self) -> Option<RangeSnapshot> {
        match (self.high, self.low) {
            (Some(high), Some(low)) if self.calculated => Some(RangeSnapshot {
                high,
                low,
                range: high - low,
            }),
            _ => None,
        }
    }

    /// Reset for a new trading day
    pub fn reset(&mut self) {
        self.high = None;
        self.low = None;
        self.calculated = false;
        info!("Opening range reset");
    }

    #[cfg(test)]
    pub fn for_tests(high: f64, low: f64) -> Self {
        OpeningRange {
            or_minutes: 5,
            session_start: NaiveTime::from_hms_opt(9, 30, 0).expect("valid time"),
            timezone: chrono_tz::America::New_York,
            high: Some(high),
            low: Some(low),
            calculated: true,
        }
    }
}
