//! Bar ingest and rolling window
//!
//! A fixed-capacity, time-ordered buffer of OHLCV bars for a single
//! instrument, with the range/average queries the strategy layer needs.
//! Also provides the CSV loader used by the `replay` command.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::types::Bar;

const DEFAULT_CAPACITY: usize = 1000;

/// Rolling window of the most recent bars, oldest first
#[derive(Debug, Clone)]
pub struct BarWindow {
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl BarWindow {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BarWindow {
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a bar, evicting the oldest once at capacity
    pub fn push(&mut self, bar: Bar) {
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Bars with `start <= timestamp <= end`
    pub fn bars_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &Bar> {
        self.bars
            .iter()
            .filter(move |b| b.timestamp >= start && b.timestamp <= end)
    }

    /// Highest high and lowest low over `[start, end]`, or `None` when no
    /// bars fall in the interval
    pub fn high_low_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for bar in self.bars_between(start, end) {
            range = Some(match range {
                Some((high, low)) => (high.max(bar.high), low.min(bar.low)),
                None => (bar.high, bar.low),
            });
        }
        range
    }

    /// Average volume over the last `lookback` bars (0.0 when empty)
    pub fn average_volume(&self, lookback: usize) -> f64 {
        if self.bars.is_empty() || lookback == 0 {
            return 0.0;
        }
        let start = self.bars.len().saturating_sub(lookback);
        let recent = self.bars.iter().skip(start);
        let (total, count) = recent.fold((0u64, 0usize), |(sum, n), b| (sum + b.volume, n + 1));
        total as f64 / count as f64
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }
}

impl Default for BarWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Load bars from a CSV file with header
/// `timestamp,open,high,low,close,volume`.
///
/// Timestamps are either RFC 3339, or naive `YYYY-MM-DD HH:MM:SS` interpreted
/// in `timezone` (so replay files can use exchange-local session times).
pub fn load_bars_csv(path: impl AsRef<Path>, timezone: Tz) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open bar file {}", path.display()))?;

    let mut bars = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Bad CSV record at line {}", i + 2))?;
        if record.len() < 6 {
            anyhow::bail!("Line {}: expected 6 columns, got {}", i + 2, record.len());
        }

        let timestamp = parse_timestamp(&record[0], timezone)
            .with_context(|| format!("Line {}: bad timestamp '{}'", i + 2, &record[0]))?;
        let open: f64 = record[1].trim().parse()?;
        let high: f64 = record[2].trim().parse()?;
        let low: f64 = record[3].trim().parse()?;
        let close: f64 = record[4].trim().parse()?;
        let volume: u64 = record[5].trim().parse()?;

        let bar = Bar::new(timestamp, open, high, low, close, volume)
            .with_context(|| format!("Line {}: OHLC invariant violated", i + 2))?;
        bars.push(bar);
    }

    Ok(bars)
}

fn parse_timestamp(s: &str, timezone: Tz) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")?;
    let local = timezone
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow::anyhow!("nonexistent local time {}", naive))?;
    Ok(local.with_timezone(&Utc))
}
