//! Calendar gate for high-impact news days
//!
//! A pure function of calendar date: the engine asks once per day-rollover
//! whether trading is allowed and otherwise never consults the calendar.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Scheduled releases that typically move index futures, by (month, day).
/// Should be refreshed each year.
const NEWS_DAYS_2026: &[(u32, u32, &str)] = &[
    // FOMC meetings
    (1, 28, "FOMC Meeting"),
    (1, 29, "FOMC Meeting"),
    (3, 17, "FOMC Meeting"),
    (3, 18, "FOMC Meeting"),
    (4, 28, "FOMC Meeting"),
    (4, 29, "FOMC Meeting"),
    (6, 16, "FOMC Meeting"),
    (6, 17, "FOMC Meeting"),
    (7, 28, "FOMC Meeting"),
    (7, 29, "FOMC Meeting"),
    (9, 22, "FOMC Meeting"),
    (9, 23, "FOMC Meeting"),
    (11, 3, "FOMC Meeting"),
    (11, 4, "FOMC Meeting"),
    (12, 15, "FOMC Meeting"),
    (12, 16, "FOMC Meeting"),
    // Non-farm payrolls (first Friday of the month)
    (1, 9, "NFP"),
    (2, 6, "NFP"),
    (3, 6, "NFP"),
    (4, 3, "NFP"),
    (5, 8, "NFP"),
    (6, 5, "NFP"),
    (7, 3, "NFP"),
    (8, 7, "NFP"),
    (9, 4, "NFP"),
    (10, 2, "NFP"),
    (11, 6, "NFP"),
    (12, 4, "NFP"),
];

const TABLE_YEAR: i32 = 2026;

/// News-day lookup consumed by the engine as a boolean gate
#[derive(Debug, Clone)]
pub struct NewsCalendar {
    enabled: bool,
    events: BTreeMap<NaiveDate, String>,
}

impl NewsCalendar {
    pub fn new(enabled: bool) -> Self {
        let mut events = BTreeMap::new();
        for &(month, day, description) in NEWS_DAYS_2026 {
            if let Some(date) = NaiveDate::from_ymd_opt(TABLE_YEAR, month, day) {
                events.insert(date, description.to_string());
            }
        }
        NewsCalendar { enabled, events }
    }

    /// The event blocking trading on `date`, or `None` when trading is allowed
    pub fn blocking_event(&self, date: NaiveDate) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        if date.year() != TABLE_YEAR {
            return None;
        }
        self.events.get(&date).map(String::as_str)
    }

    /// Add a custom date to avoid
    pub fn add_date(&mut self, date: NaiveDate, description: impl Into<String>) {
        self.events.insert(date, description.into());
    }

    /// The next scheduled event strictly after `date`
    pub fn next_news_date(&self, date: NaiveDate) -> Option<(NaiveDate, &str)> {
        self.events
            .range(date.succ_opt()?..)
            .next()
            .map(|(d, desc)| (*d, desc.as_str()))
    }

    /// Log the gate decision at day rollover
    pub fn log_status(&self, date: NaiveDate) {
        if !self.enabled {
            return;
        }
        match self.blocking_event(date) {
            Some(event) => warn!("News filter: trading suspended today ({})", event),
            None => match self.next_news_date(date) {
                Some((next, event)) => {
                    info!("News filter: trading allowed. Next news day: {} ({})", next, event)
                }
                None => info!("News filter: trading allowed. No upcoming news days."),
            },
        }
    }
}
