//! Resolves the timeframe phrase accepted by the `executionlogs` tool
//! into a concrete date window.

use chrono::{Days, Local, NaiveDate};

/// Wire format for `startDate` / `endDate` query parameters.
const DATE_FORMAT: &str = "%Y%m%d";

/// Days covered by "last week" and by the fallback window.
const DEFAULT_WINDOW_DAYS: u64 = 7;

/// Inclusive date range for an execution log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeframe {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Timeframe {
    /// Resolve a phrase against the local calendar date.
    pub fn resolve(phrase: &str) -> Self {
        Self::resolve_on(phrase, Local::now().date_naive())
    }

    /// Resolve a phrase against a given `today`.
    ///
    /// Only `"today"`, `"yesterday"` and `"last week"` are recognized.
    /// Anything else, including empty input, falls back to the last seven days.
    pub fn resolve_on(phrase: &str, today: NaiveDate) -> Self {
        match phrase {
            "today" => Self {
                start: today,
                end: today,
            },
            "yesterday" => {
                let day = days_before(today, 1);
                Self {
                    start: day,
                    end: day,
                }
            }
            "last week" => Self::trailing_window(today),
            _ => {
                tracing::debug!(phrase, "Unrecognized timeframe, using default window");
                Self::trailing_window(today)
            }
        }
    }

    fn trailing_window(today: NaiveDate) -> Self {
        Self {
            start: days_before(today, DEFAULT_WINDOW_DAYS),
            end: today,
        }
    }

    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

// Saturates at the earliest representable date instead of panicking.
fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}
