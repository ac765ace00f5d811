//! Calendar arithmetic for month-aligned schedules.
//!
//! Everything takes the current time as an argument so results are
//! deterministic; only the CLI reads the system clock.

use std::time::Duration;

use chrono::{DateTime, Datelike, LocalResult, Months, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

pub fn one_day() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

pub fn is_first_of_month(date: NaiveDate) -> bool {
    date.day() == 1
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?.checked_add_months(Months::new(1))
}

fn last_day_of_month(date: NaiveDate) -> Option<u32> {
    first_of_next_month(date)?.pred_opt().map(|d| d.day())
}

/// Map a wall-clock time to an instant in `tz`, moving forward past a DST gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest(),
    }
}

/// Local midnight on the first day of the month after `now`, in `now`'s zone.
pub fn next_month_start<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let midnight = first_of_next_month(now.naive_local().date())?.and_hms_opt(0, 0, 0)?;
    resolve_local(&now.timezone(), midnight)
}

/// Time left until [`next_month_start`]. Used as the initial delay of
/// month-aligned schedulers.
pub fn until_next_month_start<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    next_month_start(now)
        .and_then(|start| start.signed_duration_since(now.clone()).to_std().ok())
        .unwrap_or(Duration::ZERO)
}

/// Calendar condition a scheduler tick must satisfy before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarGate {
    /// Only on the 1st of the month.
    FirstOfMonth,
    /// Only on the given day; months shorter than that fire on their last day.
    DayOfMonth(u32),
}

impl CalendarGate {
    pub fn allows(&self, date: NaiveDate) -> bool {
        match self {
            CalendarGate::FirstOfMonth => is_first_of_month(date),
            CalendarGate::DayOfMonth(day) => {
                let last = last_day_of_month(date).unwrap_or(31);
                date.day() == (*day).clamp(1, last)
            }
        }
    }
}
