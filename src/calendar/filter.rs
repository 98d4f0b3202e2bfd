// src/calendar/filter.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};

use super::types::{EconomicEvent, FeedSnapshot, Impact};

/// Time window a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Local calendar date of "now".
    Today,
    /// Sunday through Saturday of the week containing "now".
    CurrentWeek,
    /// No date restriction; the feed itself spans one week.
    Snapshot,
}

/// Currencies whose Medium-impact events are still worth reporting.
pub const MEDIUM_IMPACT_COUNTRIES: [&str; 2] = ["EUR", "USD"];

/// High always; Medium only for EUR/USD. Anything else (incl. unknown) is noise.
pub fn is_actionable(ev: &EconomicEvent) -> bool {
    match ev.impact {
        Impact::High => true,
        Impact::Medium => MEDIUM_IMPACT_COUNTRIES.contains(&ev.country.as_str()),
        _ => false,
    }
}

/// Inclusive local-date bounds of `window` around `today`.
pub fn window_bounds(window: Window, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    match window {
        Window::Today => Some((today, today)),
        Window::CurrentWeek => {
            let back = i64::from(today.weekday().num_days_from_sunday());
            let start = today - Duration::days(back);
            Some((start, start + Duration::days(6)))
        }
        Window::Snapshot => None,
    }
}

/// Actionable events of `snapshot` inside `window`, in snapshot order.
/// Event dates are compared in `now`'s time zone.
pub fn filter<Tz: TimeZone>(
    snapshot: &FeedSnapshot,
    window: Window,
    now: &DateTime<Tz>,
) -> Vec<EconomicEvent> {
    let tz = now.timezone();
    let bounds = window_bounds(window, now.date_naive());

    snapshot
        .events
        .iter()
        .filter(|ev| is_actionable(ev))
        .filter(|ev| match bounds {
            None => true,
            Some((start, end)) => {
                let local = ev.date.with_timezone(&tz).date_naive();
                start <= local && local <= end
            }
        })
        .cloned()
        .collect()
}
