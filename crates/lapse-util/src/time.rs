//! Time utilities for lapse
//!
//! Lifecycle decisions never read the clock themselves: callers resolve
//! "now" once per run and pass it down. This module provides that single
//! clock read plus the calendar arithmetic used on stop-after dates.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `LAPSE_MOCK_TIME` environment variable can be set
//! to override the system time. This is useful for replaying a run as if it
//! happened on another day.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! LAPSE_MOCK_TIME="2025-12-25 14:30:00" lapse notify --dry-run
//! ```

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "LAPSE_MOCK_TIME";

/// chrono format of a stop-after date and of warning annotations
pub const TAG_DATE_FORMAT: &str = "%Y-%m-%d";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                if let Ok(naive_dt) =
                    NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S")
                {
                    if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        "Failed to convert mock time to local timezone"
                    );
                } else {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = "%Y-%m-%d %H:%M:%S",
                        "Invalid mock time format"
                    );
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
///
/// Only entry points call this. Everything below them takes `now` as a
/// parameter.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Local noon on the given day.
///
/// Used when replaying a run for a specific date: noon is never skipped or
/// repeated by a DST transition.
pub fn at_local_noon(date: NaiveDate) -> Option<DateTime<Local>> {
    let noon = NaiveTime::from_hms_opt(12, 0, 0)?;
    Local.from_local_datetime(&date.and_time(noon)).earliest()
}

/// Parse a stop-after tag value.
///
/// The accepted shape is exactly `YYYY-MM-DD`: four digit year, two digit
/// month, two digit day, hyphen separated, nothing before or after. chrono's
/// `%Y-%m-%d` alone also accepts `2019-1-2` and signed years, so the shape is
/// checked first. Returns `None` for any other text or for an impossible
/// calendar date such as `2024-13-40`.
pub fn parse_tag_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 {
        return None;
    }

    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(value, TAG_DATE_FORMAT).ok()
}

/// Format a date the way it is written into tags
pub fn format_tag_date(date: NaiveDate) -> String {
    date.format(TAG_DATE_FORMAT).to_string()
}

/// Signed number of days from `today` until `target`. Negative when the
/// target is in the past.
pub fn days_until(target: NaiveDate, today: NaiveDate) -> i64 {
    target.signed_duration_since(today).num_days()
}

/// Whether `date` falls in the weekend stop window.
///
/// Friday counts as weekend so instances scheduled to stop "on weekends" are
/// stopped when the last working day's run happens.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Fri | Weekday::Sat | Weekday::Sun)
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
