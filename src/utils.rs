use crate::error::{Result, SalesPerformanceError};
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, Utc};

const SECONDS_PER_HOUR: i32 = 3600;
const MAX_OFFSET_HOURS: i32 = 23;

/// Builds the fixed offset used to turn stored UTC instants into business-day dates.
pub fn offset_from_hours(utc_offset_hours: i32) -> Result<FixedOffset> {
    if utc_offset_hours.abs() > MAX_OFFSET_HOURS {
        return Err(SalesPerformanceError::InvalidParameter {
            name: "utcHourDifference".to_string(),
            value: utc_offset_hours.to_string(),
            reason: format!("offset must be within ±{} hours", MAX_OFFSET_HOURS),
        });
    }

    FixedOffset::east_opt(utc_offset_hours * SECONDS_PER_HOUR).ok_or_else(|| {
        SalesPerformanceError::InvalidParameter {
            name: "utcHourDifference".to_string(),
            value: utc_offset_hours.to_string(),
            reason: "offset is out of range".to_string(),
        }
    })
}

/// Shifts an instant into the given offset and truncates it to a calendar date.
pub fn shifted_date(instant: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    instant.with_timezone(offset).date_naive()
}

/// Number of calendar days from `start` to `end` (negative when `end` precedes `start`).
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

pub fn next_day(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(1))
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Parses an instant sent by the reporting front-end.
///
/// Accepts RFC 3339 (`2024-01-01T15:00:00.000Z`, `2024-01-02T00:00:00+09:00`) and
/// zone-less `YYYY-MM-DDTHH:MM:SS[.fff]`, which is taken as UTC.
pub fn parse_instant(name: &str, raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| SalesPerformanceError::InvalidParameter {
            name: name.to_string(),
            value: raw.to_string(),
            reason: format!("expected an ISO-8601 instant ({})", e),
        })
}

/// Parses a comma-separated list of instants, skipping empty segments.
pub fn parse_instant_list(name: &str, raw: &str) -> Result<Vec<DateTime<Utc>>> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| parse_instant(name, segment))
        .collect()
}
