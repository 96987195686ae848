//! Conversions between the wire, display and sortable forms of dates and times.
//!
//! Wire time is the 24-hour `HH:mm[:ss]` string exchanged with the record
//! source. Display time is the 12-hour `h:mm AM/PM` string held by every
//! [`Appointment`](crate::storage::Appointment). Minutes since midnight are
//! only ever derived for ordering.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value;

/// Converts a wire time (`HH:mm`, `HH:mm:ss`, `HH:mm:ss.fffffff`) into
/// `h:mm AM/PM`. Returns an empty string when the input is empty or malformed.
///
/// ISO date-times such as `1970-01-01T09:00:00.000Z` are accepted too; only
/// their clock part is read.
pub fn normalize_time(raw: &str) -> String {
    match parse_wire_time(raw) {
        Some((hour, minute)) => display_time(hour, minute),
        None => String::new(),
    }
}

/// Minutes since midnight for a display time. Empty or malformed input is 0.
///
/// A string without an AM/PM suffix is read as 24-hour.
pub fn time_to_minutes(display: &str) -> u32 {
    let display = display.trim();
    let (clock, period) = match display.split_once(' ') {
        Some((clock, period)) => (clock, Some(period.trim())),
        None => (display, None),
    };

    let Some((h, m)) = clock.split_once(':') else {
        return 0;
    };
    let (Some(hours), Some(minutes)) = (parse_digits(h, 1, 2), parse_digits(m, 2, 2)) else {
        return 0;
    };
    if minutes > 59 {
        return 0;
    }

    let hours = match period {
        None if hours <= 23 => hours,
        Some(p) if (1..=12).contains(&hours) => {
            if p.eq_ignore_ascii_case("AM") {
                hours % 12
            } else if p.eq_ignore_ascii_case("PM") {
                hours % 12 + 12
            } else {
                return 0;
            }
        }
        _ => return 0,
    };

    hours * 60 + minutes
}

/// Converts form input into the wire form `HH:mm:00`.
///
/// Accepts 24-hour `HH:mm` (as produced by a time picker), `HH:mm:ss`, and
/// 12-hour `h:mm AM/PM` with or without the space.
pub fn to_wire_time(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let upper = input.to_ascii_uppercase();
    let twelve_hour = upper
        .strip_suffix("AM")
        .map(|rest| (rest, false))
        .or_else(|| upper.strip_suffix("PM").map(|rest| (rest, true)));

    let (hour, minute) = match twelve_hour {
        Some((clock, is_pm)) => {
            let (h, m) = clock.trim_end().split_once(':')?;
            let hour = parse_digits(h, 1, 2)?;
            let minute = parse_digits(m, 2, 2)?;
            if hour == 0 || hour > 12 || minute > 59 {
                return None;
            }
            let hour = match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            (hour, minute)
        }
        None if !input.contains('T') => parse_wire_time(input)?,
        None => return None,
    };

    Some(format!("{:02}:{:02}:00", hour, minute))
}

/// Truncates any date-like value to a local calendar date.
///
/// Strings go through [`parse_date`]; numbers are read as epoch milliseconds.
/// Null, `false`, `0` and the empty string are treated as missing.
pub fn normalize_date(raw: &Value) -> Option<NaiveDate> {
    match raw {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n
            .as_i64()
            .filter(|millis| *millis != 0)
            .and_then(|millis| Local.timestamp_millis_opt(millis).single())
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

/// Parses `YYYY-MM-DD`, RFC 3339 timestamps (shifted into local time) and
/// naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` date-times.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

/// Converts form input (`YYYY-MM-DD` or `DD/MM/YYYY`) into the wire form
/// `YYYY-MM-DD`.
pub fn to_wire_date(input: &str) -> Option<String> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%d/%m/%Y"))
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Grouping key for a day, e.g. `Sun Oct 18 2026`.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%a %b %d %Y").to_string()
}

/// Heading for a timeline day: `Today`, otherwise e.g. `Monday, October 19`.
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else {
        date.format("%A, %B %-d").to_string()
    }
}

fn display_time(hour: u32, minute: u32) -> String {
    let period = if hour >= 12 { "PM" } else { "AM" };
    let hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour, minute, period)
}

fn parse_wire_time(raw: &str) -> Option<(u32, u32)> {
    let raw = raw.trim();

    let clock = match raw.split_once('T') {
        Some((date, time)) if date.len() == 10 => {
            let end = time
                .find(|c: char| !(c.is_ascii_digit() || c == ':' || c == '.'))
                .unwrap_or(time.len());
            &time[..end]
        }
        Some(_) => return None,
        None => raw,
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return None;
    }

    let hour = parse_digits(parts[0], 1, 2)?;
    let minute = parse_digits(parts[1], 2, 2)?;
    if hour > 23 || minute > 59 {
        return None;
    }

    if let Some(seconds) = parts.get(2) {
        let (whole, fraction) = match seconds.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (*seconds, None),
        };
        if parse_digits(whole, 2, 2)? > 59 {
            return None;
        }
        if let Some(fraction) = fraction {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
        }
    }

    Some((hour, minute))
}

fn parse_digits(s: &str, min_len: usize, max_len: usize) -> Option<u32> {
    if s.len() < min_len || s.len() > max_len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
