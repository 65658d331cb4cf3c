// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" timestamp/duration handling so the
// rest of the code can assume clean, typed values.
use chrono::{Duration, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Timestamp layouts seen in real ticket exports. Tried in order; the first
/// match wins.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse a timestamp cell while being forgiving about the format drift that
/// is common in CSV/XLSX exports.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Tries the known datetime layouts, then bare dates (midnight).
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_datetime_safe(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a `HH:mm:ss` duration cell. Hours are unbounded (a ticket can take
/// longer than a day to close); minutes and seconds must be under 60.
pub fn parse_hms_duration(s: Option<&str>) -> Option<Duration> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let mut parts = s.split(':');
    let h: i64 = parts.next()?.trim().parse().ok()?;
    let m: i64 = parts.next()?.trim().parse().ok()?;
    let sec: i64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || h < 0 || !(0..60).contains(&m) || !(0..60).contains(&sec) {
        return None;
    }
    Some(Duration::seconds(h * 3600 + m * 60 + sec))
}

/// Render a duration back into the export's `HH:mm:ss` layout.
pub fn format_hms(d: Duration) -> String {
    let total = d.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `"YYYY-MM"` month bucket for a creation timestamp. Lexicographic order on
/// the result is chronological order, which is what the monthly reports sort
/// by.
pub fn month_key(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m").to_string()
}

pub fn duration_hours(d: Duration) -> f64 {
    d.num_seconds() as f64 / 3600.0
}

/// Arithmetic mean; `None` for an empty slice so callers surface "no data"
/// instead of a fake zero.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
