//! Date helper functions

use chrono::{DateTime, TimeZone, Utc};

/// Format a date using Moment.js-compatible format string
///
/// # Examples
/// ```ignore
/// format_date(&date, "YYYY-MM-DD") // -> "2024-01-15"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    date.format(&chrono_format).to_string()
}

/// Resolve an IANA timezone name; empty or unknown names fall back to UTC
pub fn site_timezone(name: &str) -> chrono_tz::Tz {
    if name.trim().is_empty() {
        return chrono_tz::UTC;
    }
    name.parse::<chrono_tz::Tz>().unwrap_or_else(|_| {
        tracing::warn!("Unknown timezone {:?}, showing dates in UTC", name);
        chrono_tz::UTC
    })
}

/// A timestamp ready for a `<time>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDate {
    /// Machine readable, with the site offset
    pub iso: String,
    /// Formatted with the site date format
    pub display: String,
}

/// Show `date` in the site timezone
pub fn display_date(date: DateTime<Utc>, timezone: &str, format: &str) -> DisplayDate {
    let local = date.with_timezone(&site_timezone(timezone));
    DisplayDate {
        iso: local.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
        display: format_date(&local, format),
    }
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest patterns first within each unit
    let replacements = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("ZZ", "%z"),
        ("SSS", "%3f"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}
