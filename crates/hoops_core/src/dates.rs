use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static DAY_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}\b").expect("day number regex"));

const FORMATS: &[&str] = &[
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Parses a schedule date cell such as `"Fri, Oct 3, 2025"`.
///
/// Cells without a day number (month separators like `"October"`) and any
/// unrecognised layout yield `None`; callers drop those rows.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() || !DAY_NUMBER.is_match(&cleaned) {
        return None;
    }
    // Weekday prefix is not validated against the date.
    let dated = match cleaned.split_once(", ") {
        Some((head, rest)) if head.chars().all(char::is_alphabetic) => rest,
        _ => cleaned.as_str(),
    };
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(dated, fmt).ok())
}
