//! Capture parsing for date productions.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Captures;
use std::collections::HashMap;

/// Month names and abbreviations to month numbers.
static MONTHS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("january", 1),
        ("jan", 1),
        ("february", 2),
        ("feb", 2),
        ("march", 3),
        ("mar", 3),
        ("april", 4),
        ("apr", 4),
        ("may", 5),
        ("june", 6),
        ("jun", 6),
        ("july", 7),
        ("jul", 7),
        ("august", 8),
        ("aug", 8),
        ("september", 9),
        ("sept", 9),
        ("sep", 9),
        ("october", 10),
        ("oct", 10),
        ("november", 11),
        ("nov", 11),
        ("december", 12),
        ("dec", 12),
    ])
});

/// Text of capture group `i`, if it participated.
pub fn group<'t>(caps: &Captures<'t>, i: usize) -> Option<&'t str> {
    caps.get(i).map(|m| m.as_str())
}

pub fn group_u32(caps: &Captures<'_>, i: usize) -> Option<u32> {
    group(caps, i)?.parse().ok()
}

/// Month number for a month name or abbreviation, case-insensitive.
pub fn month_number(word: &str) -> Option<u32> {
    MONTHS.get(word.to_ascii_lowercase().trim_end_matches('.')).copied()
}

pub fn is_month(month: u32) -> bool {
    (1..=12).contains(&month)
}

pub fn is_day(day: u32) -> bool {
    (1..=31).contains(&day)
}

/// True when `day` exists in `month` of `year` (29 February only in leap years).
pub fn is_day_of_month(day: u32, month: u32, year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, month, day).is_some()
}

/// Parse a year as written in posts: `2024`, `2k24`, `'24` or `24`.
///
/// Two-digit years are read as 20yy. The year range is applied later.
pub fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim_start_matches('\'');
    if let Some(yy) = text.strip_prefix("2k").or_else(|| text.strip_prefix("2K")) {
        return two_digit_year(yy);
    }
    match text.len() {
        4 if text.bytes().all(|b| b.is_ascii_digit()) => text.parse().ok(),
        2 => two_digit_year(text),
        _ => None,
    }
}

fn two_digit_year(yy: &str) -> Option<i32> {
    if yy.len() != 2 || !yy.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(2000 + yy.parse::<i32>().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn years() {
        assert_eq!(parse_year("2024"), Some(2024));
        assert_eq!(parse_year("2k24"), Some(2024));
        assert_eq!(parse_year("2K05"), Some(2005));
        assert_eq!(parse_year("'25"), Some(2025));
        assert_eq!(parse_year("25"), Some(2025));
        assert_eq!(parse_year("2k2"), None);
        assert_eq!(parse_year("202"), None);
        assert_eq!(parse_year("20x4"), None);
    }

    #[test]
    fn months() {
        assert_eq!(month_number("December"), Some(12));
        assert_eq!(month_number("sept"), Some(9));
        assert_eq!(month_number("jun."), Some(6));
        assert_eq!(month_number("smarch"), None);
    }

    #[test]
    fn days_of_month() {
        assert!(is_day_of_month(29, 2, 2024));
        assert!(!is_day_of_month(29, 2, 2023));
        assert!(!is_day_of_month(31, 4, 2024));
        assert!(!is_day_of_month(7, 19, 2025));
    }
}
