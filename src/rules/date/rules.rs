use crate::engine::BucketMask;
use crate::rules::date::helpers::{group, group_u32, is_day, is_day_of_month, is_month, month_number, parse_year};
use crate::{DateSource, RawDate, Rule};

// Every month pattern below spells out the same alternation:
// jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?
//
// There is no `\b` after the month: what follows must start with a digit, a
// separator or an apostrophe, so "december2024" matches and "marching" does not.

/// "19 july 2025", "3rd dec 2k24", "19-jul-25", "19.jul.2025", "19jul2025"
///
/// A two-digit year must be joined by `-`, `/`, `.` or an apostrophe.
fn rule_day_month_year() -> Rule {
    rule! {
        name: "day month-name year",
        source: DateSource::MonthNameYear,
        pattern: r"(?i)\b([0-3]?\d)(?:st|nd|rd|th)?[\s\-/.]*(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)(?:\.?[\s,\-/.]*(\d{4}|2k\d{2})|[\-/.](\d{2})|\.?\s*'\s*(\d{2}))\b",
        buckets: BucketMask::MONTHISH | BucketMask::HAS_DIGITS,
        prod: |caps| {
            let day = group_u32(caps, 1)?;
            let month = month_number(group(caps, 2)?)?;
            let year = parse_year(group(caps, 3).or_else(|| group(caps, 4)).or_else(|| group(caps, 5))?)?;
            is_day(day).then_some(RawDate { month: Some(month), year })
        }
    }
}

/// "july 06, 2025", "dec 3rd 2024"
fn rule_month_day_year() -> Rule {
    rule! {
        name: "month-name day year",
        source: DateSource::MonthNameYear,
        pattern: r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s*([0-3]?\d)(?:st|nd|rd|th)?,?\s+(\d{4}|2k\d{2})\b",
        buckets: BucketMask::MONTHISH | BucketMask::HAS_DIGITS,
        prod: |caps| {
            let month = month_number(group(caps, 1)?)?;
            let day = group_u32(caps, 2)?;
            let year = parse_year(group(caps, 3)?)?;
            is_day(day).then_some(RawDate { month: Some(month), year })
        }
    }
}

/// "december 2024", "dec-2024", "march'25", "jan 2k25", "dec2024"
///
/// Bare two-digit years need the apostrophe: "may 20 people" is not a date.
fn rule_month_year() -> Rule {
    rule! {
        name: "month-name year",
        source: DateSource::MonthNameYear,
        pattern: r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?(?:[\s,\-/.]*(\d{4}|2k\d{2})|\s*'\s*(\d{2}))\b",
        buckets: BucketMask::MONTHISH | BucketMask::HAS_DIGITS,
        prod: |caps| {
            let month = month_number(group(caps, 1)?)?;
            let year = parse_year(group(caps, 2).or_else(|| group(caps, 3))?)?;
            Some(RawDate { month: Some(month), year })
        }
    }
}

/// "12/2024", "3-2025"; never the tail of "19/07/2025". "1.2024" reads like a
/// version number, so `.` is not a separator here.
fn rule_numeric_month_year() -> Rule {
    rule! {
        name: "numeric month/year",
        source: DateSource::NumericMonthYear,
        pattern: r"(?:^|[^\d/\-.])(0?[1-9]|1[0-2])[/\-](\d{4})\b",
        buckets: BucketMask::DELIMITED,
        prod: |caps| {
            let month = group_u32(caps, 1)?;
            let year = parse_year(group(caps, 2)?)?;
            is_month(month).then_some(RawDate { month: Some(month), year })
        }
    }
}

/// "2024-12", "2024/3"
fn rule_numeric_year_month() -> Rule {
    rule! {
        name: "numeric year-month",
        source: DateSource::NumericMonthYear,
        pattern: r"\b(20\d{2})[/\-](0?[1-9]|1[0-2])\b",
        buckets: BucketMask::DELIMITED,
        prod: |caps| {
            let year = parse_year(group(caps, 1)?)?;
            let month = group_u32(caps, 2)?;
            is_month(month).then_some(RawDate { month: Some(month), year })
        }
    }
}

/// "2k24"
fn rule_year_shorthand() -> Rule {
    rule! {
        name: "2k shorthand",
        source: DateSource::YearShorthand,
        pattern: r"(?i)\b(2k\d{2})\b",
        buckets: BucketMask::SHORTHAND,
        prod: |caps| {
            Some(RawDate { month: None, year: parse_year(group(caps, 1)?)? })
        }
    }
}

/// "19/07/2025", "19-07-25", "19.07.2025"
///
/// Both separators must be the same. Read day-first; when that is not a real
/// date, month-first ("07/19/2025"), except for dotted dates, which are
/// always day-first ("10.30.24" is a time, not October).
fn rule_delimited_date() -> Rule {
    rule! {
        name: "delimited day/month/year",
        source: DateSource::DelimitedDate,
        pattern: r"\b([0-3]?\d)([/\-.])([0-3]?\d)([/\-.])(\d{4}|\d{2})\b",
        buckets: BucketMask::DELIMITED,
        prod: |caps| {
            let separator = group(caps, 2)?;
            if group(caps, 4)? != separator {
                return None;
            }
            let first = group_u32(caps, 1)?;
            let second = group_u32(caps, 3)?;
            let year = parse_year(group(caps, 5)?)?;
            let month = if is_day_of_month(first, second, year) {
                second
            } else if separator != "." && is_day_of_month(second, first, year) {
                first
            } else {
                return None;
            };
            Some(RawDate { month: Some(month), year })
        }
    }
}

/// "seen in 2023"
fn rule_year_only() -> Rule {
    rule! {
        name: "bare year",
        source: DateSource::YearOnly,
        pattern: r"\b(20\d{2})\b",
        buckets: BucketMask::HAS_DIGITS,
        prod: |caps| {
            Some(RawDate { month: None, year: parse_year(group(caps, 1)?)? })
        }
    }
}

/// All date rules, in priority order.
pub fn get() -> Vec<Rule> {
    vec![
        rule_day_month_year(),
        rule_month_day_year(),
        rule_month_year(),
        rule_numeric_month_year(),
        rule_numeric_year_month(),
        rule_year_shorthand(),
        rule_delimited_date(),
        rule_year_only(),
    ]
}
