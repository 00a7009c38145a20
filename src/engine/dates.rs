//! Date resolution.
//!
//! ```text
//! canonical text ── TriggerInfo::scan ──▶ active rules (buckets ⊆ scanned)
//!                                            │ in priority order,
//!                                            │ matches in text order
//!                                            v
//!                                  production validates captures
//!                                            │
//!                               year in range? ── no ──▶ skip (never clamp)
//!                                            │ yes
//!                                            v
//!                                 Matched(candidate, 100)
//!
//! nothing textual ── post timestamp in range? ──▶ Matched(PostTimestamp, 50)
//!                                         else ──▶ NotFound
//! ```

use super::trigger::TriggerInfo;
use crate::config::YearRange;
use crate::{Confidence, DateCandidate, DateSource, ExtractionResult, Rule};
use chrono::{Datelike, NaiveDateTime};
use once_cell::sync::Lazy;
use tracing::{debug, trace};

static DATE_RULES: Lazy<Vec<Rule>> = Lazy::new(crate::rules::date::get);

/// Confidence of a date read from the text.
pub const TEXT_CONFIDENCE: Confidence = 100.0;
/// Confidence of a date derived from the post timestamp.
pub const TIMESTAMP_CONFIDENCE: Confidence = 50.0;

/// Resolve a (month, year) for `text`, canonical or raw; rules ignore case.
pub fn resolve_date(
    text: &str,
    fallback_timestamp: Option<NaiveDateTime>,
    valid_years: YearRange,
) -> ExtractionResult<DateCandidate> {
    if let Some(candidate) = resolve_textual(text, valid_years) {
        return ExtractionResult::Matched { value: candidate, confidence: TEXT_CONFIDENCE };
    }

    match fallback_timestamp {
        Some(ts) if valid_years.contains(ts.year()) => {
            debug!(timestamp = %ts, "date taken from post timestamp");
            let value = DateCandidate { month: Some(ts.month()), year: ts.year(), source: DateSource::PostTimestamp };
            ExtractionResult::Matched { value, confidence: TIMESTAMP_CONFIDENCE }
        }
        Some(ts) => {
            debug!(timestamp = %ts, "post timestamp outside year range");
            ExtractionResult::NotFound
        }
        None => ExtractionResult::NotFound,
    }
}

fn resolve_textual(text: &str, valid_years: YearRange) -> Option<DateCandidate> {
    if text.is_empty() {
        return None;
    }

    let trigger = TriggerInfo::scan(text);
    for rule in DATE_RULES.iter().filter(|rule| trigger.allows(rule.buckets)) {
        for caps in rule.pattern.captures_iter(text) {
            let Some(raw) = (rule.production)(&caps) else {
                trace!(rule = rule.name, matched = &caps[0], "date match rejected by production");
                continue;
            };
            if !valid_years.contains(raw.year) {
                debug!(rule = rule.name, year = raw.year, "date candidate outside year range");
                continue;
            }
            trace!(rule = rule.name, matched = &caps[0], "date candidate accepted");
            return Some(DateCandidate { month: raw.month, year: raw.year, source: rule.source });
        }
    }
    None
}

/// Names of the date rules the trigger scan lets through for `text`.
pub fn active_rule_names(text: &str) -> Vec<&'static str> {
    let trigger = TriggerInfo::scan(text);
    DATE_RULES.iter().filter(|rule| trigger.allows(rule.buckets)).map(|rule| rule.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(8, 30, 0).unwrap()
    }

    #[test]
    fn text_date_beats_timestamp() {
        let result = resolve_date("december 2024", Some(timestamp(2025, 3, 1)), YearRange::default());
        assert_eq!(
            result,
            ExtractionResult::Matched {
                value: DateCandidate { month: Some(12), year: 2024, source: DateSource::MonthNameYear },
                confidence: TEXT_CONFIDENCE
            }
        );
    }

    #[test]
    fn timestamp_fallback_is_flagged_and_less_confident() {
        let result = resolve_date("no date in here", Some(timestamp(2025, 3, 1)), YearRange::default());
        let candidate = result.matched().unwrap();
        assert_eq!(candidate.source, DateSource::PostTimestamp);
        assert!(!candidate.source.is_text());
        assert_eq!((candidate.month, candidate.year), (Some(3), 2025));
        assert_eq!(result.confidence(), Some(TIMESTAMP_CONFIDENCE));
    }

    #[test]
    fn out_of_range_timestamp_is_not_found() {
        let result = resolve_date("", Some(timestamp(2009, 6, 1)), YearRange::default());
        assert_eq!(result, ExtractionResult::NotFound);
    }

    #[test]
    fn out_of_range_text_falls_back_to_timestamp() {
        let result = resolve_date("march 2030", Some(timestamp(2020, 4, 2)), YearRange::default());
        assert_eq!(result.matched().map(|c| (c.year, c.source)), Some((2020, DateSource::PostTimestamp)));
    }

    #[test]
    fn raw_mixed_case_text_keeps_the_month() {
        let result = resolve_date("Seen in December 2024", None, YearRange::default());
        assert_eq!(
            result.matched(),
            Some(&DateCandidate { month: Some(12), year: 2024, source: DateSource::MonthNameYear })
        );
    }

    #[test]
    fn custom_year_range() {
        let range = YearRange::new(2000, 2030);
        assert!(resolve_date("march 2030", None, range).is_matched());
        assert!(!resolve_date("march 2030", None, YearRange::default()).is_matched());
    }

    #[test]
    fn rules_are_gated_by_buckets() {
        assert!(active_rule_names("a jay by the pond").is_empty());
        assert_eq!(active_rule_names("seen in 2023"), vec!["bare year"]);
        assert!(active_rule_names("19/07/2025").contains(&"delimited day/month/year"));
        assert!(active_rule_names("2k24").contains(&"2k shorthand"));
    }
}
