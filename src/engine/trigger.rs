//! Trigger scanning (input pre-classification).
//!
//! Before any date regex runs, the canonical text is scanned once for coarse
//! signals. Each date rule declares the buckets it needs and is skipped when
//! the text cannot possibly contain its shape: most posts carry no digits at
//! all, and those never reach the regex engine.
//!
//! This is a *heuristic* scan. False positives are fine because the rule still
//! has to match its full pattern; false negatives are bugs.

bitflags::bitflags! {
    /// Coarse buckets for fast input classification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BucketMask: u32 {
        /// Any ASCII digit.
        const HAS_DIGITS = 1 << 0;
        /// A whole word that is a month name or abbreviation.
        const MONTHISH   = 1 << 1;
        /// `2k` directly followed by a digit.
        const SHORTHAND  = 1 << 2;
        /// A digit, one of `/ - .`, then a digit.
        const DELIMITED  = 1 << 3;
    }
}

const MONTHS: &[&str] = &[
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
    "jan",
    "feb",
    "mar",
    "apr",
    "jun",
    "jul",
    "aug",
    "sep",
    "sept",
    "oct",
    "nov",
    "dec",
];

/// Input characteristics detected from the canonical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerInfo {
    pub buckets: BucketMask,
}

impl TriggerInfo {
    /// Scan `input` for coarse buckets. Case-insensitive, so raw text works
    /// as well as canonical text.
    pub fn scan(input: &str) -> Self {
        let mut buckets = BucketMask::empty();
        let bytes = input.as_bytes();

        if bytes.iter().any(u8::is_ascii_digit) {
            buckets |= BucketMask::HAS_DIGITS;
        }

        if input.split(|c: char| !c.is_ascii_alphabetic()).any(|word| MONTHS.iter().any(|month| month.eq_ignore_ascii_case(word))) {
            buckets |= BucketMask::MONTHISH;
        }

        if bytes.windows(3).any(|w| w[0] == b'2' && matches!(w[1], b'k' | b'K') && w[2].is_ascii_digit()) {
            buckets |= BucketMask::SHORTHAND;
        }

        if bytes.windows(3).any(|w| w[0].is_ascii_digit() && matches!(w[1], b'/' | b'-' | b'.') && w[2].is_ascii_digit())
        {
            buckets |= BucketMask::DELIMITED;
        }

        TriggerInfo { buckets }
    }

    /// True when every bucket in `required` was seen.
    pub fn allows(&self, required: BucketMask) -> bool {
        self.buckets.contains(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_buckets() {
        assert_eq!(TriggerInfo::scan("saw a common jay near the stream").buckets, BucketMask::empty());
    }

    #[test]
    fn month_words_need_whole_word_match() {
        assert!(TriggerInfo::scan("seen in december").buckets.contains(BucketMask::MONTHISH));
        assert!(TriggerInfo::scan("march'25").buckets.contains(BucketMask::MONTHISH));
        assert!(!TriggerInfo::scan("marching decembrists").buckets.contains(BucketMask::MONTHISH));
    }

    #[test]
    fn scan_ignores_case() {
        let info = TriggerInfo::scan("December 2K24");
        assert!(info.allows(BucketMask::MONTHISH | BucketMask::SHORTHAND | BucketMask::HAS_DIGITS));
    }

    #[test]
    fn shorthand_and_delimiters() {
        let info = TriggerInfo::scan("2k24 on 19/07/2025");
        assert!(info.allows(BucketMask::SHORTHAND | BucketMask::DELIMITED | BucketMask::HAS_DIGITS));

        let info = TriggerInfo::scan("2 kids, 12 - 5");
        assert!(!info.buckets.contains(BucketMask::SHORTHAND));
        assert!(!info.buckets.contains(BucketMask::DELIMITED));
    }

    #[test]
    fn empty_requirement_is_always_allowed() {
        assert!(TriggerInfo::scan("").allows(BucketMask::empty()));
    }
}
