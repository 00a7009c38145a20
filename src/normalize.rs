//! Text normalization.
//!
//! Every later stage matches against the *canonical* form produced here, and
//! every reference name (taxa, places) is pushed through the same
//! [`Normalizer`] when its index is built, so both sides of a comparison always
//! agree on case, diacritics and spelling variants.
//!
//! ```text
//! raw ──▶ drop invisible / control chars, fold curly quotes
//!     ──▶ fold_unicode    (NFKD, drop combining marks, NFC)
//!     ──▶ strip_urls      ("https://..", "www..")
//!     ──▶ strip_emoji
//!     ──▶ expand_hashtags ("#butterfly" -> "butterfly")
//!     ──▶ collapse whitespace                        = display
//!     ──▶ lowercase, fold again
//!     ──▶ alias table (longest match, to fixpoint)
//!     ──▶ collapse whitespace                        = canonical
//! ```
//!
//! Normalization is total: it never fails, and text without a single letter
//! or digit comes out empty. It is also idempotent on the canonical form,
//! which the alias table guarantees by refusing spellings whose canonical form
//! would trigger another alias.

use crate::config::NormalizeOptions;
use crate::Range;
use crate::error::ReferenceError;
use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Romanized spelling variants seen in Bangladeshi butterfly groups.
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("sreemongol", "srimangal"),
    ("srimongol", "srimangal"),
    ("sreemangal", "srimangal"),
    ("sri mangal", "srimangal"),
    ("chattagram", "chittagong"),
    ("chattogram", "chittagong"),
    ("ctg", "chittagong"),
    ("bandorban", "bandarban"),
    ("banderban", "bandarban"),
    ("khagrachori", "khagrachari"),
    ("khagrachhari", "khagrachari"),
    ("habigonj", "habiganj"),
    ("moulvibazar", "maulavi bazar"),
    ("moulavibazar", "maulavi bazar"),
    ("moulovibazar", "maulavi bazar"),
    ("moulvi bazar", "maulavi bazar"),
    ("coxbazar", "coxs bazar"),
    ("cox bazar", "coxs bazar"),
    ("cox's bazar", "coxs bazar"),
    ("chapainawabganj", "chapai nawabganj"),
    ("chapanawabganj", "chapai nawabganj"),
    ("sundarban", "sundarbans"),
    ("lawachora", "lawachara"),
    ("projapoti", "butterfly"),
];

/// Upper bound on alias rewriting passes.
const MAX_ALIAS_PASSES: usize = 8;

static BUILTIN_TABLE: Lazy<AliasTable> =
    Lazy::new(|| AliasTable::new(BUILTIN_ALIASES.iter().copied()).unwrap_or_else(|_| AliasTable::empty()));

/// Normalized text: a lowercase canonical form for matching plus a
/// case-preserving copy for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedText {
    canonical: String,
    display: String,
}

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn into_string(self) -> String {
        self.canonical
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Variant → canonical spelling table, applied on word boundaries. Of two
/// overlapping variants the longer wins.
#[derive(Debug, Clone)]
pub struct AliasTable {
    automaton: Option<AhoCorasick>,
    variants: Vec<String>,
    canonicals: Vec<String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self { automaton: None, variants: Vec::new(), canonicals: Vec::new() }
    }

    /// The built-in romanization table.
    pub fn builtin() -> Self {
        BUILTIN_TABLE.clone()
    }

    /// Build a table from `(variant, canonical)` pairs.
    ///
    /// Both sides are folded and lowercased first. Fails when a variant maps
    /// to two different spellings, or when a canonical spelling contains
    /// another variant (rewriting would then never settle).
    pub fn new<I, K, V>(pairs: I) -> Result<Self, ReferenceError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table: BTreeMap<String, String> = BTreeMap::new();
        for (variant, canonical) in pairs {
            let key = prepare_key(variant.as_ref());
            let value = prepare_key(canonical.as_ref());
            if key.is_empty() {
                return Err(ReferenceError::EmptyAlias { variant: variant.as_ref().to_string() });
            }
            if value.is_empty() {
                return Err(ReferenceError::EmptyAlias { variant: canonical.as_ref().to_string() });
            }
            if key == value {
                continue;
            }
            match table.get(&key) {
                Some(existing) if *existing != value => {
                    return Err(ReferenceError::AliasCollision { alias: key, first: existing.clone(), second: value });
                }
                Some(_) => {}
                None => {
                    table.insert(key, value);
                }
            }
        }

        if table.is_empty() {
            return Ok(Self::empty());
        }

        let (variants, canonicals): (Vec<String>, Vec<String>) = table.into_iter().unzip();
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&variants)
            .map_err(|err| ReferenceError::IndexBuild(err.to_string()))?;

        for (variant, canonical) in variants.iter().zip(&canonicals) {
            let retrigger = automaton
                .find_overlapping_iter(canonical.as_str())
                .find(|m| crate::at_word_boundary(canonical, m.start(), m.end()));
            if let Some(m) = retrigger {
                return Err(ReferenceError::UnstableAlias {
                    variant: variant.clone(),
                    canonical: canonical.clone(),
                    other: variants[m.pattern().as_usize()].clone(),
                });
            }
        }

        Ok(Self { automaton: Some(automaton), variants, canonicals })
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Rewrite every known variant in `text` (already lowercase).
    pub fn apply(&self, text: &str) -> String {
        let Some(automaton) = &self.automaton else {
            return text.to_string();
        };

        let mut current = text.to_string();
        for _ in 0..MAX_ALIAS_PASSES {
            match self.substitute_once(automaton, &current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    fn substitute_once(&self, automaton: &AhoCorasick, text: &str) -> Option<String> {
        let hits: Vec<(Range, usize)> = automaton
            .find_overlapping_iter(text)
            .filter(|m| crate::at_word_boundary(text, m.start(), m.end()))
            .map(|m| (Range { start: m.start(), end: m.end() }, m.pattern().as_usize()))
            .collect();
        if hits.is_empty() {
            return None;
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for (range, pattern) in crate::select_longest(hits) {
            out.push_str(&text[last..range.start]);
            out.push_str(&self.canonicals[pattern]);
            last = range.end;
        }
        out.push_str(&text[last..]);
        Some(out)
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Options plus alias table, shared read-only by every stage.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
    aliases: AliasTable,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions, aliases: AliasTable) -> Self {
        Self { options, aliases }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        normalize_with(text, &self.options, &self.aliases)
    }
}

/// Normalize with the built-in alias table.
pub fn normalize(text: &str, options: &NormalizeOptions) -> NormalizedText {
    normalize_with(text, options, &BUILTIN_TABLE)
}

pub fn normalize_with(text: &str, options: &NormalizeOptions, aliases: &AliasTable) -> NormalizedText {
    let mut s: String = text
        .chars()
        .filter(|c| !is_invisible(*c))
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{02BC}' => '\'',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    if options.fold_unicode {
        s = fold(&s);
    }
    if options.strip_urls {
        s = regex!(r"(?i)\b(?:https?://|www\.)\S+").replace_all(&s, " ").into_owned();
    }
    if options.strip_emoji {
        s = s.chars().map(|c| if is_emoji(c) { ' ' } else { c }).collect();
    }
    if options.expand_hashtags {
        s = regex!(r"#+(\w+)").replace_all(&s, "${1}").into_owned();
    }

    let display = collapse_whitespace(&s);
    if !display.chars().any(char::is_alphanumeric) {
        return NormalizedText::default();
    }

    let mut canonical = display.to_lowercase();
    if options.fold_unicode {
        canonical = fold(&canonical).to_lowercase();
    }
    if options.apply_alias_table {
        canonical = aliases.apply(&canonical);
    }

    NormalizedText { canonical: collapse_whitespace(&canonical), display }
}

/// Canonical key for alias table entries: folded, lowercase, single-spaced.
fn prepare_key(s: &str) -> String {
    collapse_whitespace(&fold(&s.to_lowercase()).to_lowercase())
}

fn fold(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F1E6..=0x1F1FF   // regional indicators (flags)
            | 0x1F300..=0x1F5FF // symbols & pictographs
            | 0x1F600..=0x1F64F // emoticons
            | 0x1F680..=0x1F6FF // transport & map
            | 0x1F900..=0x1F9FF // supplemental symbols (🦋)
            | 0x1FA70..=0x1FAFF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
            | 0xFE0F
    )
}
