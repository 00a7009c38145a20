//! Reference taxonomy and the fuzzy species matcher.
//!
//! ```text
//! canonical text ── tokenize ──▶ windows of 1..=N words ("common", "common jay", ...)
//!                                    │
//!                                    │  × every reference name (common + "genus species")
//!                                    │    skipped when the length bound alone misses the threshold
//!                                    v
//!                            best score per taxon (+ first byte position)
//!                                    │
//!                                    v
//!                            rank_candidates ── Matched | Ambiguous | NotFound
//! ```
//!
//! N is 3, or the word count of the longest reference name if that is larger.
//! Keeping only the best score per taxon is equivalent to keeping the best
//! entry per window first: a score that loses inside its window is below the
//! global top by construction.

use super::resolve::{EPS, Scored, rank_candidates};
use super::similarity::{Levenshtein, Similarity};
use crate::error::ReferenceError;
use crate::normalize::Normalizer;
use crate::{ExtractionResult, Range, ReferenceTaxon};
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

const MIN_WINDOW: usize = 3;

/// One searchable spelling of a taxon.
#[derive(Debug, Clone)]
struct NameKey {
    text: String,
    chars: usize,
    taxon: usize,
}

/// Validated, immutable reference taxonomy.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTaxonomy {
    taxa: Vec<ReferenceTaxon>,
    names: Vec<NameKey>,
    max_words: usize,
}

impl ReferenceTaxonomy {
    /// Validate and index `taxa`.
    ///
    /// Genus and species are trimmed and lowercased and must be single words.
    /// A `(genus, species)` pair listed twice with the same common name is
    /// merged; with different common names it is an error. Rows are numbered
    /// from 1 in errors.
    pub fn build(
        taxa: impl IntoIterator<Item = ReferenceTaxon>,
        normalizer: &Normalizer,
    ) -> Result<Self, ReferenceError> {
        let mut seen: BTreeMap<(String, String), usize> = BTreeMap::new();
        let mut accepted: Vec<ReferenceTaxon> = Vec::new();

        for (idx, taxon) in taxa.into_iter().enumerate() {
            let row = idx + 1;
            let genus = epithet(row, "genus", &taxon.genus)?;
            let species = epithet(row, "species", &taxon.species)?;
            let common_name = taxon.common_name.split_whitespace().collect::<Vec<_>>().join(" ");

            match seen.get(&(genus.clone(), species.clone())) {
                Some(&existing) if accepted[existing].common_name == common_name => {
                    debug!(row, genus = %genus, species = %species, "merged duplicate taxon row");
                }
                Some(&existing) => {
                    return Err(ReferenceError::DuplicateTaxon {
                        genus,
                        species,
                        first: accepted[existing].common_name.clone(),
                        second: common_name,
                    });
                }
                None => {
                    seen.insert((genus.clone(), species.clone()), accepted.len());
                    accepted.push(ReferenceTaxon { genus, species, common_name });
                }
            }
        }

        let mut names: Vec<NameKey> = Vec::new();
        for (id, taxon) in accepted.iter().enumerate() {
            let scientific = name_key(normalizer, &taxon.scientific_name());
            let common = name_key(normalizer, &taxon.common_name);
            for text in [scientific, common] {
                if text.is_empty() || names.iter().any(|n| n.taxon == id && n.text == text) {
                    continue;
                }
                names.push(NameKey { chars: text.chars().count(), text, taxon: id });
            }
        }

        let max_words = names.iter().map(|n| n.text.split(' ').count()).max().unwrap_or(0).max(MIN_WINDOW);
        info!(taxa = accepted.len(), names = names.len(), "reference taxonomy built");

        Ok(Self { taxa: accepted, names, max_words })
    }

    pub fn taxa(&self) -> &[ReferenceTaxon] {
        &self.taxa
    }

    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    pub fn find(&self, genus: &str, species: &str) -> Option<&ReferenceTaxon> {
        self.taxa.iter().find(|t| t.genus.eq_ignore_ascii_case(genus) && t.species.eq_ignore_ascii_case(species))
    }
}

fn epithet(row: usize, field: &'static str, raw: &str) -> Result<String, ReferenceError> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Err(ReferenceError::EmptyTaxonField { row, field });
    }
    if !value.chars().all(|c| c.is_alphabetic() || c == '-') {
        return Err(ReferenceError::MalformedTaxonField { row, field, value: raw.trim().to_string() });
    }
    Ok(value)
}

fn name_key(normalizer: &Normalizer, name: &str) -> String {
    let normalized = normalizer.normalize(name);
    tokenize(normalized.as_str()).into_iter().map(|(_, word)| word).collect::<Vec<_>>().join(" ")
}

/// Split into words of letters, digits, `-` and `'`, trimmed of edge
/// punctuation.
pub(crate) fn tokenize(text: &str) -> Vec<(Range, &str)> {
    fn push<'a>(tokens: &mut Vec<(Range, &'a str)>, text: &'a str, start: usize, end: usize) {
        let raw = &text[start..end];
        let word = raw.trim_matches(|c: char| c == '-' || c == '\'');
        if word.is_empty() {
            return;
        }
        let offset = start + (raw.len() - raw.trim_start_matches(|c: char| c == '-' || c == '\'').len());
        tokens.push((Range { start: offset, end: offset + word.len() }, word));
    }

    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        let word_char = c.is_alphanumeric() || c == '-' || c == '\'';
        match (word_char, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                push(&mut tokens, text, s, i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        push(&mut tokens, text, s, text.len());
    }
    tokens
}

/// Match species mentions in canonical `text` with the default Levenshtein scorer.
pub fn match_species(text: &str, taxonomy: &ReferenceTaxonomy, threshold: f64) -> ExtractionResult<ReferenceTaxon> {
    match_species_with(text, taxonomy, threshold, &Levenshtein)
}

pub fn match_species_with(
    text: &str,
    taxonomy: &ReferenceTaxonomy,
    threshold: f64,
    similarity: &dyn Similarity,
) -> ExtractionResult<ReferenceTaxon> {
    if text.is_empty() || taxonomy.is_empty() {
        return ExtractionResult::NotFound;
    }

    let tokens = tokenize(text);
    let mut best: Vec<Option<Scored>> = vec![None; taxonomy.len()];

    for start in 0..tokens.len() {
        let widest = taxonomy.max_words.min(tokens.len() - start);
        for width in 1..=widest {
            let words = &tokens[start..start + width];
            let window = words.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" ");
            let window_chars = window.chars().count();
            let position = words[0].0.start;

            for name in &taxonomy.names {
                if similarity.upper_bound(window_chars, name.chars) + EPS < threshold {
                    continue;
                }
                let score = similarity.score(&window, &name.text);
                if score + EPS < threshold {
                    continue;
                }
                trace!(window = %window, name = %name.text, score, "species window scored");

                let slot = &mut best[name.taxon];
                if slot.is_none_or(|kept| score > kept.score + EPS) {
                    *slot = Some(Scored { id: name.taxon, score, position });
                }
            }
        }
    }

    let candidates: Vec<Scored> = best.into_iter().flatten().collect();
    rank_candidates(&candidates, threshold, |id| taxonomy.taxa[id].clone())
}

/// Parse a binomial out of a scientific-name cell.
///
/// Bracketed annotations and tokens containing digits (authors' years) are
/// dropped; trinomials keep genus and species only.
///
/// ```
/// use fieldnote::parse_scientific_name;
///
/// assert_eq!(parse_scientific_name("Graphium doson doson"), Some(("graphium".into(), "doson".into())));
/// assert_eq!(parse_scientific_name("Papilio (Princeps) polytes Linnaeus, 1758").unwrap().1, "polytes");
/// assert_eq!(parse_scientific_name("Graphium"), None);
/// ```
pub fn parse_scientific_name(raw: &str) -> Option<(String, String)> {
    let cleaned = regex!(r"\([^)]*\)|\[[^\]]*\]").replace_all(raw, " ");
    let mut words = cleaned
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .filter(|w| !w.is_empty() && w.chars().all(|c| c.is_alphabetic() || c == '-'));

    let genus = words.next()?.to_lowercase();
    let species = words.next()?.to_lowercase();
    Some((genus, species))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn taxonomy(taxa: Vec<ReferenceTaxon>) -> ReferenceTaxonomy {
        ReferenceTaxonomy::build(taxa, &Normalizer::default()).unwrap()
    }

    fn checklist() -> ReferenceTaxonomy {
        taxonomy(vec![
            ReferenceTaxon::new("Graphium", "doson", "Common Jay"),
            ReferenceTaxon::new("graphium", "agamemnon", "Tailed Jay"),
            ReferenceTaxon::new("papilio", "demoleus", "Lime Butterfly"),
            ReferenceTaxon::new("papilio", "polytes", "Common Mormon"),
        ])
    }

    fn canonical(text: &str) -> String {
        Normalizer::default().normalize(text).into_string()
    }

    #[test]
    fn tokenize_trims_edge_punctuation() {
        let words: Vec<&str> = tokenize("'common jay', -lime- butterfly!").into_iter().map(|(_, w)| w).collect();
        assert_eq!(words, vec!["common", "jay", "lime", "butterfly"]);

        let tokens = tokenize("a 'jay'");
        assert_eq!(tokens[1].0, Range { start: 3, end: 6 });
    }

    #[test]
    fn exact_scientific_name_scores_100() {
        let result = match_species(&canonical("Found Papilio polytes near the pond"), &checklist(), 95.0);
        assert_eq!(
            result,
            ExtractionResult::Matched { value: ReferenceTaxon::new("papilio", "polytes", "Common Mormon"), confidence: 100.0 }
        );
    }

    #[test]
    fn common_name_matches() {
        let result = match_species(&canonical("Spotted a Common Jay in Srimangal"), &checklist(), 95.0);
        assert_eq!(result.matched().map(|t| t.species.as_str()), Some("doson"));
    }

    #[test]
    fn tolerates_a_typo_in_long_names() {
        let taxa = taxonomy(vec![ReferenceTaxon::new("graphium", "agamemnon", "Tailed Green Jay Swallowtail")]);
        // 1 edit over 28 chars
        let result = match_species("a tailed green jay swallowtaol today", &taxa, 95.0);
        assert!(result.is_matched());
        assert!(result.confidence().unwrap() < 100.0);
    }

    #[test]
    fn below_threshold_is_not_found() {
        assert_eq!(match_species("common jy", &checklist(), 95.0), ExtractionResult::NotFound);
        assert_eq!(match_species("", &checklist(), 95.0), ExtractionResult::NotFound);
    }

    #[test]
    fn two_taxa_at_top_score_are_ambiguous_in_text_order() {
        let result = match_species("lime butterfly and common jay together", &checklist(), 95.0);
        let names: Vec<&str> = result.candidates().iter().map(|t| t.common_name.as_str()).collect();
        assert_eq!(names, vec!["Lime Butterfly", "Common Jay"]);
    }

    #[test]
    fn shared_common_name_surfaces_both_taxa() {
        let taxa = taxonomy(vec![
            ReferenceTaxon::new("graphium", "doson", "Common Jay"),
            ReferenceTaxon::new("graphium", "evemon", "Common Jay"),
        ]);
        let result = match_species("common jay", &taxa, 95.0);
        let species: Vec<&str> = result.candidates().iter().map(|t| t.species.as_str()).collect();
        assert_eq!(species, vec!["doson", "evemon"]);
    }

    #[test]
    fn taxa_without_common_name_match_by_scientific_name() {
        let taxa = taxonomy(vec![ReferenceTaxon::new("appias", "libythea", "")]);
        assert!(match_species("appias libythea on lantana", &taxa, 95.0).is_matched());
        assert_eq!(taxa.names.len(), 1);
    }

    #[test]
    fn identical_duplicates_merge() {
        let taxa = taxonomy(vec![
            ReferenceTaxon::new("graphium", "doson", "Common Jay"),
            ReferenceTaxon::new("Graphium", "Doson ", "Common  Jay"),
        ]);
        assert_eq!(taxa.len(), 1);
        assert!(taxa.find("GRAPHIUM", "doson").is_some());
    }

    #[test]
    fn conflicting_duplicates_fail() {
        let err = ReferenceTaxonomy::build(
            vec![
                ReferenceTaxon::new("graphium", "doson", "Common Jay"),
                ReferenceTaxon::new("graphium", "doson", "Blue Jay"),
            ],
            &Normalizer::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReferenceError::DuplicateTaxon {
                genus: "graphium".into(),
                species: "doson".into(),
                first: "Common Jay".into(),
                second: "Blue Jay".into()
            }
        );
    }

    #[test]
    fn malformed_rows_fail_with_row_number() {
        let err = ReferenceTaxonomy::build(vec![ReferenceTaxon::new(" ", "doson", "")], &Normalizer::default());
        assert_eq!(err.unwrap_err(), ReferenceError::EmptyTaxonField { row: 1, field: "genus" });

        let err = ReferenceTaxonomy::build(
            vec![ReferenceTaxon::new("graphium", "doson", ""), ReferenceTaxon::new("papilio", "polytes 1758", "")],
            &Normalizer::default(),
        );
        assert!(matches!(err.unwrap_err(), ReferenceError::MalformedTaxonField { row: 2, field: "species", .. }));
    }

    #[test]
    fn custom_similarity_plugs_in() {
        struct Exact;
        impl Similarity for Exact {
            fn score(&self, a: &str, b: &str) -> f64 {
                if a == b { 100.0 } else { 0.0 }
            }
        }

        let result = match_species_with("common jay", &checklist(), 50.0, &Exact);
        assert!(result.is_matched());
        assert_eq!(match_species_with("comon jay", &checklist(), 50.0, &Exact), ExtractionResult::NotFound);
    }

    #[test]
    fn long_common_names_widen_the_window() {
        let taxa = taxonomy(vec![ReferenceTaxon::new("graphium", "agamemnon", "Tailed Green Jay Swallowtail")]);
        assert_eq!(taxa.max_words, 4);
        assert!(match_species("tailed green jay swallowtail", &taxa, 100.0).is_matched());
    }
}
