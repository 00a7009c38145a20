//! Gazetteer index and location resolution.
//!
//! All canonical names and aliases are normalized with the pipeline's
//! [`Normalizer`] and compiled into one Aho-Corasick automaton at load time.
//! A record is then scanned in a single pass:
//!
//! ```text
//! canonical text ── find_overlapping_iter ──▶ every hit, overlapping
//!                ── word-boundary filter  ──▶ "dia" inside "india" dropped
//!                ── greedy selection      ──▶ longest first, then earliest;
//!                                             overlapping losers dropped
//!                ── distinct entries in order of first occurrence
//!                ── 1 -> Matched, n -> Ambiguous, 0 -> NotFound
//! ```

use super::resolve::{Scored, rank_candidates};
use crate::config::GazetteerOptions;
use crate::error::ReferenceError;
use crate::normalize::Normalizer;
use crate::{ExtractionResult, GazetteerEntry, Range};
use aho_corasick::{AhoCorasick, MatchKind};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, trace};

/// Place-name automaton plus the entries it resolves to.
#[derive(Debug, Clone, Default)]
pub struct GazetteerIndex {
    entries: Vec<GazetteerEntry>,
    automaton: Option<AhoCorasick>,
    /// Pattern id -> entry index.
    owners: Vec<usize>,
    keys: Vec<String>,
}

/// A word-bounded keyword hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hit {
    range: Range,
    entry: usize,
}

impl GazetteerIndex {
    /// Validate `entries` and compile the keyword automaton.
    ///
    /// `options.extra_places` are merged into `entries` first.
    /// Fails on empty names, non-finite or out-of-range coordinates, two
    /// entries with the same normalized canonical name, and any alias that
    /// normalizes to a key already owned by another entry. Names listed in
    /// `options.excluded_names` are never indexed.
    pub fn build(
        entries: impl IntoIterator<Item = GazetteerEntry>,
        normalizer: &Normalizer,
        options: &GazetteerOptions,
    ) -> Result<Self, ReferenceError> {
        let excluded: BTreeSet<String> =
            options.excluded_names.iter().map(|n| normalizer.normalize(n).into_string()).collect();

        let entries = merge_places(entries.into_iter().collect(), &options.extra_places, normalizer);
        // key -> (entry, is canonical name)
        let mut table: BTreeMap<String, (usize, bool)> = BTreeMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            let name = entry.canonical_name.trim();
            if name.is_empty() {
                return Err(ReferenceError::EmptyPlaceName { row: idx + 1 });
            }
            if !valid_coordinates(entry.latitude, entry.longitude) {
                return Err(ReferenceError::InvalidCoordinates {
                    name: name.to_string(),
                    latitude: entry.latitude,
                    longitude: entry.longitude,
                });
            }

            let names = std::iter::once((name, true)).chain(entry.aliases.iter().map(|a| (a.as_str(), false)));
            for (spelling, canonical) in names {
                let key = normalizer.normalize(spelling).into_string();
                if key.is_empty() || excluded.contains(&key) {
                    trace!(place = %entry.canonical_name, spelling, "place spelling not indexed");
                    continue;
                }

                match table.get(&key) {
                    None => {
                        table.insert(key, (idx, canonical));
                    }
                    Some(&(owner, _)) if owner == idx => {}
                    Some(&(owner, owner_canonical)) => {
                        if canonical && owner_canonical {
                            return Err(ReferenceError::DuplicatePlace { name: key });
                        }
                        return Err(ReferenceError::AliasCollision {
                            alias: key,
                            first: entries[owner].canonical_name.clone(),
                            second: entry.canonical_name.clone(),
                        });
                    }
                }
            }
        }

        let (keys, owners): (Vec<String>, Vec<usize>) = table.into_iter().map(|(key, (owner, _))| (key, owner)).unzip();
        let automaton = if keys.is_empty() {
            None
        } else {
            let automaton = AhoCorasick::builder()
                .match_kind(MatchKind::Standard)
                .build(&keys)
                .map_err(|err| ReferenceError::IndexBuild(err.to_string()))?;
            Some(automaton)
        };

        info!(places = entries.len(), keys = keys.len(), excluded = excluded.len(), "gazetteer index built");
        Ok(Self { entries, automaton, owners, keys })
    }

    pub fn entries(&self) -> &[GazetteerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of indexed spellings (canonical names + aliases).
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Non-overlapping, word-bounded hits in text order.
    fn scan(&self, text: &str) -> Vec<Hit> {
        let Some(automaton) = &self.automaton else {
            return Vec::new();
        };

        let hits: Vec<(Range, usize)> = automaton
            .find_overlapping_iter(text)
            .filter(|m| crate::at_word_boundary(text, m.start(), m.end()))
            .map(|m| (Range { start: m.start(), end: m.end() }, self.owners[m.pattern().as_usize()]))
            .collect();

        let found = hits.len();
        let selected = crate::select_longest(hits);
        if selected.len() < found {
            trace!(dropped = found - selected.len(), "overlapping place hits dropped");
        }
        selected.into_iter().map(|(range, entry)| Hit { range, entry }).collect()
    }
}

/// Fold curated `extras` into the loaded `places`. An extra whose canonical
/// name normalizes like a loaded one adds its aliases and overrides the
/// coordinates; any other extra is appended.
pub(crate) fn merge_places(
    mut places: Vec<GazetteerEntry>,
    extras: &[GazetteerEntry],
    normalizer: &Normalizer,
) -> Vec<GazetteerEntry> {
    if extras.is_empty() {
        return places;
    }

    let mut by_name: BTreeMap<String, usize> = places
        .iter()
        .enumerate()
        .map(|(idx, place)| (normalizer.normalize(&place.canonical_name).into_string(), idx))
        .collect();

    for extra in extras {
        let key = normalizer.normalize(&extra.canonical_name).into_string();
        match by_name.get(&key) {
            Some(&idx) if !key.is_empty() => {
                let place = &mut places[idx];
                place.aliases.extend(extra.aliases.iter().cloned());
                place.latitude = extra.latitude;
                place.longitude = extra.longitude;
                debug!(place = %place.canonical_name, "extra place merged into loaded entry");
            }
            _ => {
                by_name.insert(key, places.len());
                places.push(extra.clone());
                debug!(place = %extra.canonical_name, "extra place added");
            }
        }
    }
    places
}

fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Resolve place mentions in canonical `text`.
pub fn resolve_location(text: &str, index: &GazetteerIndex) -> ExtractionResult<GazetteerEntry> {
    if text.is_empty() {
        return ExtractionResult::NotFound;
    }

    let mut candidates: Vec<Scored> = Vec::new();
    for hit in index.scan(text) {
        if candidates.iter().any(|c| c.id == hit.entry) {
            continue;
        }
        debug!(place = %index.entries[hit.entry].canonical_name, start = hit.range.start, "place found");
        candidates.push(Scored { id: hit.entry, score: 100.0, position: hit.range.start });
    }

    rank_candidates(&candidates, 100.0, |id| index.entries[id].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index(entries: Vec<GazetteerEntry>) -> GazetteerIndex {
        GazetteerIndex::build(entries, &Normalizer::default(), &GazetteerOptions::default()).unwrap()
    }

    fn bangladesh() -> GazetteerIndex {
        index(vec![
            GazetteerEntry::new("Srimangal", 24.30652, 91.72955).with_alias("Sreemangal"),
            GazetteerEntry::new("Bandarban", 22.19534, 92.21946),
            GazetteerEntry::new("Khagrachari", 23.11928, 91.98463),
            GazetteerEntry::new("Maulavi Bazar", 24.48888, 91.77075),
            GazetteerEntry::new("Bazar", 23.0, 90.0),
            GazetteerEntry::new("Dia", 22.0, 89.0),
        ])
    }

    fn names(result: &ExtractionResult<GazetteerEntry>) -> Vec<&str> {
        match result {
            ExtractionResult::Matched { value, .. } => vec![value.canonical_name.as_str()],
            ExtractionResult::Ambiguous(entries) => entries.iter().map(|e| e.canonical_name.as_str()).collect(),
            ExtractionResult::NotFound => Vec::new(),
        }
    }

    #[test]
    fn single_place_matches_with_full_confidence() {
        let result = resolve_location("spotted a common jay in srimangal, december 2024", &bangladesh());
        assert_eq!(result.matched().map(|e| e.latitude), Some(24.30652));
        assert_eq!(result.confidence(), Some(100.0));
    }

    #[test]
    fn canonical_and_alias_of_one_place_is_still_a_match() {
        // "sreemangal" is rewritten by the builtin alias table before indexing
        let result = resolve_location("srimangal and sreemangal", &bangladesh());
        assert_eq!(names(&result), vec!["Srimangal"]);
        assert!(result.is_matched());
    }

    #[test]
    fn two_places_are_ambiguous_in_order_of_appearance() {
        let result = resolve_location("from khagrachari to bandarban", &bangladesh());
        assert_eq!(result.outcome(), crate::Outcome::Ambiguous);
        assert_eq!(names(&result), vec!["Khagrachari", "Bandarban"]);
    }

    #[test]
    fn alias_alone_resolves_to_its_place() {
        let idx = index(vec![
            GazetteerEntry::new("Rangamati", 22.65, 92.17).with_alias("Hill Town"),
            GazetteerEntry::new("Bandarban", 22.19534, 92.21946).with_alias("Bandor"),
        ]);

        let result = resolve_location("at hill town", &idx);
        assert!(result.is_matched());
        assert_eq!(names(&result), vec!["Rangamati"]);

        let result = resolve_location("hill town and bandor", &idx);
        assert_eq!(result.outcome(), crate::Outcome::Ambiguous);
        assert_eq!(names(&result), vec!["Rangamati", "Bandarban"]);
    }

    #[test]
    fn extra_places_are_indexed() {
        let options = GazetteerOptions {
            extra_places: vec![
                GazetteerEntry::new("Hazarikhil Wildlife Sanctuary", 22.7059, 91.6909).with_alias("hazarikhil"),
                GazetteerEntry::new("srimangal", 24.3, 91.7).with_alias("Lawachara"),
            ],
            ..Default::default()
        };
        let idx = GazetteerIndex::build(
            vec![GazetteerEntry::new("Srimangal", 24.30652, 91.72955)],
            &Normalizer::default(),
            &options,
        )
        .unwrap();
        assert_eq!(idx.len(), 2);

        let result = resolve_location("birding at hazarikhil", &idx);
        assert_eq!(names(&result), vec!["Hazarikhil Wildlife Sanctuary"]);

        let merged = resolve_location("lawachara forest", &idx);
        assert_eq!(names(&merged), vec!["Srimangal"]);
        assert_eq!(merged.matched().map(|e| e.latitude), Some(24.3));
    }

    #[test]
    fn kumar_n_is_excluded_by_default() {
        let idx = index(vec![GazetteerEntry::new("Kumar N", 23.5, 90.5), GazetteerEntry::new("Dhaka", 23.7, 90.4)]);
        let result = resolve_location("photo by kumar n in dhaka", &idx);
        assert_eq!(names(&result), vec!["Dhaka"]);
    }

    #[test]
    fn longest_overlapping_name_wins() {
        let result = resolve_location("tea estates of maulavi bazar", &bangladesh());
        assert_eq!(names(&result), vec!["Maulavi Bazar"]);
    }

    #[test]
    fn hits_must_sit_on_word_boundaries() {
        assert_eq!(resolve_location("bazars everywhere", &bangladesh()), ExtractionResult::NotFound);
    }

    #[test]
    fn excluded_names_are_not_indexed() {
        assert_eq!(resolve_location("dia was here", &bangladesh()), ExtractionResult::NotFound);
    }

    #[test]
    fn empty_text_and_empty_index() {
        assert_eq!(resolve_location("", &bangladesh()), ExtractionResult::NotFound);
        assert_eq!(resolve_location("srimangal", &index(Vec::new())), ExtractionResult::NotFound);
    }

    #[test]
    fn alias_shared_by_two_places_is_a_load_error() {
        let err = GazetteerIndex::build(
            vec![
                GazetteerEntry::new("Rangamati", 22.65, 92.17).with_alias("Hill Town"),
                GazetteerEntry::new("Bandarban", 22.19, 92.21).with_alias("hill  town"),
            ],
            &Normalizer::default(),
            &GazetteerOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReferenceError::AliasCollision {
                alias: "hill town".into(),
                first: "Rangamati".into(),
                second: "Bandarban".into()
            }
        );
    }

    #[test]
    fn duplicate_canonical_names_fail() {
        let err = GazetteerIndex::build(
            vec![GazetteerEntry::new("Sylhet", 24.9, 91.8), GazetteerEntry::new("SYLHET", 24.9, 91.9)],
            &Normalizer::default(),
            &GazetteerOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, ReferenceError::DuplicatePlace { name: "sylhet".into() });
    }

    #[test]
    fn invalid_entries_fail() {
        let options = GazetteerOptions::default();
        let err = GazetteerIndex::build(vec![GazetteerEntry::new("  ", 1.0, 1.0)], &Normalizer::default(), &options);
        assert_eq!(err.unwrap_err(), ReferenceError::EmptyPlaceName { row: 1 });

        let err =
            GazetteerIndex::build(vec![GazetteerEntry::new("Nowhere", 91.0, 0.0)], &Normalizer::default(), &options);
        assert!(matches!(err.unwrap_err(), ReferenceError::InvalidCoordinates { .. }));

        let err = GazetteerIndex::build(
            vec![GazetteerEntry::new("Nowhere", f64::NAN, 0.0)],
            &Normalizer::default(),
            &options,
        );
        assert!(matches!(err.unwrap_err(), ReferenceError::InvalidCoordinates { .. }));
    }

    #[test]
    fn alias_repeating_own_name_is_ignored() {
        let idx = index(vec![GazetteerEntry::new("Sylhet", 24.9, 91.8).with_alias("SYLHET")]);
        assert_eq!(idx.key_count(), 1);
    }
}
