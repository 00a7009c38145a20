//! Rule-based extraction of biodiversity observation records from noisy
//! citizen-science posts.
//!
//! A [`Pipeline`] is built once from a [`PipelineConfig`], a reference
//! taxonomy and a gazetteer, and then turns [`RawObservation`]s into
//! [`EnrichedObservation`]s: species, location and (month, year), each
//! reported as an [`ExtractionResult`]. Only records where all three stages
//! matched are emitted; the rest land in the [`AuditLog`].
//!
//! ```
//! use fieldnote::{GazetteerEntry, Pipeline, PipelineConfig, RawObservation, ReferenceTaxon};
//!
//! let pipeline = Pipeline::new(
//!     PipelineConfig::default(),
//!     vec![ReferenceTaxon::new("graphium", "doson", "Common Jay")],
//!     vec![GazetteerEntry::new("Srimangal", 24.30652, 91.72955)],
//! )
//! .unwrap();
//!
//! let report = pipeline.run(vec![RawObservation::new("Spotted a Common Jay in Srimangal, December 2024")]);
//! let record = &report.records()[0];
//! assert_eq!((record.genus.as_str(), record.month, record.year), ("graphium", Some(12), 2024));
//! ```

extern crate self as fieldnote;

use regex::{Captures, Regex};

#[macro_use]
mod macros;
mod api;
pub mod config;
mod engine;
pub mod error;
pub mod io;
mod model;
pub mod normalize;
mod rules;

pub use api::{Inspection, Pipeline, RunReport};
pub use config::{GazetteerOptions, NormalizeOptions, PipelineConfig, YearRange};
pub use engine::{
    AuditEntry, AuditLog, GazetteerIndex, Levenshtein, ReferenceTaxonomy, RunMetrics, Similarity, StageMetrics,
    TIMESTAMP_CONFIDENCE, is_complete, match_species, match_species_with, parse_scientific_name, resolve_date,
    resolve_location,
};
pub use error::{Error, ReferenceError, Result};
pub use model::{
    Confidence, DateCandidate, DateSource, EnrichedObservation, ExtractionResult, GazetteerEntry, ObservationRecord,
    Outcome, RawObservation, ReferenceTaxon, Stage,
};
pub use normalize::{AliasTable, NormalizedText, Normalizer};

// --- Internal types ---------------------------------------------------------

/// Byte span inside a canonical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Range {
    /// Start byte index (inclusive).
    pub start: usize,
    /// End byte index (exclusive).
    pub end: usize,
}

impl Range {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// (month, year) as read off the text, before the year range is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawDate {
    pub month: Option<u32>,
    pub year: i32,
}

pub(crate) type Production = fn(&Captures<'_>) -> Option<RawDate>;

/// A date extractor: a name, the provenance it reports, a `'static` regex
/// (created via `regex!` in `src/macros.rs`) and a production that validates
/// the captures.
pub(crate) struct Rule {
    pub name: &'static str,
    pub source: DateSource,
    pub pattern: &'static Regex,
    /// Rule only activates if the input has all of these buckets.
    pub buckets: engine::BucketMask,
    pub production: Production,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("pattern", &self.pattern.as_str())
            .field("production", &"<function>")
            .field("buckets", &self.buckets)
            .finish()
    }
}

/// True when `text[start..end]` is not glued to a letter or digit on either side.
pub(crate) fn at_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Resolve overlapping spans: longest first, then earliest. Survivors come
/// back in text order.
pub(crate) fn select_longest<T>(mut hits: Vec<(Range, T)>) -> Vec<(Range, T)> {
    hits.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.start.cmp(&b.0.start)));

    let mut selected: Vec<(Range, T)> = Vec::with_capacity(hits.len());
    for hit in hits {
        if selected.iter().all(|(kept, _)| !kept.overlaps(&hit.0)) {
            selected.push(hit);
        }
    }
    selected.sort_by_key(|(range, _)| range.start);
    selected
}
