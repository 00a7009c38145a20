//! Records flowing through the pipeline.

use crate::normalize::NormalizedText;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Similarity/confidence on a 0-100 scale.
pub type Confidence = f64;

/// One raw post, exactly as the ingestion side produced it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawObservation {
    pub post_text: String,
    pub post_id: Option<String>,
    pub post_timestamp: Option<NaiveDateTime>,
}

impl RawObservation {
    pub fn new(post_text: impl Into<String>) -> Self {
        Self { post_text: post_text.into(), post_id: None, post_timestamp: None }
    }

    pub fn with_id(mut self, post_id: impl Into<String>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.post_timestamp = Some(timestamp);
        self
    }
}

/// A species in the reference checklist.
///
/// `genus` and `species` are lowercase once they have passed through
/// [`crate::ReferenceTaxonomy::build`]; `common_name` keeps its display case
/// and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceTaxon {
    pub genus: String,
    pub species: String,
    pub common_name: String,
}

impl ReferenceTaxon {
    pub fn new(genus: impl Into<String>, species: impl Into<String>, common_name: impl Into<String>) -> Self {
        Self { genus: genus.into(), species: species.into(), common_name: common_name.into() }
    }

    pub fn scientific_name(&self) -> String {
        format!("{} {}", self.genus, self.species)
    }
}

/// A geocoded place and the spellings it is known by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub canonical_name: String,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl GazetteerEntry {
    pub fn new(canonical_name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self { canonical_name: canonical_name.into(), aliases: BTreeSet::new(), latitude, longitude }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }
}

/// Outcome of one extraction stage.
///
/// `Ambiguous` candidates are ordered by their first appearance in the text.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult<T> {
    Matched {
        value: T,
        confidence: Confidence,
    },
    Ambiguous(Vec<T>),
    NotFound,
}

impl<T> Default for ExtractionResult<T> {
    fn default() -> Self {
        ExtractionResult::NotFound
    }
}

impl<T> ExtractionResult<T> {
    pub fn outcome(&self) -> Outcome {
        match self {
            ExtractionResult::Matched { .. } => Outcome::Matched,
            ExtractionResult::Ambiguous(_) => Outcome::Ambiguous,
            ExtractionResult::NotFound => Outcome::NotFound,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, ExtractionResult::Matched { .. })
    }

    /// The matched value, if any. Ambiguous results yield `None`.
    pub fn matched(&self) -> Option<&T> {
        match self {
            ExtractionResult::Matched { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn confidence(&self) -> Option<Confidence> {
        match self {
            ExtractionResult::Matched { confidence, .. } => Some(*confidence),
            _ => None,
        }
    }

    /// Candidates of an ambiguous result; empty otherwise.
    pub fn candidates(&self) -> &[T] {
        match self {
            ExtractionResult::Ambiguous(candidates) => candidates,
            _ => &[],
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ExtractionResult<U> {
        match self {
            ExtractionResult::Matched { value, confidence } => ExtractionResult::Matched { value: f(value), confidence },
            ExtractionResult::Ambiguous(candidates) => {
                ExtractionResult::Ambiguous(candidates.into_iter().map(f).collect())
            }
            ExtractionResult::NotFound => ExtractionResult::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Matched,
    Ambiguous,
    NotFound,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Matched => "matched",
            Outcome::Ambiguous => "ambiguous",
            Outcome::NotFound => "not_found",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three extraction stages that feed the completeness filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Taxon,
    Location,
    Date,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Taxon, Stage::Location, Stage::Date];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Taxon => "taxon",
            Stage::Location => "location",
            Stage::Date => "date",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a [`DateCandidate`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// "december 2024", "19 july 2025", "march'25"
    MonthNameYear,
    /// "12/2024", "2024-12"
    NumericMonthYear,
    /// "2k24"
    YearShorthand,
    /// "19/07/2025", "19-07-25"
    DelimitedDate,
    /// a bare "2023"
    YearOnly,
    /// Derived from the post timestamp because the text had no usable date.
    PostTimestamp,
}

impl DateSource {
    pub fn is_text(&self) -> bool {
        !matches!(self, DateSource::PostTimestamp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::MonthNameYear => "month_name_year",
            DateSource::NumericMonthYear => "numeric_month_year",
            DateSource::YearShorthand => "year_shorthand",
            DateSource::DelimitedDate => "delimited_date",
            DateSource::YearOnly => "year_only",
            DateSource::PostTimestamp => "post_timestamp",
        }
    }
}

/// A validated (month, year) pair. `year` is always inside the configured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateCandidate {
    pub month: Option<u32>,
    pub year: i32,
    pub source: DateSource,
}

/// A raw post after every stage has run over it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedObservation {
    /// Position of the post in the input batch.
    pub index: usize,
    pub raw: RawObservation,
    pub normalized: NormalizedText,
    pub taxon: ExtractionResult<ReferenceTaxon>,
    pub location: ExtractionResult<GazetteerEntry>,
    pub date: ExtractionResult<DateCandidate>,
}

impl EnrichedObservation {
    pub fn outcome(&self, stage: Stage) -> Outcome {
        match stage {
            Stage::Taxon => self.taxon.outcome(),
            Stage::Location => self.location.outcome(),
            Stage::Date => self.date.outcome(),
        }
    }

    /// Flatten into an output row. `None` unless every stage matched.
    pub fn to_record(&self) -> Option<ObservationRecord> {
        let taxon = self.taxon.matched()?;
        let place = self.location.matched()?;
        let date = self.date.matched()?;

        Some(ObservationRecord {
            post_id: self.raw.post_id.clone(),
            common_name: taxon.common_name.clone(),
            genus: taxon.genus.clone(),
            species: taxon.species.clone(),
            location_name: place.canonical_name.clone(),
            latitude: place.latitude,
            longitude: place.longitude,
            month: date.month,
            year: date.year,
            date_source: date.source,
            species_confidence: self.taxon.confidence().unwrap_or_default(),
        })
    }
}

/// Flat output row handed to serializers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub post_id: Option<String>,
    pub common_name: String,
    pub genus: String,
    pub species: String,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub month: Option<u32>,
    pub year: i32,
    pub date_source: DateSource,
    pub species_confidence: Confidence,
}
