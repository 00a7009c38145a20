//! Error types.
//!
//! Two layers:
//!
//! - [`ReferenceError`]: data-quality problems in the reference tables or the
//!   configuration. These are detected while a [`crate::Pipeline`] is being
//!   built and are always fatal, since a corrupted table silently corrupts
//!   every match made against it.
//! - [`Error`]: everything the crate can fail with, including I/O and parse
//!   errors from the CSV/TOML adapters.
//!
//! Per-record extraction never produces an error. `NotFound` and `Ambiguous`
//! are ordinary [`crate::ExtractionResult`] values.

use std::path::PathBuf;
use thiserror::Error;

/// Load-time data-quality failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReferenceError {
    #[error("taxon row {row}: {field} is empty")]
    EmptyTaxonField { row: usize, field: &'static str },

    #[error("taxon row {row}: {field} '{value}' is not a single word")]
    MalformedTaxonField { row: usize, field: &'static str, value: String },

    #[error("taxon {genus} {species} appears twice with different common names ('{first}' and '{second}')")]
    DuplicateTaxon { genus: String, species: String, first: String, second: String },

    #[error("gazetteer entry {row}: place name is empty")]
    EmptyPlaceName { row: usize },

    #[error("gazetteer entry '{name}': invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { name: String, latitude: f64, longitude: f64 },

    #[error("gazetteer lists '{name}' more than once")]
    DuplicatePlace { name: String },

    #[error("alias '{alias}' refers to both '{first}' and '{second}'")]
    AliasCollision { alias: String, first: String, second: String },

    #[error("alias table: variant '{variant}' is empty after normalization")]
    EmptyAlias { variant: String },

    #[error("alias table: '{variant}' -> '{canonical}' re-triggers alias '{other}'")]
    UnstableAlias { variant: String, canonical: String, other: String },

    #[error("failed to build keyword index: {0}")]
    IndexBuild(String),

    #[error("invalid year range {min}..={max}")]
    InvalidYearRange { min: i32, max: i32 },

    #[error("match threshold {0} is outside 0..=100")]
    InvalidThreshold(f64),
}

/// Errors surfaced by the public API.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Stream(#[from] std::io::Error),

    #[error("{origin} line {line}: {message}")]
    Malformed { origin: String, line: u64, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
