//! Matching engine.
//!
//! The engine holds the three extraction stages and the completeness filter.
//! Each stage consumes the canonical text produced by [`crate::Normalizer`]
//! and returns an [`ExtractionResult`](crate::ExtractionResult); none of them
//! can fail at run time.
//!
//! ## How the parts work together
//!
//! ```text
//! taxa  ── ReferenceTaxonomy::build ──┐        places ── GazetteerIndex::build ──┐
//!          (taxonomy.rs)              │                  (gazetteer.rs)          │
//!                                     v                                          v
//! canonical text ──┬── match_species (1-3 word windows × names, similarity.rs)
//!                  │      └─ rank_candidates (resolve.rs) ── Matched | Ambiguous | NotFound
//!                  │
//!                  ├── resolve_location (Aho-Corasick, longest then earliest)
//!                  │      └─ rank_candidates (resolve.rs)
//!                  │
//!                  └── resolve_date (dates.rs)
//!                         - TriggerInfo::scan (trigger.rs) gates rules by bucket
//!                         - ordered rules from src/rules/date
//!                         - first in-range candidate wins, else post timestamp
//!                                     │
//!                                     v
//!                     is_complete / AuditLog (completeness.rs)
//!                     StageMetrics / RunMetrics (metrics.rs)
//! ```
//!
//! Reference structures are immutable once built and are shared by reference
//! across rayon workers (see `Pipeline::run`).
//!
//! ## Responsibilities by module
//!
//! - `similarity.rs`: the [`Similarity`] seam and the default [`Levenshtein`]
//!   scorer (0-100, symmetric).
//! - `taxonomy.rs`: validated reference taxonomy and the windowed fuzzy matcher.
//! - `gazetteer.rs`: keyword automaton over place names and aliases.
//! - `trigger.rs`: cheap input scan producing [`BucketMask`] bits.
//! - `resolve.rs`: shared tie-breaking from scored candidates to a result.
//! - `dates.rs`: runs the date rules and applies the year range.
//! - `completeness.rs`: the completeness filter and the audit log.
//! - `metrics.rs`: per-stage outcome counts and timings.
//!
//! ## Debugging
//!
//! Every stage emits `tracing` events under the `fieldnote::engine` target.
//! Run with `RUST_LOG=fieldnote::engine=trace` to see scanner hits, window
//! scores and rejected date candidates.

#[path = "engine/completeness.rs"]
mod completeness;
#[path = "engine/dates.rs"]
mod dates;
#[path = "engine/gazetteer.rs"]
mod gazetteer;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/similarity.rs"]
mod similarity;
#[path = "engine/taxonomy.rs"]
mod taxonomy;
#[path = "engine/trigger.rs"]
mod trigger;

pub use completeness::{AuditEntry, AuditLog, is_complete};
pub use dates::{TIMESTAMP_CONFIDENCE, active_rule_names, resolve_date};
pub use gazetteer::{GazetteerIndex, resolve_location};
pub use metrics::{RunMetrics, StageMetrics};
pub use similarity::{Levenshtein, Similarity};
pub use taxonomy::{ReferenceTaxonomy, match_species, match_species_with, parse_scientific_name};
pub use trigger::BucketMask;
