//! Candidate ranking.
//!
//! Both reference-data stages reduce to the same decision: given the best
//! score per distinct reference entry and where in the text that score was
//! first reached, pick a single winner or report a tie.
//!
//! ```text
//! [Scored { id, score, position }] ──▶ keep entries ≥ threshold
//!                                   ──▶ keep entries at the top score (± EPS)
//!                                   ──▶ 1 left  -> Matched(entry, score)
//!                                       n left  -> Ambiguous(by position, then id)
//!                                       0 left  -> NotFound
//! ```

use crate::ExtractionResult;

/// Scores closer than this are treated as equal.
pub(crate) const EPS: f64 = 1e-9;

/// Best score for one reference entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Scored {
    /// Index of the entry in its reference table.
    pub id: usize,
    pub score: f64,
    /// Byte offset where the entry first reached `score`.
    pub position: usize,
}

pub(crate) fn rank_candidates<T>(
    candidates: &[Scored],
    threshold: f64,
    lookup: impl Fn(usize) -> T,
) -> ExtractionResult<T> {
    let eligible = candidates.iter().filter(|c| c.score + EPS >= threshold);
    let Some(top) = eligible.clone().map(|c| c.score).reduce(f64::max) else {
        return ExtractionResult::NotFound;
    };

    let mut winners: Vec<&Scored> = eligible.filter(|c| (top - c.score).abs() < EPS).collect();
    winners.sort_by_key(|c| (c.position, c.id));
    winners.dedup_by_key(|c| c.id);

    match winners.as_slice() {
        [only] => ExtractionResult::Matched { value: lookup(only.id), confidence: only.score },
        _ => ExtractionResult::Ambiguous(winners.iter().map(|c| lookup(c.id)).collect()),
    }
}
