//! Completeness filter and rejection audit.

use crate::{EnrichedObservation, Outcome, Stage};
use serde::Serialize;

/// True iff taxon, location and date are all `Matched`.
pub fn is_complete(observation: &EnrichedObservation) -> bool {
    Stage::ALL.iter().all(|&stage| observation.outcome(stage) == Outcome::Matched)
}

/// Why one record was left out of the output.
///
/// Field order is the audit CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub post_id: Option<String>,
    pub index: usize,
    pub taxon: Outcome,
    pub location: Outcome,
    pub date: Outcome,
}

impl AuditEntry {
    pub fn from_observation(observation: &EnrichedObservation) -> Self {
        Self {
            post_id: observation.raw.post_id.clone(),
            index: observation.index,
            taxon: observation.taxon.outcome(),
            location: observation.location.outcome(),
            date: observation.date.outcome(),
        }
    }

    pub fn outcome(&self, stage: Stage) -> Outcome {
        match stage {
            Stage::Taxon => self.taxon,
            Stage::Location => self.location,
            Stage::Date => self.date,
        }
    }

    /// Stages that produced `NotFound` or `Ambiguous`.
    pub fn failed_stages(&self) -> Vec<(Stage, Outcome)> {
        Stage::ALL.iter().map(|&stage| (stage, self.outcome(stage))).filter(|(_, o)| *o != Outcome::Matched).collect()
    }
}

/// Rejected records. Workers fill their own log and merge at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `observation` if it is incomplete. Returns whether it was logged.
    pub fn record(&mut self, observation: &EnrichedObservation) -> bool {
        if is_complete(observation) {
            return false;
        }
        self.entries.push(AuditEntry::from_observation(observation));
        true
    }

    pub fn merge(&mut self, other: AuditLog) {
        self.entries.extend(other.entries);
    }

    pub fn sort_by_index(&mut self) {
        self.entries.sort_by_key(|entry| entry.index);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many entries failed `stage` with `outcome`.
    pub fn count(&self, stage: Stage, outcome: Outcome) -> usize {
        self.entries.iter().filter(|entry| entry.outcome(stage) == outcome).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DateCandidate, DateSource, ExtractionResult, GazetteerEntry, RawObservation, ReferenceTaxon};
    use pretty_assertions::assert_eq;

    fn observation(index: usize, location: ExtractionResult<GazetteerEntry>) -> EnrichedObservation {
        EnrichedObservation {
            index,
            raw: RawObservation::new("text").with_id(format!("p{index}")),
            normalized: Default::default(),
            taxon: ExtractionResult::Matched {
                value: ReferenceTaxon::new("graphium", "doson", "Common Jay"),
                confidence: 100.0,
            },
            location,
            date: ExtractionResult::Matched {
                value: DateCandidate { month: Some(12), year: 2024, source: DateSource::MonthNameYear },
                confidence: 100.0,
            },
        }
    }

    fn srimangal() -> GazetteerEntry {
        GazetteerEntry::new("Srimangal", 24.30652, 91.72955)
    }

    #[test]
    fn all_matched_is_complete() {
        let obs = observation(0, ExtractionResult::Matched { value: srimangal(), confidence: 100.0 });
        assert!(is_complete(&obs));

        let mut log = AuditLog::new();
        assert!(!log.record(&obs));
        assert!(log.is_empty());
    }

    #[test]
    fn ambiguous_is_not_complete() {
        let obs = observation(3, ExtractionResult::Ambiguous(vec![srimangal(), GazetteerEntry::new("Sylhet", 24.9, 91.8)]));
        assert!(!is_complete(&obs));

        let entry = AuditEntry::from_observation(&obs);
        assert_eq!(entry.failed_stages(), vec![(Stage::Location, Outcome::Ambiguous)]);
        assert_eq!(entry.post_id.as_deref(), Some("p3"));
    }

    #[test]
    fn logs_merge_and_sort() {
        let mut first = AuditLog::new();
        first.record(&observation(5, ExtractionResult::NotFound));
        let mut second = AuditLog::new();
        second.record(&observation(1, ExtractionResult::NotFound));
        second.record(&observation(2, ExtractionResult::Ambiguous(vec![srimangal()])));

        first.merge(second);
        first.sort_by_index();

        let indices: Vec<usize> = first.entries().iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 2, 5]);
        assert_eq!(first.count(Stage::Location, Outcome::NotFound), 2);
        assert_eq!(first.count(Stage::Location, Outcome::Ambiguous), 1);
        assert_eq!(first.count(Stage::Taxon, Outcome::NotFound), 0);
    }
}
