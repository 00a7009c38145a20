//! Run metrics.
//!
//! Counters are collected per rayon worker and merged, so stage timings are
//! summed CPU time across workers while `elapsed` is wall-clock time for the
//! whole batch.

use crate::{Outcome, Stage};
use std::time::Duration;

/// Outcome counts and cumulative time for one stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageMetrics {
    pub matched: usize,
    pub ambiguous: usize,
    pub not_found: usize,
    pub elapsed: Duration,
}

impl StageMetrics {
    pub fn record(&mut self, outcome: Outcome, elapsed: Duration) {
        match outcome {
            Outcome::Matched => self.matched += 1,
            Outcome::Ambiguous => self.ambiguous += 1,
            Outcome::NotFound => self.not_found += 1,
        }
        self.elapsed += elapsed;
    }

    pub fn merge(&mut self, other: &StageMetrics) {
        self.matched += other.matched;
        self.ambiguous += other.ambiguous;
        self.not_found += other.not_found;
        self.elapsed += other.elapsed;
    }

    pub fn total(&self) -> usize {
        self.matched + self.ambiguous + self.not_found
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunMetrics {
    /// Records processed.
    pub total: usize,
    /// Records that passed the completeness filter.
    pub complete: usize,
    /// Records whose text normalized to nothing.
    pub empty_text: usize,
    /// Wall-clock time for the batch.
    pub elapsed: Duration,
    /// Cumulative time spent normalizing.
    pub normalize: Duration,
    pub taxon: StageMetrics,
    pub location: StageMetrics,
    pub date: StageMetrics,
}

impl RunMetrics {
    pub fn stage(&self, stage: Stage) -> &StageMetrics {
        match stage {
            Stage::Taxon => &self.taxon,
            Stage::Location => &self.location,
            Stage::Date => &self.date,
        }
    }

    pub fn stage_mut(&mut self, stage: Stage) -> &mut StageMetrics {
        match stage {
            Stage::Taxon => &mut self.taxon,
            Stage::Location => &mut self.location,
            Stage::Date => &mut self.date,
        }
    }

    /// Fraction of input records that became complete output records.
    pub fn yield_ratio(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.complete as f64 / self.total as f64 }
    }

    /// Fold a worker's counters into this one. `elapsed` is left alone.
    pub fn merge(&mut self, other: &RunMetrics) {
        self.total += other.total;
        self.complete += other.complete;
        self.empty_text += other.empty_text;
        self.normalize += other.normalize;
        for stage in Stage::ALL {
            self.stage_mut(stage).merge(other.stage(stage));
        }
    }
}
