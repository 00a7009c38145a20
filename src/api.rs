use crate::config::PipelineConfig;
use crate::engine::{self, AuditLog, GazetteerIndex, ReferenceTaxonomy, RunMetrics};
use crate::error::Result;
use crate::normalize::{NormalizedText, Normalizer};
use crate::{EnrichedObservation, GazetteerEntry, ObservationRecord, RawObservation, ReferenceTaxon, Stage};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// The extraction pipeline: configuration plus the immutable reference tables
/// built from it.
///
/// A `Pipeline` is `Sync`; [`Pipeline::run`] shares it by reference across
/// rayon workers.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: Normalizer,
    taxonomy: ReferenceTaxonomy,
    gazetteer: GazetteerIndex,
}

/// Result of [`Pipeline::run`].
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Observations that passed the completeness filter.
    pub complete: Vec<EnrichedObservation>,
    /// Observations that did not, with the failing stages.
    pub audit: AuditLog,
    pub metrics: RunMetrics,
}

impl RunReport {
    /// Flat output rows for the complete observations.
    pub fn records(&self) -> Vec<ObservationRecord> {
        self.complete.iter().filter_map(EnrichedObservation::to_record).collect()
    }

    fn merge(mut self, other: RunReport) -> RunReport {
        self.complete.extend(other.complete);
        self.audit.merge(other.audit);
        self.metrics.merge(&other.metrics);
        self
    }
}

/// One text taken through every stage, for debugging.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub observation: EnrichedObservation,
    pub complete: bool,
    /// Date rules the trigger scan let through.
    pub active_date_rules: Vec<&'static str>,
}

impl Pipeline {
    /// Validate `config` and build the reference tables.
    ///
    /// Any data-quality problem in `taxa` or `places` is fatal here; per-record
    /// processing never fails afterwards.
    pub fn new(
        config: PipelineConfig,
        taxa: impl IntoIterator<Item = ReferenceTaxon>,
        places: impl IntoIterator<Item = GazetteerEntry>,
    ) -> Result<Self> {
        config.validate()?;
        let normalizer = config.normalizer()?;
        let taxonomy = ReferenceTaxonomy::build(taxa, &normalizer)?;
        let gazetteer = GazetteerIndex::build(places, &normalizer, &config.gazetteer)?;

        info!(
            taxa = taxonomy.len(),
            places = gazetteer.len(),
            aliases = normalizer.aliases().len(),
            threshold = config.match_threshold,
            years = %format!("{}..={}", config.year_range.min, config.year_range.max),
            "pipeline ready"
        );
        Ok(Self { config, normalizer, taxonomy, gazetteer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn taxonomy(&self) -> &ReferenceTaxonomy {
        &self.taxonomy
    }

    pub fn gazetteer(&self) -> &GazetteerIndex {
        &self.gazetteer
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        self.normalizer.normalize(text)
    }

    /// Run one record through every stage.
    pub fn process(&self, index: usize, raw: RawObservation) -> EnrichedObservation {
        self.process_with_metrics(index, raw, &mut RunMetrics::default())
    }

    fn process_with_metrics(&self, index: usize, raw: RawObservation, metrics: &mut RunMetrics) -> EnrichedObservation {
        let started = Instant::now();
        let normalized = self.normalizer.normalize(&raw.post_text);
        metrics.normalize += started.elapsed();
        metrics.total += 1;
        if normalized.is_empty() {
            metrics.empty_text += 1;
        }
        let text = normalized.as_str();

        let started = Instant::now();
        let taxon = engine::match_species(text, &self.taxonomy, self.config.match_threshold);
        metrics.taxon.record(taxon.outcome(), started.elapsed());

        let started = Instant::now();
        let location = engine::resolve_location(text, &self.gazetteer);
        metrics.location.record(location.outcome(), started.elapsed());

        let started = Instant::now();
        let date = engine::resolve_date(text, raw.post_timestamp, self.config.year_range);
        metrics.date.record(date.outcome(), started.elapsed());

        debug!(
            index,
            post_id = raw.post_id.as_deref().unwrap_or(""),
            taxon = %taxon.outcome(),
            location = %location.outcome(),
            date = %date.outcome(),
            "record processed"
        );

        EnrichedObservation { index, raw, normalized, taxon, location, date }
    }

    /// Process a batch in parallel.
    ///
    /// Each worker keeps its own output, audit log and metrics; they are merged
    /// at the end. With `preserve_order` both outputs are re-sorted by input
    /// position.
    pub fn run(&self, posts: Vec<RawObservation>) -> RunReport {
        let started = Instant::now();

        let mut report = posts
            .into_par_iter()
            .enumerate()
            .fold(RunReport::default, |mut report, (index, raw)| {
                let observation = self.process_with_metrics(index, raw, &mut report.metrics);
                if !report.audit.record(&observation) {
                    report.metrics.complete += 1;
                    report.complete.push(observation);
                }
                report
            })
            .reduce(RunReport::default, RunReport::merge);

        if self.config.preserve_order {
            report.complete.sort_by_key(|observation| observation.index);
            report.audit.sort_by_index();
        }
        report.metrics.elapsed = started.elapsed();

        info!(
            total = report.metrics.total,
            complete = report.metrics.complete,
            rejected = report.audit.len(),
            yield_pct = %format!("{:.1}", report.metrics.yield_ratio() * 100.0),
            elapsed = ?report.metrics.elapsed,
            "run finished"
        );
        report
    }

    pub fn inspect(&self, text: &str) -> Inspection {
        let observation = self.process(0, RawObservation::new(text));
        let active_date_rules = engine::active_rule_names(observation.normalized.as_str());
        let complete = engine::is_complete(&observation);
        for stage in Stage::ALL {
            debug!(stage = %stage, outcome = %observation.outcome(stage), "inspection");
        }
        Inspection { observation, complete, active_date_rules }
    }
}
