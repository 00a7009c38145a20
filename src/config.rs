//! Pipeline configuration.
//!
//! A single [`PipelineConfig`] is consumed when a [`crate::Pipeline`] is built
//! and is never mutated afterwards. Every struct deserializes from TOML with
//! `#[serde(default)]`, so a config file only needs to mention what it changes:
//!
//! ```toml
//! match_threshold = 90.0
//!
//! [year_range]
//! min = 2015
//! max = 2024
//!
//! [normalize]
//! strip_emoji = false
//!
//! [aliases]
//! "sreemongol" = "srimangal"
//!
//! [[gazetteer.extra_places]]
//! canonical_name = "Hazarikhil Wildlife Sanctuary"
//! aliases = ["hazarikhil"]
//! latitude = 22.7059
//! longitude = 91.6909
//! ```

use crate::error::{Error, ReferenceError, Result};
use crate::model::GazetteerEntry;
use crate::normalize::{AliasTable, Normalizer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default minimum similarity (0-100) for a species match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 95.0;

/// Place names that collide with everyday words in the source posts.
pub const DEFAULT_EXCLUDED_PLACES: &[&str] =
    &["aria", "asia", "bangladesh", "dana", "dia", "had", "indra", "kayes", "bangla", "dina", "tara", "kumar n"];

/// Inclusive range of acceptable observation years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(2011, 2025)
    }
}

/// Toggles for [`Normalizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Remove `http(s)://` and `www.` tokens.
    pub strip_urls: bool,
    /// Remove emoji and pictographic symbols.
    pub strip_emoji: bool,
    /// Decompose, drop diacritics and recompose.
    pub fold_unicode: bool,
    /// Rewrite known spelling variants to their canonical form.
    pub apply_alias_table: bool,
    /// Turn `#butterfly` into `butterfly`.
    pub expand_hashtags: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { strip_urls: true, strip_emoji: true, fold_unicode: true, apply_alias_table: true, expand_hashtags: true }
    }
}

/// Gazetteer index options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazetteerOptions {
    /// Names (canonical or alias) that are never indexed.
    pub excluded_names: Vec<String>,
    /// Hand-curated places missing from the dump. One that shares a
    /// canonical name with a loaded place adds its aliases and replaces the
    /// coordinates.
    pub extra_places: Vec<GazetteerEntry>,
}

impl Default for GazetteerOptions {
    fn default() -> Self {
        Self {
            excluded_names: DEFAULT_EXCLUDED_PLACES.iter().map(|s| s.to_string()).collect(),
            extra_places: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub year_range: YearRange,
    pub match_threshold: f64,
    pub normalize: NormalizeOptions,
    pub gazetteer: GazetteerOptions,
    /// Re-sort batch output by input position.
    pub preserve_order: bool,
    /// Start from the built-in romanization alias table.
    pub builtin_aliases: bool,
    /// Extra `variant = canonical` spellings, merged over the built-in table.
    pub aliases: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year_range: YearRange::default(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            normalize: NormalizeOptions::default(),
            gazetteer: GazetteerOptions::default(),
            preserve_order: true,
            builtin_aliases: true,
            aliases: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    /// Check the numeric settings. Called by `Pipeline::new`.
    pub fn validate(&self) -> std::result::Result<(), ReferenceError> {
        if self.year_range.min > self.year_range.max {
            return Err(ReferenceError::InvalidYearRange { min: self.year_range.min, max: self.year_range.max });
        }
        if !self.match_threshold.is_finite() || !(0.0..=100.0).contains(&self.match_threshold) {
            return Err(ReferenceError::InvalidThreshold(self.match_threshold));
        }
        Ok(())
    }

    /// Build the alias table described by `builtin_aliases` + `aliases`.
    pub fn alias_table(&self) -> std::result::Result<AliasTable, ReferenceError> {
        let mut pairs: BTreeMap<String, String> = BTreeMap::new();
        if self.builtin_aliases {
            for (variant, canonical) in crate::normalize::BUILTIN_ALIASES {
                pairs.insert(variant.to_string(), canonical.to_string());
            }
        }
        pairs.extend(self.aliases.iter().map(|(k, v)| (k.clone(), v.clone())));
        AliasTable::new(pairs)
    }

    pub fn normalizer(&self) -> std::result::Result<Normalizer, ReferenceError> {
        Ok(Normalizer::new(self.normalize, self.alias_table()?))
    }
}
