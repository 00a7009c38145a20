//! CSV/TSV adapters for the command-line front end.
//!
//! The library core never touches files; these helpers turn reference tables
//! and post dumps into the in-memory types [`crate::Pipeline`] consumes, and
//! write the results back out.

use crate::engine::AuditEntry;
use crate::error::{Error, Result};
use crate::normalize::Normalizer;
use crate::{GazetteerEntry, ObservationRecord, RawObservation, ReferenceTaxon, parse_scientific_name};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// GeoNames dump columns (0-based).
const GEONAMES_NAME: usize = 2;
const GEONAMES_ALTERNATES: usize = 3;
const GEONAMES_LATITUDE: usize = 4;
const GEONAMES_LONGITUDE: usize = 5;

/// Open `path` for reading, keeping the path in the error.
pub fn open(path: impl AsRef<Path>) -> Result<BufReader<File>> {
    let path = path.as_ref();
    File::open(path).map(BufReader::new).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

fn header_position(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn field<'r>(row: &'r csv::StringRecord, idx: Option<usize>) -> &'r str {
    idx.and_then(|i| row.get(i)).map(str::trim).unwrap_or("")
}

fn line_of(row: &csv::StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}

/// Read a species checklist.
///
/// Accepts `common_name,genus,species` or `common_name,scientific_name`
/// (header names are case-insensitive). Validation beyond column presence is
/// left to [`crate::ReferenceTaxonomy::build`].
pub fn read_taxonomy_csv<R: Read>(reader: R) -> Result<Vec<ReferenceTaxon>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let common = header_position(&headers, "common_name");
    let genus = header_position(&headers, "genus");
    let species = header_position(&headers, "species");
    let scientific = header_position(&headers, "scientific_name");

    let split_columns = genus.is_some() && species.is_some();
    if !split_columns && scientific.is_none() {
        return Err(Error::Malformed {
            origin: "taxonomy".into(),
            line: 1,
            message: "expected genus,species or scientific_name columns".into(),
        });
    }

    let mut taxa = Vec::new();
    for row in reader.records() {
        let row = row?;
        let common_name = field(&row, common).to_string();
        let taxon = if split_columns {
            ReferenceTaxon::new(field(&row, genus), field(&row, species), common_name)
        } else {
            let raw = field(&row, scientific);
            let (genus, species) = parse_scientific_name(raw).ok_or_else(|| Error::Malformed {
                origin: "taxonomy".into(),
                line: line_of(&row),
                message: format!("cannot read a binomial from '{raw}'"),
            })?;
            ReferenceTaxon::new(genus, species, common_name)
        };
        taxa.push(taxon);
    }

    info!(rows = taxa.len(), "taxonomy loaded");
    Ok(taxa)
}

/// Read a GeoNames dump (tab-separated, no header).
///
/// Rows sharing a normalized main name are grouped: alternate names are
/// merged and the first row's coordinates are kept. An alternate name claimed
/// by two different groups is dropped from both, since it cannot identify
/// either place. Rows with too few columns or bad coordinates are skipped.
pub fn read_geonames_tsv<R: Read>(reader: R, normalizer: &Normalizer) -> Result<Vec<GazetteerEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut entries: Vec<GazetteerEntry> = Vec::new();
    let mut groups: BTreeMap<String, usize> = BTreeMap::new();

    for row in reader.records() {
        let row = row?;
        let line = line_of(&row);
        if row.len() <= GEONAMES_LONGITUDE {
            warn!(line, columns = row.len(), "geonames row too short, skipped");
            continue;
        }

        let name = field(&row, Some(GEONAMES_NAME));
        let key = normalizer.normalize(name).into_string();
        if key.is_empty() {
            warn!(line, "geonames row without a usable name, skipped");
            continue;
        }

        let coordinates = (
            field(&row, Some(GEONAMES_LATITUDE)).parse::<f64>(),
            field(&row, Some(GEONAMES_LONGITUDE)).parse::<f64>(),
        );
        let (Ok(latitude), Ok(longitude)) = coordinates else {
            warn!(line, name, "geonames row with unreadable coordinates, skipped");
            continue;
        };

        let idx = *groups.entry(key).or_insert_with(|| {
            entries.push(GazetteerEntry::new(name, latitude, longitude));
            entries.len() - 1
        });
        let entry = &mut entries[idx];
        for alias in field(&row, Some(GEONAMES_ALTERNATES)).split(',').map(str::trim) {
            if !alias.is_empty() && alias != entry.canonical_name {
                entry.aliases.insert(alias.to_string());
            }
        }
    }

    drop_shared_aliases(&mut entries, normalizer);
    info!(places = entries.len(), "gazetteer loaded");
    Ok(entries)
}

/// Remove aliases whose normalized form belongs to more than one entry, or
/// to another entry's main name.
fn drop_shared_aliases(entries: &mut [GazetteerEntry], normalizer: &Normalizer) {
    let mut owners: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        let spellings = std::iter::once(&entry.canonical_name).chain(entry.aliases.iter());
        for spelling in spellings {
            owners.entry(normalizer.normalize(spelling).into_string()).or_default().insert(idx);
        }
    }

    for entry in entries.iter_mut() {
        let own_key = normalizer.normalize(&entry.canonical_name).into_string();
        entry.aliases.retain(|alias| {
            let key = normalizer.normalize(alias).into_string();
            let shared = key != own_key && owners.get(&key).is_some_and(|set| set.len() > 1);
            if shared {
                warn!(place = %entry.canonical_name, alias = %alias, "alias shared by several places, dropped");
            }
            !shared
        });
    }
}

#[derive(Debug, Deserialize)]
struct PostRow {
    #[serde(alias = "Post_Text", alias = "text", alias = "Text")]
    post_text: String,
    #[serde(default, alias = "Post_ID", alias = "id")]
    post_id: Option<String>,
    #[serde(default, alias = "Post_Timestamp", alias = "timestamp")]
    post_timestamp: Option<String>,
}

/// Read raw posts: `post_text` plus optional `post_id` and `post_timestamp`.
///
/// Unreadable timestamps are logged and treated as absent.
pub fn read_posts_csv<R: Read>(reader: R) -> Result<Vec<RawObservation>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut posts = Vec::new();

    for row in reader.deserialize::<PostRow>() {
        let row = row?;
        let post_timestamp = row.post_timestamp.as_deref().map(str::trim).filter(|s| !s.is_empty()).and_then(|s| {
            let parsed = parse_timestamp(s);
            if parsed.is_none() {
                warn!(post_id = row.post_id.as_deref().unwrap_or(""), timestamp = s, "unreadable post timestamp");
            }
            parsed
        });
        posts.push(RawObservation {
            post_text: row.post_text,
            post_id: row.post_id.filter(|id| !id.trim().is_empty()),
            post_timestamp,
        });
    }

    info!(posts = posts.len(), "posts loaded");
    Ok(posts)
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare date.
///
/// Offsets are dropped, not applied: the date is the poster's local date.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn write_records_csv<W: Write>(writer: W, records: &[ObservationRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_audit_csv<W: Write>(writer: W, entries: &[AuditEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DateSource, Outcome};
    use pretty_assertions::assert_eq;

    #[test]
    fn taxonomy_with_split_columns() {
        let input = "Common_Name,Genus,Species\nCommon Jay,Graphium,doson\n,Appias,libythea\n";
        let taxa = read_taxonomy_csv(input.as_bytes()).unwrap();
        assert_eq!(
            taxa,
            vec![ReferenceTaxon::new("Graphium", "doson", "Common Jay"), ReferenceTaxon::new("Appias", "libythea", "")]
        );
    }

    #[test]
    fn taxonomy_with_scientific_names() {
        let input = "common_name,scientific_name\nCommon Jay,Graphium doson doson\nCommon Mormon,\"Papilio polytes Linnaeus, 1758\"\n";
        let taxa = read_taxonomy_csv(input.as_bytes()).unwrap();
        assert_eq!(taxa[0], ReferenceTaxon::new("graphium", "doson", "Common Jay"));
        assert_eq!(taxa[1], ReferenceTaxon::new("papilio", "polytes", "Common Mormon"));
    }

    #[test]
    fn taxonomy_needs_name_columns() {
        let err = read_taxonomy_csv("common_name\nJay\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));

        let err = read_taxonomy_csv("common_name,scientific_name\nJay,Graphium\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 2, .. }));
    }

    #[test]
    fn geonames_rows_are_grouped_by_name() {
        let tsv = "\
1\tSrimangal\tSrimangal\tSreemangal,Sri Mangal\t24.30652\t91.72955\tP
2\tSrimangal\tSrimangal\tSrimongol\t24.4\t91.8\tP
3\tBandarban\tBandarban\tBandorban,Hill Town\t22.19534\t92.21946\tP
4\tRangamati\tRangamati\tHill Town\t22.65\t92.17\tP
5\tbroken\tBroken\t\tnot-a-number\t90.0\tP
6\tshort\tShort
";
        let entries = read_geonames_tsv(tsv.as_bytes(), &Normalizer::default()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["Srimangal", "Bandarban", "Rangamati"]);

        let srimangal = &entries[0];
        assert_eq!((srimangal.latitude, srimangal.longitude), (24.30652, 91.72955));
        assert_eq!(srimangal.aliases.len(), 3);

        // "Hill Town" identifies neither place
        assert!(!entries[1].aliases.contains("Hill Town"));
        assert!(entries[1].aliases.contains("Bandorban"));
        assert!(entries[2].aliases.is_empty());
    }

    #[test]
    fn posts_with_optional_columns() {
        let input = "\
post_id,post_text,post_timestamp
p1,Common Jay in Srimangal,2024-12-01 08:15:00
p2,\"Lime butterfly, 2k24\",2024-12-01T08:15:00+06:00
,no metadata,
p4,bad stamp,yesterday
";
        let posts = read_posts_csv(input.as_bytes()).unwrap();
        assert_eq!(posts.len(), 4);
        assert_eq!(posts[0].post_id.as_deref(), Some("p1"));
        assert_eq!(posts[0].post_timestamp, parse_timestamp("2024-12-01 08:15:00"));
        assert_eq!(posts[1].post_text, "Lime butterfly, 2k24");
        assert_eq!(posts[1].post_timestamp, parse_timestamp("2024-12-01 08:15:00"));
        assert_eq!(posts[2].post_id, None);
        assert_eq!(posts[3].post_timestamp, None);
    }

    #[test]
    fn posts_need_only_text() {
        let posts = read_posts_csv("Text\nseen a jay\n".as_bytes()).unwrap();
        assert_eq!(posts, vec![RawObservation::new("seen a jay")]);
    }

    #[test]
    fn timestamps() {
        let new_year = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(3, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-01-01T03:00:00+06:00"), Some(new_year));
        assert!(parse_timestamp("2024-03-05").is_some());
        assert!(parse_timestamp("2024-03-05T10:00:00Z").is_some());
        assert_eq!(parse_timestamp("05/03/2024"), None);
    }

    #[test]
    fn records_csv_has_expected_columns() {
        let record = ObservationRecord {
            post_id: Some("p1".into()),
            common_name: "Common Jay".into(),
            genus: "graphium".into(),
            species: "doson".into(),
            location_name: "Srimangal".into(),
            latitude: 24.30652,
            longitude: 91.72955,
            month: Some(12),
            year: 2024,
            date_source: DateSource::MonthNameYear,
            species_confidence: 100.0,
        };
        let mut out = Vec::new();
        write_records_csv(&mut out, &[record]).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "post_id,common_name,genus,species,location_name,latitude,longitude,month,year,date_source,species_confidence"
            )
        );
        assert_eq!(lines.next(), Some("p1,Common Jay,graphium,doson,Srimangal,24.30652,91.72955,12,2024,month_name_year,100.0"));
    }

    #[test]
    fn audit_csv_uses_outcome_names() {
        let entry = AuditEntry {
            post_id: None,
            index: 7,
            taxon: Outcome::Matched,
            location: Outcome::Ambiguous,
            date: Outcome::NotFound,
        };
        let mut out = Vec::new();
        write_audit_csv(&mut out, &[entry]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "post_id,index,taxon,location,date\n,7,matched,ambiguous,not_found\n");
    }
}
