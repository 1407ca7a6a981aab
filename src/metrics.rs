//! Corpus scan: string length metrics over every place
//!
//! Used to size destination columns before a real import. Every string
//! field is keyed `Entity.field`; a key is nullable once any sighting was
//! missing.

use crate::import::{ImportProgress, ProgressSink};
use crate::lookup::LookupEntry;
use crate::model::{Attestation, Author, Connection, Feature, Location, Name, Place, Reference};
use crate::reader::PlaceReader;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the report written by [`ScanReport::save`].
pub const REPORT_FILE: &str = "scan-report.tsv";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StringMetric {
    /// Shortest length seen, in chars
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub nullable: bool,
}

impl StringMetric {
    fn update(&mut self, value: Option<&str>) {
        let Some(value) = value else {
            self.nullable = true;
            return;
        };
        let len = value.chars().count();
        self.min_len = Some(self.min_len.map_or(len, |m| m.min(len)));
        self.max_len = Some(self.max_len.map_or(len, |m| m.max(len)));
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub places: usize,
    pub lookups: Vec<LookupEntry>,
    pub strings: BTreeMap<String, StringMetric>,
}

impl ScanReport {
    fn record(&mut self, entity: &str, field: &str, value: Option<&str>) {
        self.strings
            .entry(format!("{entity}.{field}"))
            .or_default()
            .update(value);
    }

    pub fn update(&mut self, place: &Place) {
        self.places += 1;
        for (field, value) in [
            ("id", Some(place.id.as_str())),
            ("uri", Some(place.uri.as_str())),
            ("kind", place.kind.as_deref()),
            ("title", place.title.as_deref()),
            ("description", place.description.as_deref()),
            ("details", place.details.as_deref()),
            ("provenance", place.provenance.as_deref()),
            ("rights", place.rights.as_deref()),
            ("review_state", place.review_state.as_deref()),
        ] {
            self.record("Place", field, value);
        }

        for feature in &place.features {
            self.feature(feature);
        }
        self.authors(&place.creators, &place.contributors);
        self.sources(&place.attestations, &place.references);
        for location in &place.locations {
            self.location(location);
        }
        for connection in &place.connections {
            self.connection(connection);
        }
        for name in &place.names {
            self.name(name);
        }
        for meta in &place.metadata {
            self.record("Metadata", "name", Some(meta.name.as_str()));
            self.record("Metadata", "value", Some(meta.value.as_str()));
        }
        for uri in &place.target_uris {
            self.record("Place", "target_uris", Some(uri.as_str()));
        }
    }

    fn feature(&mut self, f: &Feature) {
        for (field, value) in [
            ("kind", &f.kind),
            ("title", &f.title),
            ("geometry", &f.geometry),
            ("snippet", &f.snippet),
            ("link", &f.link),
            ("description", &f.description),
            ("precision", &f.precision),
        ] {
            self.record("PlaceFeature", field, value.as_deref());
        }
    }

    fn authors(&mut self, creators: &[Author], contributors: &[Author]) {
        for a in creators.iter().chain(contributors) {
            self.record("Author", "username", a.username.as_deref());
            self.record("Author", "name", a.name.as_deref());
            self.record("Author", "homepage", a.homepage.as_deref());
        }
    }

    fn sources(&mut self, attestations: &[Attestation], references: &[Reference]) {
        for a in attestations {
            self.record("Attestation", "period", a.period.as_deref());
            self.record("Attestation", "confidence", a.confidence.as_deref());
        }
        for r in references {
            for (field, value) in [
                ("title", &r.title),
                ("kind", &r.kind),
                ("citation_type_uri", &r.citation_type_uri),
                ("access_uri", &r.access_uri),
                ("alternate_uri", &r.alternate_uri),
                ("bib_uri", &r.bib_uri),
                ("citation", &r.citation),
                ("citation_detail", &r.citation_detail),
                ("other_id", &r.other_id),
            ] {
                self.record("Reference", field, value.as_deref());
            }
        }
    }

    fn location(&mut self, l: &Location) {
        for (field, value) in [
            ("uri", &l.uri),
            ("title", &l.title),
            ("description", &l.description),
            ("details", &l.details),
            ("provenance", &l.provenance),
            ("remains", &l.remains),
            ("certainty", &l.certainty),
            ("accuracy", &l.accuracy),
            ("review_state", &l.review_state),
            ("geometry", &l.geometry),
        ] {
            self.record("Location", field, value.as_deref());
        }
        self.authors(&l.creators, &l.contributors);
        self.sources(&l.attestations, &l.references);
    }

    fn connection(&mut self, c: &Connection) {
        for (field, value) in [
            ("uri", &c.uri),
            ("title", &c.title),
            ("description", &c.description),
            ("details", &c.details),
            ("provenance", &c.provenance),
            ("connection_type", &c.connection_type),
            ("certainty", &c.certainty),
            ("review_state", &c.review_state),
            ("target_uri", &c.target_uri),
        ] {
            self.record("Connection", field, value.as_deref());
        }
        self.authors(&c.creators, &c.contributors);
        self.sources(&c.attestations, &c.references);
    }

    fn name(&mut self, n: &Name) {
        for (field, value) in [
            ("uri", &n.uri),
            ("language", &n.language),
            ("attested", &n.attested),
            ("romanized", &n.romanized),
            ("description", &n.description),
            ("details", &n.details),
            ("provenance", &n.provenance),
            ("name_type", &n.name_type),
            ("transcription_accuracy", &n.transcription_accuracy),
            ("transcription_completeness", &n.transcription_completeness),
            ("certainty", &n.certainty),
            ("review_state", &n.review_state),
        ] {
            self.record("Name", field, value.as_deref());
        }
        self.authors(&n.creators, &n.contributors);
        self.sources(&n.attestations, &n.references);
    }

    /// Tab-separated report: `#places`, `#lookups` by full name, `#strings`
    /// by key.
    pub fn write_tsv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "#places\t\t")?;
        writeln!(out, "total\t{}", self.places)?;

        writeln!(out, "#lookups\t\t")?;
        let mut lookups: Vec<&LookupEntry> = self.lookups.iter().collect();
        lookups.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        for entry in lookups {
            writeln!(
                out,
                "{}\t{}\t{}",
                entry.full_name,
                entry.id,
                entry.short_name.as_deref().unwrap_or("")
            )?;
        }

        writeln!(out, "#strings\t\t")?;
        for (key, metric) in &self.strings {
            if metric.nullable {
                writeln!(out, "{key}:nul\t1\t")?;
            }
            if let Some(min) = metric.min_len {
                writeln!(out, "{key}:min\t{min}\t")?;
            }
            if let Some(max) = metric.max_len {
                writeln!(out, "{key}:max\t{max}\t")?;
            }
        }
        out.flush()
    }

    /// Write [`REPORT_FILE`] into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(REPORT_FILE);
        self.write_tsv(BufWriter::new(File::create(&path)?))?;
        Ok(path)
    }
}

/// Read every remaining place and collect metrics. Nothing is adapted or
/// written.
pub fn scan(reader: &mut PlaceReader, mut progress: Option<&mut dyn ProgressSink>) -> ScanReport {
    let mut report = ScanReport::default();
    let length = reader.length();
    while let Some(place) = reader.read() {
        if let Some(sink) = progress.as_deref_mut() {
            // `Iterator::position` would shadow the inherent method on `&mut`
            let position = PlaceReader::position(reader);
            sink.report(&ImportProgress::new(position, length, place.to_string(), false));
        }
        report.update(&place);
    }
    report.lookups = reader.lookups().entries().to_vec();
    info!(places = report.places, keys = report.strings.len(), "scan finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scan_doc(doc: serde_json::Value) -> ScanReport {
        let mut reader = PlaceReader::new(doc.to_string().as_bytes()).unwrap();
        scan(&mut reader, None)
    }

    #[test]
    fn test_min_max_and_nullable() {
        let report = scan_doc(json!({ "@graph": [
            { "id": "1", "uri": "u", "title": "Athenae" },
            { "id": "22", "uri": "u", "title": "Roma" },
            { "id": "333", "uri": "u" }
        ] }));
        assert_eq!(report.places, 3);
        assert_eq!(
            report.strings["Place.title"],
            StringMetric {
                min_len: Some(4),
                max_len: Some(7),
                nullable: true,
            }
        );
        assert_eq!(report.strings["Place.id"].max_len, Some(3));
        assert!(!report.strings["Place.id"].nullable);
    }

    #[test]
    fn test_nested_entities_are_keyed() {
        let report = scan_doc(json!({ "@graph": [{
            "id": "1",
            "names": [{ "romanized": "Athēnai", "creators": [{ "name": "Dénia Smith" }] }],
            "connectsWith": ["https://example.org/places/2"]
        }] }));
        assert_eq!(report.strings["Name.romanized"].max_len, Some(7));
        assert!(report.strings["Author.username"].nullable);
        assert!(report.strings.contains_key("Place.target_uris"));
    }

    #[test]
    fn test_scan_reports_progress() {
        let doc = json!({ "@graph": [{ "id": "1" }, { "id": "2" }, { "id": "3" }] });
        let mut reader = PlaceReader::new(doc.to_string().as_bytes()).unwrap();
        let mut seen = Vec::new();
        let mut progress = |p: &ImportProgress| seen.push((p.position, p.length, p.skipped));
        let report = scan(&mut reader, Some(&mut progress));

        assert_eq!(report.places, 3);
        assert_eq!(seen, vec![(1, 3, false), (2, 3, false), (3, 3, false)]);
    }

    #[test]
    fn test_tsv_sections() {
        let report = scan_doc(json!({ "@graph": [{
            "id": "1",
            "placeTypes": ["temple", "settlement"],
            "placeTypeURIs": ["https://example.org/t/temple", "https://example.org/t/settlement"]
        }] }));
        let mut out = Vec::new();
        report.write_tsv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "#places\t\t");
        assert_eq!(lines[1], "total\t1");
        assert_eq!(lines[2], "#lookups\t\t");
        assert_eq!(lines[3], "https://example.org/t/settlement\t2\tsettlement");
        assert_eq!(lines[4], "https://example.org/t/temple\t1\ttemple");
        assert_eq!(lines[5], "#strings\t\t");
        assert!(lines.contains(&"Place.id:min\t1\t"));
        assert!(lines.contains(&"Place.title:nul\t1\t"));
    }

    #[test]
    fn test_save_creates_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let report = scan_doc(json!({ "@graph": [] }));
        let path = report.save(dir.path().join("out")).unwrap();
        assert!(path.ends_with(REPORT_FILE));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("#places\t\t\ntotal\t0\n"));
    }
}
