//! Forward-only reader over the `@graph` array of a gazetteer export

use super::fields::{self, FieldResult};
use super::{ReadError, ReadIssues, ReadResult};
use crate::lookup::LookupSet;
use crate::model::{
    Attestation, Author, Connection, Coordinates, Feature, Location, Metadata, Name, Place,
    Reference,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, error, warn};

/// Name of the top-level records array.
pub const GRAPH_KEY: &str = "@graph";

/// Reads places one at a time from a gazetteer JSON export.
///
/// The document is parsed once into a JSON tree; records are then decoded
/// into [`Place`] aggregates lazily and each record's JSON is dropped as soon
/// as it has been decoded. The sequence is single-pass: once exhausted,
/// `read()` keeps returning `None`.
///
/// Categorical values are interned into the reader's [`LookupSet`] while
/// decoding, so lookup ids follow record order.
pub struct PlaceReader {
    records: std::vec::IntoIter<Value>,
    position: usize,
    length: usize,
    decoder: RecordDecoder,
}

impl PlaceReader {
    /// Parse `source` with a fresh lookup set.
    pub fn new<R: Read>(source: R) -> ReadResult<Self> {
        Self::with_lookups(source, LookupSet::new())
    }

    /// Parse `source`, interning into an existing lookup set.
    pub fn with_lookups<R: Read>(source: R, lookups: LookupSet) -> ReadResult<Self> {
        let root: Value = serde_json::from_reader(source)?;
        let records = match root {
            Value::Object(mut map) => match map.remove(GRAPH_KEY) {
                Some(Value::Array(items)) => items,
                _ => return Err(ReadError::MissingGraph),
            },
            _ => return Err(ReadError::MissingGraph),
        };

        Ok(Self {
            length: records.len(),
            records: records.into_iter(),
            position: 0,
            decoder: RecordDecoder {
                lookups,
                issues: ReadIssues::default(),
            },
        })
    }

    pub fn open(path: impl AsRef<Path>) -> ReadResult<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }

    /// Read the next place, or `None` at end of sequence.
    pub fn read(&mut self) -> Option<Place> {
        let record = self.records.next()?;
        self.position += 1;
        if !record.is_object() {
            warn!(position = self.position, "record is not an object");
        }
        let place = self.decoder.place(&record);
        debug!(position = self.position, "{}", place);
        Some(place)
    }

    /// 1-based ordinal of the last place returned (0 before the first read).
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total number of records in the document.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn lookups(&self) -> &LookupSet {
        &self.decoder.lookups
    }

    pub fn lookups_mut(&mut self) -> &mut LookupSet {
        &mut self.decoder.lookups
    }

    pub fn into_lookups(self) -> LookupSet {
        self.decoder.lookups
    }

    /// Decode problems met so far.
    pub fn issues(&self) -> ReadIssues {
        self.decoder.issues
    }
}

impl Iterator for PlaceReader {
    type Item = Place;

    fn next(&mut self) -> Option<Place> {
        self.read()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

/// Turns record JSON into model types, interning as it goes.
struct RecordDecoder {
    lookups: LookupSet,
    issues: ReadIssues,
}

impl RecordDecoder {
    /// Unwrap a field result, logging and counting a decode failure.
    fn lenient<T>(&mut self, name: &str, result: FieldResult<T>) -> Option<T> {
        match result {
            Ok(value) => value,
            Err(e) => {
                error!(field = name, "cannot decode field: {}", e);
                self.issues.bad_values += 1;
                None
            }
        }
    }

    fn year(&mut self, obj: &Value, name: &str) -> i16 {
        let result = fields::year(obj, name);
        self.lenient(name, result).unwrap_or_default()
    }

    fn date(&mut self, obj: &Value, name: &str) -> Option<DateTime<Utc>> {
        let result = fields::date(obj, name);
        self.lenient(name, result)
    }

    fn items<'a>(&mut self, obj: &'a Value, name: &str) -> &'a [Value] {
        let result = fields::array(obj, name);
        self.lenient(name, result).map(Vec::as_slice).unwrap_or_default()
    }

    /// Review states are compared lowercase.
    fn review_state(obj: &Value) -> Option<String> {
        fields::string(obj, "review_state").map(|s| s.to_lowercase())
    }

    /// The first `history[]` entry carries the latest modification.
    fn modified(&mut self, obj: &Value) -> Option<DateTime<Utc>> {
        let first = self.items(obj, "history").first()?;
        self.date(first, "modified")
    }

    fn coordinates(&mut self, obj: &Value) -> Coordinates {
        let mut coords = Coordinates::default();

        let point = fields::floats(obj, "reprPoint");
        if let Some(point) = self.lenient("reprPoint", point) {
            if let [lon, lat] = point[..] {
                coords.lon = lon;
                coords.lat = lat;
            } else {
                error!("expected reprPoint length 2, found {}", point.len());
                self.issues.point_shape += 1;
            }
        }

        let bbox = fields::floats(obj, "bbox");
        if let Some(bbox) = self.lenient("bbox", bbox) {
            if let [sw_lon, sw_lat, ne_lon, ne_lat] = bbox[..] {
                coords.sw_lon = sw_lon;
                coords.sw_lat = sw_lat;
                coords.ne_lon = ne_lon;
                coords.ne_lat = ne_lat;
            } else {
                error!("expected bbox length 4, found {}", bbox.len());
                self.issues.bbox_shape += 1;
            }
        }

        coords
    }

    /// Pair parallel value/URI arrays into metadata named `meta_name`.
    ///
    /// Each URI is interned with its value as short name. Arrays of
    /// different length are not paired at all.
    fn pairs(&mut self, obj: &Value, value_name: &str, uri_name: &str, meta_name: &str) -> Vec<Metadata> {
        let values = fields::strings(obj, value_name);
        let values = self.lenient(value_name, values).unwrap_or_default();
        let uris = fields::strings(obj, uri_name);
        let uris = self.lenient(uri_name, uris).unwrap_or_default();

        if values.len() != uris.len() {
            error!(
                "{} and {} lengths differ: {} vs {}",
                value_name,
                uri_name,
                values.len(),
                uris.len()
            );
            self.issues.pair_length += 1;
            return Vec::new();
        }

        values
            .iter()
            .zip(uris)
            .map(|(value, uri)| {
                self.lookups.get_id(Some(&uri), Some(value), None);
                Metadata::new(meta_name, uri)
            })
            .collect()
    }

    /// Read a URI/value property pair, interning the URI with the value as
    /// short name. `None` when both sides are absent.
    fn uri_and_value(&mut self, obj: &Value, uri_name: &str, value_name: &str) -> Option<(Option<String>, Option<String>)> {
        let uri = fields::string(obj, uri_name).filter(|s| !s.is_empty());
        let value = fields::string(obj, value_name).filter(|s| !s.is_empty());
        if uri.is_none() && value.is_none() {
            return None;
        }
        if uri.is_none() || value.is_none() {
            error!("expected {}/{} pair, found only one side", uri_name, value_name);
            self.issues.half_pairs += 1;
        }
        self.lookups.get_id(uri.as_deref(), value.as_deref(), None);
        Some((uri, value))
    }

    fn authors(&mut self, obj: &Value, name: &str) -> Vec<Author> {
        self.items(obj, name)
            .iter()
            .map(|item| Author {
                username: fields::string(item, "username"),
                name: fields::string(item, "name"),
                homepage: fields::string(item, "homepage"),
            })
            .collect()
    }

    fn attestations(&mut self, obj: &Value) -> Vec<Attestation> {
        self.items(obj, "attestations")
            .iter()
            .map(|item| {
                let period = self.uri_and_value(item, "timePeriodURI", "timePeriod");
                let confidence = self.uri_and_value(item, "confidenceURI", "confidence");
                Attestation {
                    period: period.and_then(|(uri, _)| uri),
                    confidence: confidence.and_then(|(uri, label)| uri.or(label)),
                }
            })
            .collect()
    }

    fn references(&mut self, obj: &Value) -> Vec<Reference> {
        self.items(obj, "references")
            .iter()
            .map(|item| Reference {
                title: fields::string(item, "shortTitle"),
                kind: fields::string(item, "type"),
                citation_type_uri: fields::string(item, "citationTypeURI"),
                access_uri: fields::string(item, "accessURI"),
                alternate_uri: fields::string(item, "alternateURI"),
                bib_uri: fields::string(item, "bibliographicURI"),
                citation: fields::string(item, "formattedCitation"),
                citation_detail: fields::string(item, "citationDetail"),
                other_id: fields::string(item, "otherIdentifier"),
            })
            .collect()
    }

    fn features(&mut self, obj: &Value) -> Vec<Feature> {
        self.items(obj, "features")
            .iter()
            .map(|item| {
                let mut feature = Feature {
                    kind: fields::string(item, "type"),
                    geometry: fields::json(item, "geometry"),
                    ..Default::default()
                };
                if let Some(props) = fields::get(item, "properties") {
                    feature.snippet = fields::string(props, "snippet");
                    feature.link = fields::string(props, "link");
                    feature.description = fields::string(props, "description");
                    feature.precision = fields::string(props, "location_precision");
                    feature.title = fields::string(props, "title");
                }
                feature
            })
            .collect()
    }

    fn location(&mut self, item: &Value) -> Location {
        let certainty = self.uri_and_value(item, "associationCertaintyURI", "associationCertainty");
        let accuracy_value = fields::float(item, "accuracy_value");

        let mut metadata = self.pairs(item, "featureType", "featureTypeURI", "feature-type-uri");
        metadata.extend(self.pairs(item, "locationType", "locationTypeURI", "location-type-uri"));

        Location {
            uri: fields::string(item, "uri"),
            title: fields::string(item, "title"),
            description: fields::string(item, "description"),
            details: fields::string(item, "details"),
            provenance: fields::string(item, "provenance"),
            remains: fields::string(item, "archaeologicalRemains"),
            start_year: self.year(item, "start"),
            end_year: self.year(item, "end"),
            certainty: certainty.and_then(|(uri, _)| uri),
            accuracy: fields::string(item, "accuracy"),
            accuracy_value: self.lenient("accuracy_value", accuracy_value).unwrap_or_default(),
            review_state: Self::review_state(item),
            geometry: fields::json(item, "geometry"),
            created: self.date(item, "created"),
            modified: self.modified(item),
            creators: self.authors(item, "creators"),
            contributors: self.authors(item, "contributors"),
            attestations: self.attestations(item),
            references: self.references(item),
            metadata,
        }
    }

    fn connection(&mut self, item: &Value) -> Connection {
        let connection_type = self.uri_and_value(item, "connectionTypeURI", "connectionType");

        Connection {
            uri: fields::string(item, "uri"),
            title: fields::string(item, "title"),
            description: fields::string(item, "description"),
            details: fields::string(item, "details"),
            provenance: fields::string(item, "provenance"),
            start_year: self.year(item, "start"),
            end_year: self.year(item, "end"),
            connection_type: connection_type.and_then(|(uri, _)| uri),
            certainty: fields::string(item, "associationCertainty"),
            review_state: Self::review_state(item),
            target_uri: fields::string(item, "connectsTo"),
            created: self.date(item, "created"),
            modified: self.modified(item),
            creators: self.authors(item, "creators"),
            contributors: self.authors(item, "contributors"),
            attestations: self.attestations(item),
            references: self.references(item),
        }
    }

    fn name(&mut self, item: &Value) -> Name {
        let certainty = self.uri_and_value(item, "associationCertaintyURI", "associationCertainty");

        Name {
            uri: fields::string(item, "uri"),
            language: fields::string(item, "language"),
            attested: fields::string(item, "attested"),
            romanized: fields::string(item, "romanized"),
            description: fields::string(item, "description"),
            details: fields::string(item, "details"),
            provenance: fields::string(item, "provenance"),
            start_year: self.year(item, "start"),
            end_year: self.year(item, "end"),
            name_type: fields::string(item, "nameType"),
            transcription_accuracy: fields::string(item, "transcriptionAccuracy"),
            transcription_completeness: fields::string(item, "transcriptionCompleteness"),
            certainty: certainty.and_then(|(uri, _)| uri),
            review_state: Self::review_state(item),
            created: self.date(item, "created"),
            modified: self.modified(item),
            creators: self.authors(item, "creators"),
            contributors: self.authors(item, "contributors"),
            attestations: self.attestations(item),
            references: self.references(item),
        }
    }

    fn place(&mut self, record: &Value) -> Place {
        let mut place = Place {
            id: fields::string(record, "id").unwrap_or_default(),
            uri: fields::string(record, "uri").unwrap_or_default(),
            kind: fields::string(record, "type"),
            title: fields::string(record, "title"),
            description: fields::string(record, "description"),
            details: fields::string(record, "details"),
            provenance: fields::string(record, "provenance"),
            rights: fields::string(record, "rights"),
            review_state: Self::review_state(record),
            created: self.date(record, "created"),
            coordinates: self.coordinates(record),
            ..Default::default()
        };

        let subjects = fields::strings(record, "subject");
        if let Some(subjects) = self.lenient("subject", subjects) {
            place
                .metadata
                .extend(subjects.into_iter().map(|s| Metadata::new("subject", s)));
        }
        let place_types = self.pairs(record, "placeTypes", "placeTypeURIs", "place-type-uri");
        place.metadata.extend(place_types);

        let targets = fields::strings(record, "connectsWith");
        place.target_uris = self.lenient("connectsWith", targets).unwrap_or_default();

        place.modified = self.modified(record);
        place.creators = self.authors(record, "creators");
        place.contributors = self.authors(record, "contributors");
        place.attestations = self.attestations(record);
        place.references = self.references(record);
        place.features = self.features(record);
        place.locations = self.items(record, "locations").iter().map(|i| self.location(i)).collect();
        place.connections = self
            .items(record, "connections")
            .iter()
            .map(|i| self.connection(i))
            .collect();
        place.names = self.items(record, "names").iter().map(|i| self.name(i)).collect();

        place
    }
}
