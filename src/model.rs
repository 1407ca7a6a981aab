//! Source-side place aggregate, as read from the gazetteer export
//!
//! These types mirror the nested shape of one `@graph` record. Categorical
//! fields keep their raw string form here (usually a URI); the adapter turns
//! them into lookup ids.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A creator or contributor mention.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Author {
    /// External username, when the source has one
    pub username: Option<String>,
    pub name: Option<String>,
    pub homepage: Option<String>,
}

/// A free-form name/value pair attached to a place or location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub name: String,
    pub value: String,
}

impl Metadata {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A time period attestation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Attestation {
    /// Time period URI
    pub period: Option<String>,
    /// Confidence URI
    pub confidence: Option<String>,
}

/// A bibliographic reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reference {
    pub title: Option<String>,
    pub kind: Option<String>,
    pub citation_type_uri: Option<String>,
    pub access_uri: Option<String>,
    pub alternate_uri: Option<String>,
    pub bib_uri: Option<String>,
    pub citation: Option<String>,
    pub citation_detail: Option<String>,
    pub other_id: Option<String>,
}

/// A GeoJSON-like feature summary attached to a place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Feature {
    pub kind: Option<String>,
    pub title: Option<String>,
    /// Geometry serialized as compact JSON
    pub geometry: Option<String>,
    pub snippet: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub precision: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Location {
    pub uri: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub provenance: Option<String>,
    pub remains: Option<String>,
    pub start_year: i16,
    pub end_year: i16,
    pub certainty: Option<String>,
    pub accuracy: Option<String>,
    pub accuracy_value: f64,
    pub review_state: Option<String>,
    pub geometry: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub creators: Vec<Author>,
    pub contributors: Vec<Author>,
    pub attestations: Vec<Attestation>,
    pub references: Vec<Reference>,
    pub metadata: Vec<Metadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Name {
    pub uri: Option<String>,
    pub language: Option<String>,
    pub attested: Option<String>,
    pub romanized: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub provenance: Option<String>,
    pub start_year: i16,
    pub end_year: i16,
    pub name_type: Option<String>,
    pub transcription_accuracy: Option<String>,
    pub transcription_completeness: Option<String>,
    pub certainty: Option<String>,
    pub review_state: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub creators: Vec<Author>,
    pub contributors: Vec<Author>,
    pub attestations: Vec<Attestation>,
    pub references: Vec<Reference>,
}

/// A typed connection from the owning place to another top-level place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Connection {
    pub uri: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub provenance: Option<String>,
    pub start_year: i16,
    pub end_year: i16,
    /// Connection type URI
    pub connection_type: Option<String>,
    pub certainty: Option<String>,
    pub review_state: Option<String>,
    /// URI of the connected place
    pub target_uri: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub creators: Vec<Author>,
    pub contributors: Vec<Author>,
    pub attestations: Vec<Attestation>,
    pub references: Vec<Reference>,
}

/// Reference point and bounding box, all zero when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
    pub sw_lat: f64,
    pub sw_lon: f64,
    pub ne_lat: f64,
    pub ne_lon: f64,
}

/// One top-level record with all of its nested data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Place {
    pub id: String,
    pub uri: String,
    pub kind: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub provenance: Option<String>,
    pub rights: Option<String>,
    pub review_state: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub coordinates: Coordinates,
    pub features: Vec<Feature>,
    pub creators: Vec<Author>,
    pub contributors: Vec<Author>,
    pub locations: Vec<Location>,
    pub connections: Vec<Connection>,
    pub attestations: Vec<Attestation>,
    pub references: Vec<Reference>,
    pub names: Vec<Name>,
    pub metadata: Vec<Metadata>,
    /// Raw `connectsWith` URIs, duplicates included
    pub target_uris: Vec<String>,
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.title.as_deref().unwrap_or(""))
    }
}
