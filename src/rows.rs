//! Relational rows produced by the adapter
//!
//! Every categorical string has been replaced by a lookup id here (0 when
//! absent). Satellite rows own their nested children; the storage layer
//! assigns their integer keys when a batch is inserted.

use crate::model::Metadata;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Role marker on an author link row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AuthorRole {
    Creator,
    Contributor,
}

impl AuthorRole {
    /// Single-letter code stored in the `role` column.
    pub fn code(self) -> &'static str {
        match self {
            AuthorRole::Creator => "A",
            AuthorRole::Contributor => "C",
        }
    }
}

/// A corpus-wide author, keyed by username or synthesized key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRow {
    pub id: String,
    pub name: Option<String>,
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorLink {
    pub author_id: String,
    pub role: AuthorRole,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaceRow {
    pub id: String,
    pub uri: String,
    pub kind: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub provenance: Option<String>,
    pub rights: Option<String>,
    pub review_state_id: i32,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub lat: f64,
    pub lon: f64,
    pub sw_lat: f64,
    pub sw_lon: f64,
    pub ne_lat: f64,
    pub ne_lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureRow {
    pub kind: Option<String>,
    pub title: Option<String>,
    pub geometry: Option<String>,
    pub snippet: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub precision: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttestationRow {
    pub period_id: i32,
    pub confidence_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceRow {
    pub title: Option<String>,
    pub type_id: i32,
    pub citation_type_id: i32,
    pub access_uri: Option<String>,
    pub alternate_uri: Option<String>,
    pub bib_uri: Option<String>,
    pub citation: Option<String>,
    pub citation_detail: Option<String>,
    pub other_id: Option<String>,
}

/// Child rows shared by locations, names and connections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SatelliteChildren {
    pub authors: Vec<AuthorLink>,
    pub attestations: Vec<AttestationRow>,
    pub references: Vec<ReferenceRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationRow {
    pub uri: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub provenance: Option<String>,
    pub remains: Option<String>,
    pub start_year: i16,
    pub end_year: i16,
    pub certainty_id: i32,
    pub accuracy_id: i32,
    pub accuracy_value: f64,
    pub review_state_id: i32,
    pub geometry: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub metadata: Vec<Metadata>,
    pub children: SatelliteChildren,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NameRow {
    pub uri: Option<String>,
    pub language: Option<String>,
    pub attested: Option<String>,
    pub romanized: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub provenance: Option<String>,
    pub start_year: i16,
    pub end_year: i16,
    pub type_id: i32,
    pub accuracy_id: i32,
    pub completeness_id: i32,
    pub certainty_id: i32,
    pub review_state_id: i32,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub children: SatelliteChildren,
}

/// Typed connection between two places. `target_id` stays unset until the
/// link resolver has seen the target place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionRow {
    pub source_id: String,
    pub target_id: Option<String>,
    pub uri: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub provenance: Option<String>,
    pub start_year: i16,
    pub end_year: i16,
    pub type_id: i32,
    pub certainty_id: i32,
    pub review_state_id: i32,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub children: SatelliteChildren,
}

/// Untyped place-to-place link from a raw target URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceLinkRow {
    pub source_id: String,
    pub target_id: Option<String>,
    pub target_uri: String,
}

/// What a pending link writes once resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LinkPayload {
    Connection(ConnectionRow),
    PlaceLink(PlaceLinkRow),
}

impl LinkPayload {
    pub fn set_target(&mut self, target_id: &str) {
        let slot = match self {
            LinkPayload::Connection(row) => &mut row.target_id,
            LinkPayload::PlaceLink(row) => &mut row.target_id,
        };
        *slot = Some(target_id.to_string());
    }

    pub fn target_id(&self) -> Option<&str> {
        match self {
            LinkPayload::Connection(row) => row.target_id.as_deref(),
            LinkPayload::PlaceLink(row) => row.target_id.as_deref(),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, LinkPayload::Connection(_))
    }
}

/// One place and every satellite row it owns, flushed as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdaptedPlace {
    pub place: PlaceRow,
    pub features: Vec<FeatureRow>,
    pub metadata: Vec<Metadata>,
    pub authors: Vec<AuthorLink>,
    pub attestations: Vec<AttestationRow>,
    pub references: Vec<ReferenceRow>,
    pub locations: Vec<LocationRow>,
    pub names: Vec<NameRow>,
    /// Authors first seen in this place; written before its link rows
    pub new_authors: Vec<AuthorRow>,
}
