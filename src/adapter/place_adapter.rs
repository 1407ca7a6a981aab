//! Place aggregate to relational rows

use super::flags::ChildFlags;
use crate::links::PendingLink;
use crate::lookup::{
    LookupSet, CITATION_TYPE_GROUP, CONNECTION_CERTAINTY_GROUP, NAME_ACCURACY_GROUP,
    NAME_COMPLETENESS_GROUP, NAME_TYPE_GROUP, REFERENCE_TYPE_GROUP, STATE_GROUP,
};
use crate::model::{Attestation, Author, Connection, Feature, Location, Name, Place, Reference};
use crate::rows::{
    AdaptedPlace, AttestationRow, AuthorLink, AuthorRole, AuthorRow, ConnectionRow, FeatureRow,
    LinkPayload, LocationRow, NameRow, PlaceLinkRow, PlaceRow, ReferenceRow, SatelliteChildren,
};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Prefix of synthesized author keys; never valid in a username.
pub const AUTHOR_KEY_SENTINEL: char = '#';

/// Identity key of an author: the username when present, else the
/// lowercased display name stripped to ASCII letters and digits, prefixed
/// with [`AUTHOR_KEY_SENTINEL`]. `None` when neither yields anything.
pub fn author_key(author: &Author) -> Option<String> {
    if let Some(username) = author.username.as_deref().filter(|u| !u.is_empty()) {
        return Some(username.to_string());
    }
    let stripped: String = author
        .name
        .as_deref()?
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if stripped.is_empty() {
        None
    } else {
        Some(format!("{AUTHOR_KEY_SENTINEL}{stripped}"))
    }
}

/// Converts place aggregates into relational rows.
///
/// Holds the run-wide author table. Lookups are passed in per call so the
/// reader and adapter share a single interning context.
#[derive(Debug, Default)]
pub struct PlaceAdapter {
    authors: Vec<AuthorRow>,
    author_index: HashMap<String, usize>,
}

impl PlaceAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All authors met so far, in first-seen order.
    pub fn authors(&self) -> &[AuthorRow] {
        &self.authors
    }

    pub fn author(&self, key: &str) -> Option<&AuthorRow> {
        self.author_index.get(key).map(|&slot| &self.authors[slot])
    }

    /// Adapt one place. Kinds cleared in `flags` are dropped; connections
    /// and target URIs come back as pending links rather than rows.
    pub fn adapt(&mut self, place: Place, flags: ChildFlags, lookups: &mut LookupSet) -> (AdaptedPlace, Vec<PendingLink>) {
        let mut ctx = AdaptContext {
            flags,
            lookups,
            authors: self,
            new_authors: Vec::new(),
        };

        let source_id = place.id.clone();
        let row = PlaceRow {
            review_state_id: ctx.lookups.grouped_id_of(place.review_state.as_deref(), STATE_GROUP),
            id: place.id,
            uri: place.uri,
            kind: place.kind,
            title: place.title,
            description: place.description,
            details: place.details,
            provenance: place.provenance,
            rights: place.rights,
            created: place.created,
            modified: place.modified,
            lat: place.coordinates.lat,
            lon: place.coordinates.lon,
            sw_lat: place.coordinates.sw_lat,
            sw_lon: place.coordinates.sw_lon,
            ne_lat: place.coordinates.ne_lat,
            ne_lon: place.coordinates.ne_lon,
        };

        let mut adapted = AdaptedPlace {
            place: row,
            ..Default::default()
        };

        if flags.contains(ChildFlags::FEATURES) {
            adapted.features = place.features.into_iter().map(feature_row).collect();
        }
        if flags.contains(ChildFlags::METADATA) {
            adapted.metadata = place.metadata;
        }
        adapted.authors = ctx.author_links(place.creators, place.contributors);
        adapted.attestations = ctx.attestations(place.attestations);
        adapted.references = ctx.references(place.references);
        if flags.contains(ChildFlags::LOCATIONS) {
            adapted.locations = place.locations.into_iter().map(|l| ctx.location(l)).collect();
        }
        if flags.contains(ChildFlags::NAMES) {
            adapted.names = place.names.into_iter().map(|n| ctx.name(n)).collect();
        }

        let mut links = Vec::new();
        if flags.contains(ChildFlags::CONNECTIONS) {
            for connection in place.connections {
                if let Some(link) = ctx.connection(&source_id, connection) {
                    links.push(link);
                }
            }
        }
        if flags.contains(ChildFlags::TARGET_URIS) {
            let mut distinct = HashSet::new();
            for uri in place.target_uris {
                if uri.is_empty() || !distinct.insert(uri.clone()) {
                    continue;
                }
                let payload = LinkPayload::PlaceLink(PlaceLinkRow {
                    source_id: source_id.clone(),
                    target_id: None,
                    target_uri: uri.clone(),
                });
                links.push(PendingLink::new(source_id.clone(), uri, payload));
            }
        }

        adapted.new_authors = ctx.new_authors;
        (adapted, links)
    }

    /// Look up the author's key, creating the author on first sight.
    fn intern_author(&mut self, author: Author, new_authors: &mut Vec<AuthorRow>) -> Option<String> {
        let Some(key) = author_key(&author) else {
            warn!("author without username or name skipped");
            return None;
        };
        if !self.author_index.contains_key(&key) {
            let row = AuthorRow {
                id: key.clone(),
                name: author.name,
                homepage: author.homepage,
            };
            self.author_index.insert(key.clone(), self.authors.len());
            self.authors.push(row.clone());
            new_authors.push(row);
        }
        Some(key)
    }
}

fn feature_row(feature: Feature) -> FeatureRow {
    FeatureRow {
        kind: feature.kind,
        title: feature.title,
        geometry: feature.geometry,
        snippet: feature.snippet,
        link: feature.link,
        description: feature.description,
        precision: feature.precision,
    }
}

/// Per-call state: the selection, the shared lookups and the authors
/// created while adapting this place.
struct AdaptContext<'a> {
    flags: ChildFlags,
    lookups: &'a mut LookupSet,
    authors: &'a mut PlaceAdapter,
    new_authors: Vec<AuthorRow>,
}

impl AdaptContext<'_> {
    fn author_links(&mut self, creators: Vec<Author>, contributors: Vec<Author>) -> Vec<AuthorLink> {
        let mut links = Vec::new();
        let selected = [
            (ChildFlags::CREATORS, AuthorRole::Creator, creators),
            (ChildFlags::CONTRIBUTORS, AuthorRole::Contributor, contributors),
        ];
        for (flag, role, list) in selected {
            if !self.flags.contains(flag) {
                continue;
            }
            for author in list {
                if let Some(author_id) = self.authors.intern_author(author, &mut self.new_authors) {
                    links.push(AuthorLink { author_id, role });
                }
            }
        }
        links
    }

    fn attestations(&mut self, attestations: Vec<Attestation>) -> Vec<AttestationRow> {
        if !self.flags.contains(ChildFlags::ATTESTATIONS) {
            return Vec::new();
        }
        attestations
            .into_iter()
            .map(|a| AttestationRow {
                period_id: self.lookups.id_of(a.period.as_deref()),
                confidence_id: self.lookups.id_of(a.confidence.as_deref()),
            })
            .collect()
    }

    fn references(&mut self, references: Vec<Reference>) -> Vec<ReferenceRow> {
        if !self.flags.contains(ChildFlags::REFERENCES) {
            return Vec::new();
        }
        references
            .into_iter()
            .map(|r| ReferenceRow {
                type_id: self.lookups.grouped_id_of(r.kind.as_deref(), REFERENCE_TYPE_GROUP),
                citation_type_id: self
                    .lookups
                    .grouped_id_of(r.citation_type_uri.as_deref(), CITATION_TYPE_GROUP),
                title: r.title,
                access_uri: r.access_uri,
                alternate_uri: r.alternate_uri,
                bib_uri: r.bib_uri,
                citation: r.citation,
                citation_detail: r.citation_detail,
                other_id: r.other_id,
            })
            .collect()
    }

    fn children(
        &mut self,
        creators: Vec<Author>,
        contributors: Vec<Author>,
        attestations: Vec<Attestation>,
        references: Vec<Reference>,
    ) -> SatelliteChildren {
        SatelliteChildren {
            authors: self.author_links(creators, contributors),
            attestations: self.attestations(attestations),
            references: self.references(references),
        }
    }

    fn location(&mut self, location: Location) -> LocationRow {
        let lookups = &mut *self.lookups;
        let certainty_id = lookups.id_of(location.certainty.as_deref());
        let accuracy_id = lookups.id_of(location.accuracy.as_deref());
        let review_state_id = lookups.grouped_id_of(location.review_state.as_deref(), STATE_GROUP);
        let metadata = if self.flags.contains(ChildFlags::METADATA) {
            location.metadata
        } else {
            Vec::new()
        };

        LocationRow {
            uri: location.uri,
            title: location.title,
            description: location.description,
            details: location.details,
            provenance: location.provenance,
            remains: location.remains,
            start_year: location.start_year,
            end_year: location.end_year,
            certainty_id,
            accuracy_id,
            accuracy_value: location.accuracy_value,
            review_state_id,
            geometry: location.geometry,
            created: location.created,
            modified: location.modified,
            metadata,
            children: self.children(
                location.creators,
                location.contributors,
                location.attestations,
                location.references,
            ),
        }
    }

    fn name(&mut self, name: Name) -> NameRow {
        let lookups = &mut *self.lookups;
        let certainty_id = lookups.id_of(name.certainty.as_deref());
        let review_state_id = lookups.grouped_id_of(name.review_state.as_deref(), STATE_GROUP);
        let type_id = lookups.grouped_id_of(name.name_type.as_deref(), NAME_TYPE_GROUP);
        let accuracy_id = lookups.grouped_id_of(name.transcription_accuracy.as_deref(), NAME_ACCURACY_GROUP);
        let completeness_id =
            lookups.grouped_id_of(name.transcription_completeness.as_deref(), NAME_COMPLETENESS_GROUP);

        NameRow {
            uri: name.uri,
            language: name.language,
            attested: name.attested,
            romanized: name.romanized,
            description: name.description,
            details: name.details,
            provenance: name.provenance,
            start_year: name.start_year,
            end_year: name.end_year,
            type_id,
            accuracy_id,
            completeness_id,
            certainty_id,
            review_state_id,
            created: name.created,
            modified: name.modified,
            children: self.children(name.creators, name.contributors, name.attestations, name.references),
        }
    }

    /// A connection without a target URI can never resolve and is dropped.
    fn connection(&mut self, source_id: &str, connection: Connection) -> Option<PendingLink> {
        let Some(target_uri) = connection.target_uri.filter(|u| !u.is_empty()) else {
            warn!(source = source_id, "connection without target dropped");
            return None;
        };

        let lookups = &mut *self.lookups;
        let type_id = lookups.id_of(connection.connection_type.as_deref());
        let certainty_id = lookups.grouped_id_of(connection.certainty.as_deref(), CONNECTION_CERTAINTY_GROUP);
        let review_state_id = lookups.grouped_id_of(connection.review_state.as_deref(), STATE_GROUP);

        let row = ConnectionRow {
            source_id: source_id.to_string(),
            target_id: None,
            uri: connection.uri,
            title: connection.title,
            description: connection.description,
            details: connection.details,
            provenance: connection.provenance,
            start_year: connection.start_year,
            end_year: connection.end_year,
            type_id,
            certainty_id,
            review_state_id,
            created: connection.created,
            modified: connection.modified,
            children: self.children(
                connection.creators,
                connection.contributors,
                connection.attestations,
                connection.references,
            ),
        };
        Some(PendingLink::new(source_id, target_uri, LinkPayload::Connection(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;

    fn author(username: Option<&str>, name: &str) -> Author {
        Author {
            username: username.map(str::to_string),
            name: Some(name.to_string()),
            homepage: None,
        }
    }

    fn place(id: &str) -> Place {
        Place {
            id: id.to_string(),
            uri: format!("https://example.org/places/{id}"),
            title: Some(format!("Place {id}")),
            ..Default::default()
        }
    }

    #[test]
    fn test_author_key_prefers_username() {
        assert_eq!(author_key(&author(Some("jsmith"), "J. Smith")).as_deref(), Some("jsmith"));
    }

    #[test]
    fn test_synthesized_author_key() {
        assert_eq!(author_key(&author(None, "Dénia Smith")).as_deref(), Some("#dniasmith"));
        assert_eq!(author_key(&author(None, "  ...  ")), None);
    }

    #[test]
    fn test_authors_deduplicated_across_places() {
        let mut adapter = PlaceAdapter::new();
        let mut lookups = LookupSet::new();

        let mut first = place("1");
        first.creators.push(author(Some("jsmith"), "John Smith"));
        let mut second = place("2");
        second.contributors.push(author(Some("jsmith"), "J. Smith"));

        let (a, _) = adapter.adapt(first, ChildFlags::ALL, &mut lookups);
        let (b, _) = adapter.adapt(second, ChildFlags::ALL, &mut lookups);

        assert_eq!(adapter.authors().len(), 1);
        assert_eq!(adapter.author("jsmith").unwrap().name.as_deref(), Some("John Smith"));
        assert_eq!(a.new_authors.len(), 1);
        assert!(b.new_authors.is_empty());
        assert_eq!(a.authors[0].role, AuthorRole::Creator);
        assert_eq!(b.authors[0].role, AuthorRole::Contributor);
    }

    #[test]
    fn test_synthesized_authors_collapse() {
        let mut adapter = PlaceAdapter::new();
        let mut lookups = LookupSet::new();
        let mut p = place("1");
        p.creators.push(author(None, "Dénia Smith"));
        p.locations.push(Location {
            creators: vec![author(None, "dénia smith")],
            ..Default::default()
        });

        let (adapted, _) = adapter.adapt(p, ChildFlags::ALL, &mut lookups);
        assert_eq!(adapter.authors().len(), 1);
        assert_eq!(adapted.new_authors.len(), 1);
        assert_eq!(adapted.locations[0].children.authors[0].author_id, "#dniasmith");
    }

    #[test]
    fn test_duplicate_target_uris_collapse() {
        let mut adapter = PlaceAdapter::new();
        let mut lookups = LookupSet::new();
        let mut p = place("1");
        p.target_uris = vec!["u1".into(), "u1".into(), "u2".into()];

        let (_, links) = adapter.adapt(p, ChildFlags::ALL, &mut lookups);
        let keys: Vec<&str> = links.iter().map(|l| l.target_key.as_str()).collect();
        assert_eq!(keys, vec!["u1", "u2"]);
    }

    #[test]
    fn test_connections_become_pending_links() {
        let mut adapter = PlaceAdapter::new();
        let mut lookups = LookupSet::new();
        let mut p = place("2");
        p.connections.push(Connection {
            connection_type: Some("https://example.org/rel/near".into()),
            certainty: Some("certain".into()),
            target_uri: Some("https://example.org/places/1".into()),
            ..Default::default()
        });
        p.connections.push(Connection::default());

        let (_, links) = adapter.adapt(p, ChildFlags::ALL, &mut lookups);
        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.source_id, "2");
        assert!(!link.is_resolved());
        match &link.payload {
            LinkPayload::Connection(row) => {
                assert_eq!(row.target_id, None);
                assert_eq!(row.type_id, 1);
                assert_eq!(row.certainty_id, 2);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_cleared_flags_drop_kinds() {
        let mut adapter = PlaceAdapter::new();
        let mut lookups = LookupSet::new();
        let mut p = place("1");
        p.metadata.push(Metadata::new("subject", "dare:ancient=1"));
        p.creators.push(author(Some("jsmith"), "John Smith"));
        p.names.push(Name::default());
        p.connections.push(Connection {
            target_uri: Some("https://example.org/places/2".into()),
            ..Default::default()
        });
        p.target_uris.push("https://example.org/places/3".into());

        let flags = ChildFlags::NAMES | ChildFlags::TARGET_URIS;
        let (adapted, links) = adapter.adapt(p, flags, &mut lookups);
        assert!(adapted.metadata.is_empty());
        assert!(adapted.authors.is_empty());
        assert!(adapter.authors().is_empty());
        assert_eq!(adapted.names.len(), 1);
        assert_eq!(links.len(), 1);
        assert!(!links[0].payload.is_connection());
    }

    #[test]
    fn test_categorical_fields_interned_in_groups() {
        let mut adapter = PlaceAdapter::new();
        let mut lookups = LookupSet::new();
        let mut p = place("1");
        p.review_state = Some("published".into());
        p.names.push(Name {
            review_state: Some("published".into()),
            name_type: Some("geographic".into()),
            transcription_accuracy: Some("accurate".into()),
            transcription_completeness: Some("complete".into()),
            ..Default::default()
        });
        p.references.push(Reference {
            kind: Some("citesAsDataSource".into()),
            citation_type_uri: Some("http://purl.org/spar/cito/citesAsDataSource".into()),
            ..Default::default()
        });

        let (adapted, _) = adapter.adapt(p, ChildFlags::ALL, &mut lookups);
        let name = &adapted.names[0];
        assert_eq!(adapted.place.review_state_id, 1);
        assert_eq!(name.review_state_id, 1);
        assert_eq!(adapted.references[0].type_id, 2);
        assert_eq!(adapted.references[0].citation_type_id, 3);
        assert_eq!((name.type_id, name.accuracy_id, name.completeness_id), (4, 5, 6));
        let groups: Vec<Option<&str>> = lookups.entries().iter().map(|e| e.group.as_deref()).collect();
        assert_eq!(
            groups,
            vec![
                Some(STATE_GROUP),
                Some(REFERENCE_TYPE_GROUP),
                Some(CITATION_TYPE_GROUP),
                Some(NAME_TYPE_GROUP),
                Some(NAME_ACCURACY_GROUP),
                Some(NAME_COMPLETENESS_GROUP),
            ]
        );
    }
}
