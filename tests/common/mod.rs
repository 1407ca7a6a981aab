//! Common test utilities for gazetteer end-to-end tests
//!
//! Builders for small gazetteer documents and a helper that runs a whole
//! import against a store.

#![allow(dead_code)]

use gazetteer::{CancellationToken, ImportOptions, ImportReport, Importer, PlaceReader, PlaceSink};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub fn place_uri(id: &str) -> String {
    format!("https://pleiades.example.org/places/{id}")
}

/// A minimal place record.
pub fn place(id: &str) -> Value {
    json!({
        "id": id,
        "uri": place_uri(id),
        "title": format!("Place {id}"),
        "review_state": "published",
        "reprPoint": [23.72, 37.97],
        "bbox": [23.70, 37.95, 23.75, 37.99]
    })
}

/// Add a connection from `place` to the place with id `target`.
pub fn with_connection(mut place: Value, target: &str) -> Value {
    let connection = json!({
        "uri": format!("{}/connection-{target}", place["uri"].as_str().unwrap_or_default()),
        "title": format!("Connection to {target}"),
        "connectionType": "near",
        "connectionTypeURI": "https://example.org/relationships/near",
        "associationCertainty": "certain",
        "review_state": "published",
        "connectsTo": place_uri(target)
    });
    let connections = place
        .as_object_mut()
        .map(|obj| obj.entry("connections").or_insert_with(|| json!([])));
    if let Some(Value::Array(items)) = connections {
        items.push(connection);
    }
    place
}

pub fn with_field(mut place: Value, name: &str, value: Value) -> Value {
    if let Some(obj) = place.as_object_mut() {
        obj.insert(name.to_string(), value);
    }
    place
}

/// A place with one of every child kind.
pub fn rich_place(id: &str) -> Value {
    let place = place(id);
    let place = with_field(place, "creators", json!([{ "username": "jsmith", "name": "John Smith" }]));
    let place = with_field(place, "contributors", json!([{ "name": "Dénia Smith" }]));
    let place = with_field(place, "subject", json!(["dare:ancient=1"]));
    let place = with_field(place, "placeTypes", json!(["settlement"]));
    let place = with_field(place, "placeTypeURIs", json!(["https://example.org/place-types/settlement"]));
    let place = with_field(
        place,
        "features",
        json!([{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [23.72, 37.97] },
            "properties": { "title": "DARE location", "location_precision": "precise" }
        }]),
    );
    let place = with_field(
        place,
        "locations",
        json!([{
            "title": "DARE location",
            "associationCertainty": "certain",
            "associationCertaintyURI": "https://example.org/association-certainty/certain",
            "accuracy": "https://example.org/accuracy/dare",
            "accuracy_value": 500.0,
            "featureType": ["settlement"],
            "featureTypeURI": ["https://example.org/place-types/settlement"],
            "start": -750,
            "end": 640,
            "review_state": "Published",
            "creators": [{ "username": "jsmith", "name": "J. Smith" }],
            "attestations": [{
                "timePeriod": "classical",
                "timePeriodURI": "https://example.org/time-periods/classical",
                "confidence": "confident",
                "confidenceURI": "https://example.org/confidence/confident"
            }]
        }]),
    );
    let place = with_field(
        place,
        "names",
        json!([{
            "romanized": "Athenae",
            "attested": "Ἀθῆναι",
            "language": "grc",
            "nameType": "geographic",
            "transcriptionAccuracy": "accurate",
            "transcriptionCompleteness": "complete",
            "review_state": "published",
            "references": [{
                "shortTitle": "BAtlas 59 C2",
                "type": "citesAsDataSource",
                "citationTypeURI": "http://purl.org/spar/cito/citesAsDataSource"
            }]
        }]),
    );
    with_field(
        place,
        "history",
        json!([{ "modified": "2020-01-02T00:00:00Z" }, { "modified": "2011-01-01T00:00:00Z" }]),
    )
}

pub fn document(places: Vec<Value>) -> Value {
    json!({ "@context": {}, "@graph": places })
}

pub fn write_document(dir: &Path, doc: &Value) -> PathBuf {
    let path = dir.join("places.json");
    std::fs::write(&path, doc.to_string()).unwrap();
    path
}

/// Run a full import of `doc` into `sink`.
pub fn import_into<S: PlaceSink>(sink: &S, doc: &Value, options: ImportOptions) -> (ImportReport, Importer) {
    let reader = PlaceReader::new(doc.to_string().as_bytes()).unwrap();
    let mut importer = Importer::new(reader, options);
    let report = importer.import(sink, &CancellationToken::new(), None).unwrap();
    (report, importer)
}
