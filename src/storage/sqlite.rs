//! SQLite storage backend for gazetteer imports

use super::traits::{OpenStore, PlaceSink, StorageError, StorageResult};
use crate::links::PendingLink;
use crate::lookup::LookupEntry;
use crate::model::Metadata;
use crate::rows::{AdaptedPlace, AuthorRow, ConnectionRow, LinkPayload, PlaceLinkRow, SatelliteChildren};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Every table of the schema, parents before children.
pub const TABLES: &[&str] = &[
    "lookup",
    "author",
    "place",
    "place_feature",
    "place_meta",
    "place_author_link",
    "place_attestation",
    "place_reference",
    "place_link",
    "location",
    "location_meta",
    "location_author_link",
    "location_attestation",
    "location_reference",
    "name",
    "name_author_link",
    "name_attestation",
    "name_reference",
    "connection",
    "connection_author_link",
    "connection_attestation",
    "connection_reference",
];

const SCHEMA: &str = r#"
    -- Interned categorical values
    CREATE TABLE IF NOT EXISTS lookup (
        id INTEGER PRIMARY KEY,
        grp TEXT,
        full_name TEXT NOT NULL,
        short_name TEXT
    );

    -- Authors, keyed by username or synthesized key
    CREATE TABLE IF NOT EXISTS author (
        id TEXT PRIMARY KEY,
        name TEXT,
        homepage TEXT
    );

    CREATE TABLE IF NOT EXISTS place (
        id TEXT PRIMARY KEY,
        uri TEXT NOT NULL,
        kind TEXT,
        title TEXT,
        description TEXT,
        details TEXT,
        provenance TEXT,
        rights TEXT,
        review_state_id INTEGER NOT NULL,
        created TEXT,
        modified TEXT,
        lat REAL NOT NULL,
        lon REAL NOT NULL,
        sw_lat REAL NOT NULL,
        sw_lon REAL NOT NULL,
        ne_lat REAL NOT NULL,
        ne_lon REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_place_uri ON place(uri);

    CREATE TABLE IF NOT EXISTS place_feature (
        id INTEGER PRIMARY KEY,
        place_id TEXT NOT NULL REFERENCES place(id),
        kind TEXT,
        title TEXT,
        geometry TEXT,
        snippet TEXT,
        link TEXT,
        description TEXT,
        precision TEXT
    );

    CREATE TABLE IF NOT EXISTS place_meta (
        id INTEGER PRIMARY KEY,
        place_id TEXT NOT NULL REFERENCES place(id),
        name TEXT NOT NULL,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS place_author_link (
        place_id TEXT NOT NULL REFERENCES place(id),
        author_id TEXT NOT NULL REFERENCES author(id),
        role TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS place_attestation (
        id INTEGER PRIMARY KEY,
        place_id TEXT NOT NULL REFERENCES place(id),
        period_id INTEGER NOT NULL,
        confidence_id INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS place_reference (
        id INTEGER PRIMARY KEY,
        place_id TEXT NOT NULL REFERENCES place(id),
        title TEXT,
        type_id INTEGER NOT NULL,
        citation_type_id INTEGER NOT NULL,
        access_uri TEXT,
        alternate_uri TEXT,
        bib_uri TEXT,
        citation TEXT,
        citation_detail TEXT,
        other_id TEXT
    );

    -- Untyped place-to-place links from raw target URIs
    CREATE TABLE IF NOT EXISTS place_link (
        id INTEGER PRIMARY KEY,
        source_id TEXT NOT NULL REFERENCES place(id),
        target_id TEXT NOT NULL REFERENCES place(id),
        target_uri TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS location (
        id INTEGER PRIMARY KEY,
        place_id TEXT NOT NULL REFERENCES place(id),
        uri TEXT,
        title TEXT,
        description TEXT,
        details TEXT,
        provenance TEXT,
        remains TEXT,
        start_year INTEGER NOT NULL,
        end_year INTEGER NOT NULL,
        certainty_id INTEGER NOT NULL,
        accuracy_id INTEGER NOT NULL,
        accuracy_value REAL NOT NULL,
        review_state_id INTEGER NOT NULL,
        geometry TEXT,
        created TEXT,
        modified TEXT
    );

    CREATE TABLE IF NOT EXISTS location_meta (
        id INTEGER PRIMARY KEY,
        location_id INTEGER NOT NULL REFERENCES location(id),
        name TEXT NOT NULL,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS location_author_link (
        location_id INTEGER NOT NULL REFERENCES location(id),
        author_id TEXT NOT NULL REFERENCES author(id),
        role TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS location_attestation (
        id INTEGER PRIMARY KEY,
        location_id INTEGER NOT NULL REFERENCES location(id),
        period_id INTEGER NOT NULL,
        confidence_id INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS location_reference (
        id INTEGER PRIMARY KEY,
        location_id INTEGER NOT NULL REFERENCES location(id),
        title TEXT,
        type_id INTEGER NOT NULL,
        citation_type_id INTEGER NOT NULL,
        access_uri TEXT,
        alternate_uri TEXT,
        bib_uri TEXT,
        citation TEXT,
        citation_detail TEXT,
        other_id TEXT
    );

    CREATE TABLE IF NOT EXISTS name (
        id INTEGER PRIMARY KEY,
        place_id TEXT NOT NULL REFERENCES place(id),
        uri TEXT,
        language TEXT,
        attested TEXT,
        romanized TEXT,
        description TEXT,
        details TEXT,
        provenance TEXT,
        start_year INTEGER NOT NULL,
        end_year INTEGER NOT NULL,
        type_id INTEGER NOT NULL,
        accuracy_id INTEGER NOT NULL,
        completeness_id INTEGER NOT NULL,
        certainty_id INTEGER NOT NULL,
        review_state_id INTEGER NOT NULL,
        created TEXT,
        modified TEXT
    );

    CREATE TABLE IF NOT EXISTS name_author_link (
        name_id INTEGER NOT NULL REFERENCES name(id),
        author_id TEXT NOT NULL REFERENCES author(id),
        role TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS name_attestation (
        id INTEGER PRIMARY KEY,
        name_id INTEGER NOT NULL REFERENCES name(id),
        period_id INTEGER NOT NULL,
        confidence_id INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS name_reference (
        id INTEGER PRIMARY KEY,
        name_id INTEGER NOT NULL REFERENCES name(id),
        title TEXT,
        type_id INTEGER NOT NULL,
        citation_type_id INTEGER NOT NULL,
        access_uri TEXT,
        alternate_uri TEXT,
        bib_uri TEXT,
        citation TEXT,
        citation_detail TEXT,
        other_id TEXT
    );

    -- Typed connections; written only once the target is resolved
    CREATE TABLE IF NOT EXISTS connection (
        id INTEGER PRIMARY KEY,
        source_id TEXT NOT NULL REFERENCES place(id),
        target_id TEXT NOT NULL REFERENCES place(id),
        uri TEXT,
        title TEXT,
        description TEXT,
        details TEXT,
        provenance TEXT,
        start_year INTEGER NOT NULL,
        end_year INTEGER NOT NULL,
        type_id INTEGER NOT NULL,
        certainty_id INTEGER NOT NULL,
        review_state_id INTEGER NOT NULL,
        created TEXT,
        modified TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_connection_source ON connection(source_id);
    CREATE INDEX IF NOT EXISTS idx_connection_target ON connection(target_id);

    CREATE TABLE IF NOT EXISTS connection_author_link (
        connection_id INTEGER NOT NULL REFERENCES connection(id),
        author_id TEXT NOT NULL REFERENCES author(id),
        role TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS connection_attestation (
        id INTEGER PRIMARY KEY,
        connection_id INTEGER NOT NULL REFERENCES connection(id),
        period_id INTEGER NOT NULL,
        confidence_id INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS connection_reference (
        id INTEGER PRIMARY KEY,
        connection_id INTEGER NOT NULL REFERENCES connection(id),
        title TEXT,
        type_id INTEGER NOT NULL,
        citation_type_id INTEGER NOT NULL,
        access_uri TEXT,
        alternate_uri TEXT,
        bib_uri TEXT,
        citation TEXT,
        citation_detail TEXT,
        other_id TEXT
    );

    -- Enable foreign keys
    PRAGMA foreign_keys = ON;

    -- WAL lets readers query the store while a long import is writing
    PRAGMA journal_mode = WAL;
"#;

fn timestamp(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.as_ref().map(DateTime::to_rfc3339)
}

/// SQLite-backed import destination
///
/// One database file holds the whole normalized schema. Thread-safe via an
/// internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// A poisoned lock only means another thread panicked mid-call; the
    /// connection itself is still usable.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delete every row, children first.
    pub fn clear(&self) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for table in TABLES.iter().rev() {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.commit()?;
        debug!("store cleared");
        Ok(())
    }

    /// Row count of one schema table.
    pub fn count(&self, table: &str) -> StorageResult<usize> {
        if !TABLES.contains(&table) {
            return Err(StorageError::UnknownTable(table.to_string()));
        }
        let count: i64 = self
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// The stored lookup table, in id order.
    pub fn lookups(&self) -> StorageResult<Vec<LookupEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, grp, full_name, short_name FROM lookup ORDER BY id")?;
        let entries = stmt
            .query_map([], |row| {
                Ok(LookupEntry {
                    id: row.get(0)?,
                    group: row.get(1)?,
                    full_name: row.get(2)?,
                    short_name: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn author(&self, id: &str) -> StorageResult<Option<AuthorRow>> {
        let author = self
            .conn()
            .query_row(
                "SELECT id, name, homepage FROM author WHERE id = ?1",
                params![id],
                |row| {
                    Ok(AuthorRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        homepage: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(author)
    }

    /// `(source_id, target_id)` of every stored connection, in insertion order.
    pub fn connection_targets(&self) -> StorageResult<Vec<(String, String)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT source_id, target_id FROM connection ORDER BY id")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    fn insert_place(tx: &Transaction<'_>, adapted: &AdaptedPlace) -> StorageResult<()> {
        for author in &adapted.new_authors {
            tx.prepare_cached("INSERT INTO author (id, name, homepage) VALUES (?1, ?2, ?3)")?
                .execute(params![author.id, author.name, author.homepage])?;
        }

        let p = &adapted.place;
        tx.prepare_cached(
            r#"
            INSERT INTO place (id, uri, kind, title, description, details, provenance, rights,
                               review_state_id, created, modified,
                               lat, lon, sw_lat, sw_lon, ne_lat, ne_lon)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )?
        .execute(params![
            p.id,
            p.uri,
            p.kind,
            p.title,
            p.description,
            p.details,
            p.provenance,
            p.rights,
            p.review_state_id,
            timestamp(&p.created),
            timestamp(&p.modified),
            p.lat,
            p.lon,
            p.sw_lat,
            p.sw_lon,
            p.ne_lat,
            p.ne_lon,
        ])?;

        for f in &adapted.features {
            tx.prepare_cached(
                r#"
                INSERT INTO place_feature (place_id, kind, title, geometry, snippet, link, description, precision)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?
            .execute(params![p.id, f.kind, f.title, f.geometry, f.snippet, f.link, f.description, f.precision])?;
        }

        let children = SatelliteChildren {
            authors: adapted.authors.clone(),
            attestations: adapted.attestations.clone(),
            references: adapted.references.clone(),
        };
        Self::insert_meta(tx, "place", &p.id, &adapted.metadata)?;
        Self::insert_children(tx, "place", &p.id, &children)?;

        for l in &adapted.locations {
            tx.prepare_cached(
                r#"
                INSERT INTO location (place_id, uri, title, description, details, provenance, remains,
                                      start_year, end_year, certainty_id, accuracy_id, accuracy_value,
                                      review_state_id, geometry, created, modified)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                "#,
            )?
            .execute(params![
                p.id,
                l.uri,
                l.title,
                l.description,
                l.details,
                l.provenance,
                l.remains,
                l.start_year,
                l.end_year,
                l.certainty_id,
                l.accuracy_id,
                l.accuracy_value,
                l.review_state_id,
                l.geometry,
                timestamp(&l.created),
                timestamp(&l.modified),
            ])?;
            let location_id = tx.last_insert_rowid();
            Self::insert_meta(tx, "location", &location_id, &l.metadata)?;
            Self::insert_children(tx, "location", &location_id, &l.children)?;
        }

        for n in &adapted.names {
            tx.prepare_cached(
                r#"
                INSERT INTO name (place_id, uri, language, attested, romanized, description, details,
                                  provenance, start_year, end_year, type_id, accuracy_id, completeness_id,
                                  certainty_id, review_state_id, created, modified)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                "#,
            )?
            .execute(params![
                p.id,
                n.uri,
                n.language,
                n.attested,
                n.romanized,
                n.description,
                n.details,
                n.provenance,
                n.start_year,
                n.end_year,
                n.type_id,
                n.accuracy_id,
                n.completeness_id,
                n.certainty_id,
                n.review_state_id,
                timestamp(&n.created),
                timestamp(&n.modified),
            ])?;
            let name_id = tx.last_insert_rowid();
            Self::insert_children(tx, "name", &name_id, &n.children)?;
        }

        Ok(())
    }

    fn insert_meta(tx: &Transaction<'_>, kind: &str, owner: &dyn ToSql, metadata: &[Metadata]) -> StorageResult<()> {
        if metadata.is_empty() {
            return Ok(());
        }
        let mut stmt = tx.prepare_cached(&format!(
            "INSERT INTO {kind}_meta ({kind}_id, name, value) VALUES (?1, ?2, ?3)"
        ))?;
        for m in metadata {
            stmt.execute(params![owner, m.name, m.value])?;
        }
        Ok(())
    }

    /// Author links, attestations and references of one owner row.
    fn insert_children(
        tx: &Transaction<'_>,
        kind: &str,
        owner: &dyn ToSql,
        children: &SatelliteChildren,
    ) -> StorageResult<()> {
        if !children.authors.is_empty() {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {kind}_author_link ({kind}_id, author_id, role) VALUES (?1, ?2, ?3)"
            ))?;
            for link in &children.authors {
                stmt.execute(params![owner, link.author_id, link.role.code()])?;
            }
        }

        if !children.attestations.is_empty() {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {kind}_attestation ({kind}_id, period_id, confidence_id) VALUES (?1, ?2, ?3)"
            ))?;
            for a in &children.attestations {
                stmt.execute(params![owner, a.period_id, a.confidence_id])?;
            }
        }

        if !children.references.is_empty() {
            let mut stmt = tx.prepare_cached(&format!(
                r#"
                INSERT INTO {kind}_reference ({kind}_id, title, type_id, citation_type_id, access_uri,
                                              alternate_uri, bib_uri, citation, citation_detail, other_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#
            ))?;
            for r in &children.references {
                stmt.execute(params![
                    owner,
                    r.title,
                    r.type_id,
                    r.citation_type_id,
                    r.access_uri,
                    r.alternate_uri,
                    r.bib_uri,
                    r.citation,
                    r.citation_detail,
                    r.other_id,
                ])?;
            }
        }

        Ok(())
    }

    fn insert_connection(tx: &Transaction<'_>, target_id: &str, c: &ConnectionRow) -> StorageResult<()> {
        tx.prepare_cached(
            r#"
            INSERT INTO connection (source_id, target_id, uri, title, description, details, provenance,
                                    start_year, end_year, type_id, certainty_id, review_state_id,
                                    created, modified)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )?
        .execute(params![
            c.source_id,
            target_id,
            c.uri,
            c.title,
            c.description,
            c.details,
            c.provenance,
            c.start_year,
            c.end_year,
            c.type_id,
            c.certainty_id,
            c.review_state_id,
            timestamp(&c.created),
            timestamp(&c.modified),
        ])?;
        let connection_id = tx.last_insert_rowid();
        Self::insert_children(tx, "connection", &connection_id, &c.children)
    }

    fn insert_place_link(tx: &Transaction<'_>, target_id: &str, link: &PlaceLinkRow) -> StorageResult<()> {
        tx.prepare_cached("INSERT INTO place_link (source_id, target_id, target_uri) VALUES (?1, ?2, ?3)")?
            .execute(params![link.source_id, target_id, link.target_uri])?;
        Ok(())
    }
}

impl PlaceSink for SqliteStore {
    /// Lookup ids restart at 1 every run, so only an empty store can take one.
    fn begin_run(&self) -> StorageResult<()> {
        for table in TABLES {
            if self.count(table)? > 0 {
                return Err(StorageError::NotEmpty(table.to_string()));
            }
        }
        Ok(())
    }

    fn insert_places(&self, places: &[AdaptedPlace]) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for place in places {
            Self::insert_place(&tx, place)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_lookups(&self, entries: &[LookupEntry]) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare_cached("INSERT INTO lookup (id, grp, full_name, short_name) VALUES (?1, ?2, ?3, ?4)")?;
            for e in entries {
                stmt.execute(params![e.id, e.group, e.full_name, e.short_name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_links(&self, links: &[PendingLink]) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for link in links {
            let Some(target_id) = link.resolved.as_deref() else {
                warn!(source = %link.source_id, target = %link.target_key, "unresolved link not stored");
                continue;
            };
            match &link.payload {
                LinkPayload::Connection(row) => Self::insert_connection(&tx, target_id, row)?,
                LinkPayload::PlaceLink(row) => Self::insert_place_link(&tx, target_id, row)?,
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{
        AttestationRow, AuthorLink, AuthorRole, LocationRow, NameRow, PlaceRow, ReferenceRow,
    };

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn create_test_place(id: &str) -> AdaptedPlace {
        AdaptedPlace {
            place: PlaceRow {
                id: id.to_string(),
                uri: format!("https://example.org/places/{id}"),
                title: Some(format!("Place {id}")),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn resolved_connection(source: &str, target: &str) -> PendingLink {
        let mut link = PendingLink::new(
            source,
            format!("https://example.org/places/{target}"),
            LinkPayload::Connection(ConnectionRow {
                source_id: source.to_string(),
                ..Default::default()
            }),
        );
        link.resolved = Some(target.to_string());
        link.payload.set_target(target);
        link
    }

    #[test]
    fn test_insert_place_with_satellites() {
        let store = create_test_store();
        let mut place = create_test_place("1");
        place.new_authors.push(AuthorRow {
            id: "jsmith".into(),
            name: Some("John Smith".into()),
            homepage: None,
        });
        place.authors.push(AuthorLink {
            author_id: "jsmith".into(),
            role: AuthorRole::Creator,
        });
        place.metadata.push(Metadata::new("subject", "dare:ancient=1"));
        place.locations.push(LocationRow {
            metadata: vec![Metadata::new("feature-type-uri", "https://example.org/ft/settlement")],
            children: SatelliteChildren {
                authors: vec![AuthorLink {
                    author_id: "jsmith".into(),
                    role: AuthorRole::Contributor,
                }],
                attestations: vec![AttestationRow {
                    period_id: 1,
                    confidence_id: 2,
                }],
                references: vec![ReferenceRow::default()],
            },
            ..Default::default()
        });
        place.names.push(NameRow::default());

        store.insert_places(&[place]).unwrap();

        assert_eq!(store.count("place").unwrap(), 1);
        assert_eq!(store.count("author").unwrap(), 1);
        assert_eq!(store.count("place_author_link").unwrap(), 1);
        assert_eq!(store.count("place_meta").unwrap(), 1);
        assert_eq!(store.count("location").unwrap(), 1);
        assert_eq!(store.count("location_meta").unwrap(), 1);
        assert_eq!(store.count("location_author_link").unwrap(), 1);
        assert_eq!(store.count("location_attestation").unwrap(), 1);
        assert_eq!(store.count("location_reference").unwrap(), 1);
        assert_eq!(store.count("name").unwrap(), 1);
        assert_eq!(
            store.author("jsmith").unwrap().unwrap().name.as_deref(),
            Some("John Smith")
        );
    }

    #[test]
    fn test_begin_run_requires_empty_store() {
        let store = create_test_store();
        store.begin_run().unwrap();

        store.insert_places(&[create_test_place("1")]).unwrap();
        let err = store.begin_run().unwrap_err();
        assert!(matches!(err, StorageError::NotEmpty(ref table) if table == "place"));

        store.clear().unwrap();
        store.begin_run().unwrap();
    }

    #[test]
    fn test_failed_batch_is_rolled_back() {
        let store = create_test_store();
        // The second place repeats the first id
        let result = store.insert_places(&[create_test_place("1"), create_test_place("1")]);
        assert!(result.is_err());
        assert_eq!(store.count("place").unwrap(), 0);
    }

    #[test]
    fn test_lookups_round_trip() {
        let store = create_test_store();
        let entries = vec![
            LookupEntry {
                id: 1,
                group: Some("state".into()),
                full_name: "published".into(),
                short_name: None,
            },
            LookupEntry {
                id: 2,
                group: None,
                full_name: "https://example.org/t/settlement".into(),
                short_name: Some("settlement".into()),
            },
        ];
        store.insert_lookups(&entries).unwrap();
        assert_eq!(store.lookups().unwrap(), entries);
    }

    #[test]
    fn test_insert_links() {
        let store = create_test_store();
        store
            .insert_places(&[create_test_place("1"), create_test_place("2")])
            .unwrap();

        let mut place_link = PendingLink::new(
            "1",
            "https://example.org/places/2",
            LinkPayload::PlaceLink(PlaceLinkRow {
                source_id: "1".into(),
                target_id: None,
                target_uri: "https://example.org/places/2".into(),
            }),
        );
        place_link.resolved = Some("2".into());

        store
            .insert_links(&[resolved_connection("2", "1"), place_link])
            .unwrap();

        assert_eq!(
            store.connection_targets().unwrap(),
            vec![("2".to_string(), "1".to_string())]
        );
        assert_eq!(store.count("place_link").unwrap(), 1);
    }

    #[test]
    fn test_unresolved_links_are_not_stored() {
        let store = create_test_store();
        store.insert_places(&[create_test_place("1")]).unwrap();
        let mut link = resolved_connection("1", "1");
        link.resolved = None;
        store.insert_links(&[link]).unwrap();
        assert_eq!(store.count("connection").unwrap(), 0);
    }

    #[test]
    fn test_link_to_missing_place_violates_foreign_key() {
        let store = create_test_store();
        store.insert_places(&[create_test_place("1")]).unwrap();
        let result = store.insert_links(&[resolved_connection("1", "1"), resolved_connection("1", "404")]);
        assert!(matches!(result, Err(StorageError::Database(_))));
        assert_eq!(store.count("connection").unwrap(), 0);
    }

    #[test]
    fn test_clear_and_unknown_table() {
        let store = create_test_store();
        store.insert_places(&[create_test_place("1")]).unwrap();
        store.clear().unwrap();
        assert_eq!(store.count("place").unwrap(), 0);
        assert!(matches!(
            store.count("place; DROP TABLE place"),
            Err(StorageError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_wal_mode_enabled_at_connection() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("gazetteer.db");
        let store = SqliteStore::open(&db_path).unwrap();

        let journal_mode: String = store
            .conn()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();

        assert_eq!(journal_mode, "wal");
        assert!(db_path.exists());
    }
}
