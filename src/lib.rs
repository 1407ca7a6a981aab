//! Gazetteer: streaming graph-to-relational importer
//!
//! Reads a gazetteer export (one `@graph` array of nested place records) and
//! loads it into a normalized relational store in a single forward pass.
//!
//! # Core Concepts
//!
//! - **Places**: nested aggregates of locations, names, connections,
//!   attestations, references and authors
//! - **Lookups**: categorical strings interned to dense integer ids, shared
//!   across the whole run
//! - **Pending links**: place-to-place references recorded before their target
//!   is known, resolved as targets are read
//!
//! # Example
//!
//! ```
//! use gazetteer::{CancellationToken, ImportOptions, Importer, OpenStore, PlaceReader, SqliteStore};
//!
//! let doc = r#"{ "@graph": [{ "id": "1", "uri": "https://example.org/places/1" }] }"#;
//! let reader = PlaceReader::new(doc.as_bytes()).unwrap();
//! let store = SqliteStore::open_in_memory().unwrap();
//! let mut importer = Importer::new(reader, ImportOptions::default());
//! let report = importer.import(&store, &CancellationToken::new(), None).unwrap();
//! assert_eq!(report.places_imported, 1);
//! ```

pub mod adapter;
pub mod import;
pub mod links;
pub mod lookup;
pub mod metrics;
pub mod model;
pub mod reader;
pub mod rows;
pub mod storage;
pub mod writer;

pub use adapter::{ChildFlags, PlaceAdapter};
pub use import::{
    BarProgress, CancellationToken, ImportError, ImportOptions, ImportProgress, ImportReport,
    ImportResult, Importer, ProgressSink,
};
pub use links::{LinkResolver, PendingLink};
pub use lookup::{LookupEntry, LookupSet};
pub use metrics::{scan, ScanReport};
pub use model::Place;
pub use reader::{PlaceReader, ReadError, ReadIssues};
pub use rows::{AdaptedPlace, LinkPayload};
pub use storage::{NullSink, OpenStore, PlaceSink, SqliteStore, StorageError, StorageResult};
pub use writer::BatchedWriter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
