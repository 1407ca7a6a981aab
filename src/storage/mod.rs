//! Storage backends for gazetteer imports
//!
//! The import pipeline writes through the `PlaceSink` trait. The primary
//! implementation is `SqliteStore`; `NullSink` discards everything.

mod sqlite;
mod traits;

pub use sqlite::{SqliteStore, TABLES};
pub use traits::{NullSink, OpenStore, PlaceSink, StorageError, StorageResult};
