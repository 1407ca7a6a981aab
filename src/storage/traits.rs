//! Storage trait definitions

use crate::links::PendingLink;
use crate::lookup::LookupEntry;
use crate::rows::AdaptedPlace;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Store is not empty: table {0} has rows")]
    NotEmpty(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination of an import.
///
/// Each call is one atomic unit: either every row it carries is stored or
/// none is. No upserts are required; callers never write the same place
/// twice within a run.
pub trait PlaceSink {
    /// Called once before the first write of a run. A store that already
    /// holds a run refuses here, before anything is written.
    fn begin_run(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Insert whole place aggregates with all their satellite rows.
    fn insert_places(&self, places: &[AdaptedPlace]) -> StorageResult<()>;

    /// Insert the run's lookup table.
    fn insert_lookups(&self, entries: &[LookupEntry]) -> StorageResult<()>;

    /// Insert connection and place-link rows. Every link is resolved.
    fn insert_links(&self, links: &[PendingLink]) -> StorageResult<()>;
}

impl<S: PlaceSink + ?Sized> PlaceSink for &S {
    fn begin_run(&self) -> StorageResult<()> {
        (**self).begin_run()
    }

    fn insert_places(&self, places: &[AdaptedPlace]) -> StorageResult<()> {
        (**self).insert_places(places)
    }

    fn insert_lookups(&self, entries: &[LookupEntry]) -> StorageResult<()> {
        (**self).insert_lookups(entries)
    }

    fn insert_links(&self, links: &[PendingLink]) -> StorageResult<()> {
        (**self).insert_links(links)
    }
}

/// A sink that stores nothing, for runs that never write.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PlaceSink for NullSink {
    fn insert_places(&self, _places: &[AdaptedPlace]) -> StorageResult<()> {
        Ok(())
    }

    fn insert_lookups(&self, _entries: &[LookupEntry]) -> StorageResult<()> {
        Ok(())
    }

    fn insert_links(&self, _links: &[PendingLink]) -> StorageResult<()> {
        Ok(())
    }
}

/// Extension trait for opening stores from paths
pub trait OpenStore: PlaceSink + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
