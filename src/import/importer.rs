//! Import orchestration: reader, adapter, resolver and writer in lock-step

use super::cancel::CancellationToken;
use super::progress::{ImportProgress, ProgressSink};
use crate::adapter::{ChildFlags, PlaceAdapter};
use crate::links::LinkResolver;
use crate::lookup::LookupSet;
use crate::reader::{PlaceReader, ReadError, ReadIssues};
use crate::storage::{PlaceSink, StorageError};
use crate::writer::{BatchedWriter, DEFAULT_BATCH_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("read error: {0}")]
    Read(#[from] ReadError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Run parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Records to read and discard before importing
    pub skip: usize,
    /// Maximum records to import after skipping; 0 for no limit
    pub limit: usize,
    /// Read, adapt and resolve without writing anything
    pub dry_run: bool,
    /// Child collections to export
    pub flags: ChildFlags,
    /// Places per write unit
    pub batch_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 0,
            dry_run: false,
            flags: ChildFlags::ALL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Final figures of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub places_read: usize,
    pub places_skipped: usize,
    pub places_imported: usize,
    pub lookups: usize,
    pub authors: usize,
    pub links_created: usize,
    pub links_resolved: usize,
    pub links_unresolved: usize,
    pub read_issues: ReadIssues,
    pub cancelled: bool,
    pub dry_run: bool,
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Places read:      {}", self.places_read)?;
        writeln!(f, "Places skipped:   {}", self.places_skipped)?;
        writeln!(f, "Places imported:  {}", self.places_imported)?;
        writeln!(f, "Lookups:          {}", self.lookups)?;
        writeln!(f, "Authors:          {}", self.authors)?;
        writeln!(
            f,
            "Links:            {} created, {} resolved, {} unresolved",
            self.links_created, self.links_resolved, self.links_unresolved
        )?;
        let issues = &self.read_issues;
        writeln!(
            f,
            "Read issues:      {} point, {} bbox, {} pair length, {} half pair, {} bad value",
            issues.point_shape, issues.bbox_shape, issues.pair_length, issues.half_pairs, issues.bad_values
        )?;
        if self.dry_run {
            writeln!(f, "Dry run: nothing written")?;
        }
        if self.cancelled {
            writeln!(f, "Cancelled")?;
        }
        Ok(())
    }
}

/// Drives one import run over a single reader.
///
/// The importer owns the run-scoped state: the reader (and its lookup set),
/// the author table and the pending links. A fresh importer is a fresh run.
pub struct Importer {
    reader: PlaceReader,
    adapter: PlaceAdapter,
    resolver: LinkResolver,
    options: ImportOptions,
}

impl Importer {
    pub fn new(reader: PlaceReader, options: ImportOptions) -> Self {
        Self {
            reader,
            adapter: PlaceAdapter::new(),
            resolver: LinkResolver::new(),
            options,
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn lookups(&self) -> &LookupSet {
        self.reader.lookups()
    }

    pub fn adapter(&self) -> &PlaceAdapter {
        &self.adapter
    }

    /// Run the import to the end of input, the limit, or cancellation.
    ///
    /// Finalization (last flush, lookups, resolved links) runs in every case;
    /// in a dry run nothing at all reaches `sink`. Otherwise the sink must
    /// accept [`PlaceSink::begin_run`], so a run never lands on top of an
    /// earlier one.
    pub fn import<S: PlaceSink>(
        &mut self,
        sink: &S,
        cancel: &CancellationToken,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> ImportResult<ImportReport> {
        let options = self.options.clone();
        let mut writer = BatchedWriter::new(sink, options.batch_size);
        let mut report = ImportReport {
            dry_run: options.dry_run,
            ..Default::default()
        };
        let length = self.reader.length();

        info!(
            records = length,
            skip = options.skip,
            limit = options.limit,
            dry_run = options.dry_run,
            flags = %options.flags,
            "import started"
        );

        if !options.dry_run {
            sink.begin_run()?;
        }

        loop {
            if cancel.is_cancelled() {
                warn!(position = self.reader.position(), "import cancelled");
                report.cancelled = true;
                break;
            }
            if options.limit > 0 && report.places_imported >= options.limit {
                break;
            }
            let Some(place) = self.reader.read() else {
                break;
            };
            report.places_read += 1;
            let position = self.reader.position();

            if position <= options.skip {
                report.places_skipped += 1;
                if let Some(sink) = progress.as_deref_mut() {
                    sink.report(&ImportProgress::new(position, length, place.to_string(), true));
                }
                continue;
            }

            if let Some(sink) = progress.as_deref_mut() {
                sink.report(&ImportProgress::new(position, length, place.to_string(), false));
            }

            let (adapted, links) = self.adapter.adapt(place, options.flags, self.reader.lookups_mut());
            report.links_created += links.len();
            for link in links {
                self.resolver.add(link);
            }
            self.resolver.resolve_against(&adapted.place.id, &adapted.place.uri);

            if !options.dry_run {
                writer.write_place(adapted)?;
            }
            report.places_imported += 1;
        }

        if !options.dry_run {
            writer.flush()?;
            writer.write_lookups(self.reader.lookups().entries())?;
        }
        report.links_unresolved = self.resolver.drain_unresolved();
        let links = self.resolver.take_links();
        report.links_resolved = links.len();
        if !options.dry_run {
            writer.resolve_pending(&links)?;
        }

        report.lookups = self.reader.lookups().len();
        report.authors = self.adapter.authors().len();
        report.read_issues = self.reader.issues();

        info!(
            imported = report.places_imported,
            unresolved = report.links_unresolved,
            "import finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NullSink, OpenStore, SqliteStore};
    use serde_json::json;

    fn reader_for(doc: serde_json::Value) -> PlaceReader {
        PlaceReader::new(doc.to_string().as_bytes()).unwrap()
    }

    fn corpus(count: usize) -> serde_json::Value {
        let places: Vec<_> = (1..=count)
            .map(|i| {
                json!({
                    "id": i.to_string(),
                    "uri": format!("https://example.org/places/{i}"),
                    "title": format!("Place {i}"),
                    "review_state": "published"
                })
            })
            .collect();
        json!({ "@graph": places })
    }

    #[test]
    fn test_skip_and_limit() {
        let store = SqliteStore::open_in_memory().unwrap();
        let options = ImportOptions {
            skip: 2,
            limit: 2,
            ..Default::default()
        };
        let mut importer = Importer::new(reader_for(corpus(10)), options);
        let report = importer.import(&store, &CancellationToken::new(), None).unwrap();

        assert_eq!(report.places_read, 4);
        assert_eq!(report.places_skipped, 2);
        assert_eq!(report.places_imported, 2);
        assert_eq!(store.count("place").unwrap(), 2);
    }

    #[test]
    fn test_cancellation_still_finalizes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut progress = move |p: &ImportProgress| {
            if p.position == 3 {
                token.cancel();
            }
        };

        let mut importer = Importer::new(reader_for(corpus(10)), ImportOptions::default());
        let report = importer.import(&store, &cancel, Some(&mut progress)).unwrap();

        assert!(report.cancelled);
        assert_eq!(report.places_imported, 3);
        assert_eq!(store.count("place").unwrap(), 3);
        assert_eq!(store.count("lookup").unwrap(), 1);
    }

    #[test]
    fn test_second_run_into_same_store_is_refused() {
        let store = SqliteStore::open_in_memory().unwrap();
        Importer::new(reader_for(corpus(2)), ImportOptions::default())
            .import(&store, &CancellationToken::new(), None)
            .unwrap();

        let mut again = Importer::new(reader_for(corpus(3)), ImportOptions::default());
        let err = again.import(&store, &CancellationToken::new(), None).unwrap_err();
        assert!(matches!(err, ImportError::Storage(StorageError::NotEmpty(_))));
        assert_eq!(store.count("place").unwrap(), 2);
        assert_eq!(store.count("lookup").unwrap(), 1);

        store.clear().unwrap();
        let mut fresh = Importer::new(reader_for(corpus(3)), ImportOptions::default());
        fresh.import(&store, &CancellationToken::new(), None).unwrap();
        assert_eq!(store.count("place").unwrap(), 3);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let options = ImportOptions {
            dry_run: true,
            ..Default::default()
        };
        let mut importer = Importer::new(reader_for(corpus(3)), options);
        let report = importer.import(&store, &CancellationToken::new(), None).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.places_imported, 3);
        assert_eq!(report.lookups, 1);
        assert_eq!(store.count("place").unwrap(), 0);
        assert_eq!(store.count("lookup").unwrap(), 0);
    }

    #[test]
    fn test_progress_reports_every_record() {
        let mut seen = Vec::new();
        let mut progress = |p: &ImportProgress| seen.push((p.position, p.skipped));
        let options = ImportOptions {
            skip: 1,
            ..Default::default()
        };
        let mut importer = Importer::new(reader_for(corpus(3)), options);
        importer
            .import(&NullSink, &CancellationToken::new(), Some(&mut progress))
            .unwrap();
        assert_eq!(seen, vec![(1, true), (2, false), (3, false)]);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ImportOptions = serde_json::from_value(json!({ "limit": 5 })).unwrap();
        assert_eq!(options.limit, 5);
        assert_eq!(options.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(options.flags, ChildFlags::ALL);
    }
}
