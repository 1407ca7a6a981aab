//! Batched persistence of adapted places

use crate::links::PendingLink;
use crate::lookup::LookupEntry;
use crate::rows::AdaptedPlace;
use crate::storage::{PlaceSink, StorageResult};
use tracing::{debug, error, info};

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Accumulates places and writes them to a sink in batches.
///
/// Every place given to [`write_place`](Self::write_place) is covered by
/// exactly one sink call once [`flush`](Self::flush) has run at the end. A
/// failed flush is fatal: the batch is dropped and the error returned.
pub struct BatchedWriter<'a, S: PlaceSink> {
    sink: &'a S,
    batch: Vec<AdaptedPlace>,
    batch_size: usize,
    places_written: usize,
    flushes: usize,
}

impl<'a, S: PlaceSink> BatchedWriter<'a, S> {
    /// A batch size of 0 is taken as 1.
    pub fn new(sink: &'a S, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            places_written: 0,
            flushes: 0,
        }
    }

    pub fn write_place(&mut self, place: AdaptedPlace) -> StorageResult<()> {
        self.batch.push(place);
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Write the current batch as one unit. No-op when empty.
    pub fn flush(&mut self) -> StorageResult<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.batch_size));
        self.sink.insert_places(&batch)?;
        self.places_written += batch.len();
        self.flushes += 1;
        debug!(size = batch.len(), total = self.places_written, "batch flushed");
        Ok(())
    }

    pub fn write_lookups(&mut self, entries: &[LookupEntry]) -> StorageResult<()> {
        self.sink.insert_lookups(entries)?;
        info!(count = entries.len(), "lookups written");
        Ok(())
    }

    /// Write every resolved link; unresolved ones are logged and skipped.
    /// Returns the number of links written.
    pub fn resolve_pending(&mut self, links: &[PendingLink]) -> StorageResult<usize> {
        let resolved: Vec<PendingLink> = links
            .iter()
            .filter(|link| {
                if !link.is_resolved() {
                    error!(
                        source = %link.source_id,
                        target = %link.target_key,
                        "skipping unresolved link"
                    );
                }
                link.is_resolved()
            })
            .cloned()
            .collect();
        self.sink.insert_links(&resolved)?;
        info!(count = resolved.len(), "links written");
        Ok(resolved.len())
    }

    pub fn places_written(&self) -> usize {
        self.places_written
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Places waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{LinkPayload, PlaceLinkRow, PlaceRow};
    use crate::storage::StorageError;
    use std::sync::Mutex;

    /// Records the shape of every call it receives.
    #[derive(Default)]
    struct RecordingSink {
        flushes: Mutex<Vec<usize>>,
        lookups: Mutex<usize>,
        links: Mutex<Vec<String>>,
        fail: bool,
    }

    impl PlaceSink for RecordingSink {
        fn insert_places(&self, places: &[AdaptedPlace]) -> StorageResult<()> {
            if self.fail {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.flushes.lock().unwrap().push(places.len());
            Ok(())
        }

        fn insert_lookups(&self, entries: &[LookupEntry]) -> StorageResult<()> {
            *self.lookups.lock().unwrap() += entries.len();
            Ok(())
        }

        fn insert_links(&self, links: &[PendingLink]) -> StorageResult<()> {
            let mut stored = self.links.lock().unwrap();
            stored.extend(links.iter().map(|l| l.target_key.clone()));
            Ok(())
        }
    }

    fn place(id: usize) -> AdaptedPlace {
        AdaptedPlace {
            place: PlaceRow {
                id: id.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn link(target: &str, resolved: Option<&str>) -> PendingLink {
        let mut link = PendingLink::new(
            "1",
            target,
            LinkPayload::PlaceLink(PlaceLinkRow {
                source_id: "1".into(),
                target_id: None,
                target_uri: target.into(),
            }),
        );
        link.resolved = resolved.map(str::to_string);
        link
    }

    #[test]
    fn test_batch_flush_sizes() {
        let sink = RecordingSink::default();
        let mut writer = BatchedWriter::new(&sink, 2);
        for id in 0..5 {
            writer.write_place(place(id)).unwrap();
        }
        assert_eq!(writer.pending(), 1);
        writer.flush().unwrap();

        assert_eq!(*sink.flushes.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(writer.flushes(), 3);
        assert_eq!(writer.places_written(), 5);
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let sink = RecordingSink::default();
        let mut writer = BatchedWriter::new(&sink, DEFAULT_BATCH_SIZE);
        writer.flush().unwrap();
        assert!(sink.flushes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_batch_size_flushes_every_place() {
        let sink = RecordingSink::default();
        let mut writer = BatchedWriter::new(&sink, 0);
        writer.write_place(place(1)).unwrap();
        writer.write_place(place(2)).unwrap();
        assert_eq!(*sink.flushes.lock().unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_flush_failure_is_returned() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut writer = BatchedWriter::new(&sink, 1);
        assert!(writer.write_place(place(1)).is_err());
        assert_eq!(writer.places_written(), 0);
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_resolve_pending_skips_unresolved() {
        let sink = RecordingSink::default();
        let mut writer = BatchedWriter::new(&sink, 2);
        let links = vec![link("u1", Some("2")), link("u2", None), link("u3", Some("3"))];
        assert_eq!(writer.resolve_pending(&links).unwrap(), 2);
        assert_eq!(*sink.links.lock().unwrap(), vec!["u1", "u3"]);
    }

    #[test]
    fn test_write_lookups() {
        let sink = RecordingSink::default();
        let mut writer = BatchedWriter::new(&sink, 2);
        let entries = vec![LookupEntry {
            id: 1,
            group: None,
            full_name: "a".into(),
            short_name: None,
        }];
        writer.write_lookups(&entries).unwrap();
        assert_eq!(*sink.lookups.lock().unwrap(), 1);
    }
}
