//! Identity-based deduplication of extracted records
//!
//! Every record leaving the extraction engine passes through here. A record
//! whose identity hash is already stored is dropped on the spot, before any
//! image download or other costly follow-up work can happen.

use crate::record::{ExtractedRecord, HasIdentityHash};
use crate::storage::traits::{RecordStore, StorageResult};

/// Whether a record has been seen before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    New,
    Duplicate,
}

/// Running totals of admitted and discarded records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupCounters {
    pub products_stored: u64,
    pub images_stored: u64,
    pub duplicates: u64,
}

/// Gatekeeper between extraction and the record store
#[derive(Debug, Default)]
pub struct Deduplicator {
    counters: DedupCounters,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks the record's identity hash up in its collection
    pub fn should_process<S>(&self, store: &S, record: &ExtractedRecord) -> StorageResult<Verdict>
    where
        S: RecordStore + ?Sized,
    {
        let existing = store.find_by_identity(record.collection(), record.identity_hash())?;
        Ok(if existing.is_some() {
            Verdict::Duplicate
        } else {
            Verdict::New
        })
    }

    /// Stores a new record, or discards a duplicate
    ///
    /// Returns the record back when it was stored so it can be forwarded
    /// downstream, and `None` when it was discarded.
    pub fn admit<S>(&mut self, store: &mut S, record: ExtractedRecord) -> StorageResult<Option<ExtractedRecord>>
    where
        S: RecordStore + ?Sized,
    {
        match self.should_process(store, &record)? {
            Verdict::Duplicate => {
                tracing::debug!(
                    "Discarding duplicate {} {}",
                    record.kind(),
                    record.identity_hash()
                );
                self.counters.duplicates += 1;
                Ok(None)
            }
            Verdict::New => {
                store.upsert(record.collection(), record.identity_hash(), &record)?;
                match record {
                    ExtractedRecord::Product(_) => self.counters.products_stored += 1,
                    ExtractedRecord::Image(_) => self.counters.images_stored += 1,
                }
                Ok(Some(record))
            }
        }
    }

    pub fn counters(&self) -> DedupCounters {
        self.counters
    }
}
