//! Buffered, unordered batch writes.
//!
//! The writer owns the only mutable buffer in the pipeline. Callers push
//! valid documents with [`BatchWriter::accept`] and call
//! [`BatchWriter::flush`] once [`BatchWriter::is_full`] reports the threshold,
//! which keeps at most one batch in memory and one write in flight.

use crate::store::SightingStore;
use common::model::sighting::Sighting;
use common::model::summary::RunSummary;
use log::{error, info, warn};

/// What happened to one flushed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub batch_len: usize,
    pub committed: usize,
    pub rejected: usize,
    /// Whole-batch failure message, if the store could not take the batch at all.
    pub error: Option<String>,
    pub is_final: bool,
}

pub struct BatchWriter<S> {
    store: S,
    buffer: Vec<Sighting>,
    batch_size: usize,
    inserted: u64,
    flushes: u64,
    failed_batches: u64,
    write_errors: u64,
    final_error: Option<String>,
}

impl<S: SightingStore> BatchWriter<S> {
    /// A `batch_size` of zero is treated as one.
    pub fn new(store: S, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            buffer: Vec::with_capacity(batch_size),
            batch_size,
            inserted: 0,
            flushes: 0,
            failed_batches: 0,
            write_errors: 0,
            final_error: None,
        }
    }

    pub fn accept(&mut self, doc: Sighting) {
        self.buffer.push(doc);
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.batch_size
    }

    /// Writes the whole buffer as one batch and reports how many documents
    /// were committed.
    ///
    /// The buffer is emptied whatever the store answers; failed batches are
    /// logged and dropped, never retried. Returns `None` when there was
    /// nothing to write.
    pub fn flush(&mut self, is_final: bool) -> Option<FlushReport> {
        if self.buffer.is_empty() {
            return None;
        }
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        self.flushes += 1;

        let report = match self.store.insert_many_unordered(&batch) {
            Ok(outcome) => {
                let rejected = outcome.write_errors.len();
                self.inserted += outcome.inserted as u64;
                self.write_errors += rejected as u64;
                if rejected > 0 {
                    error!(
                        "Batch write errors: {} of {} documents rejected by the store",
                        rejected,
                        batch.len()
                    );
                    warn!("Locally valid documents were rejected; the store schema and the import validation have drifted");
                    if let Some(first) = outcome.write_errors.first() {
                        warn!("First rejection (batch index {}): {}", first.index, first.message);
                    }
                }
                if !is_final {
                    info!("Inserted so far: {}", self.inserted);
                }
                FlushReport {
                    batch_len: batch.len(),
                    committed: outcome.inserted,
                    rejected,
                    error: None,
                    is_final,
                }
            }
            Err(e) => {
                self.failed_batches += 1;
                error!("Batch insert failed for {} documents: {}", batch.len(), e);
                if is_final {
                    self.final_error = Some(e.to_string());
                }
                FlushReport {
                    batch_len: batch.len(),
                    committed: 0,
                    rejected: 0,
                    error: Some(e.to_string()),
                    is_final,
                }
            }
        };
        Some(report)
    }

    /// Copies the writer's counters into `summary`.
    pub fn record_into(&self, summary: &mut RunSummary) {
        summary.inserted = self.inserted;
        summary.flushes = self.flushes;
        summary.failed_batches = self.failed_batches;
        summary.write_errors = self.write_errors;
        summary.final_flush_error = self.final_error.clone();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::store::{InsertReport, WriteError};

    /// Records every batch and fails the ones it is told to.
    #[derive(Default)]
    pub(crate) struct ScriptedStore {
        pub batches: Vec<usize>,
        /// Batch numbers (0-based) that fail as a whole.
        pub unreachable: Vec<usize>,
        /// Per batch number, the in-batch indexes to reject.
        pub rejects: Vec<(usize, Vec<usize>)>,
    }

    impl SightingStore for ScriptedStore {
        fn insert_many_unordered(&mut self, docs: &[Sighting]) -> Result<InsertReport, StoreError> {
            let batch_no = self.batches.len();
            self.batches.push(docs.len());
            if self.unreachable.contains(&batch_no) {
                return Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some("connection refused".into()),
                )));
            }
            let rejected: Vec<usize> = self
                .rejects
                .iter()
                .find(|(n, _)| *n == batch_no)
                .map(|(_, idx)| idx.clone())
                .unwrap_or_default();
            Ok(InsertReport {
                inserted: docs.len() - rejected.len(),
                write_errors: rejected
                    .into_iter()
                    .map(|index| WriteError {
                        index,
                        message: "document failed validation".into(),
                    })
                    .collect(),
            })
        }
    }

    fn fill(writer: &mut BatchWriter<&mut ScriptedStore>, n: usize) -> Vec<FlushReport> {
        let mut reports = Vec::new();
        for _ in 0..n {
            writer.accept(Sighting::default());
            if writer.is_full() {
                reports.extend(writer.flush(false));
            }
        }
        reports.extend(writer.flush(true));
        reports
    }

    #[test]
    fn empty_buffer_flush_is_a_no_op() {
        let mut store = ScriptedStore::default();
        let mut writer = BatchWriter::new(&mut store, 2);
        assert_eq!(writer.flush(true), None);
        drop(writer);
        assert!(store.batches.is_empty());
    }

    #[test]
    fn five_documents_in_batches_of_two() {
        let mut store = ScriptedStore::default();
        let mut writer = BatchWriter::new(&mut store, 2);
        let reports = fill(&mut writer, 5);
        assert!(writer.buffer.is_empty());

        let mut summary = RunSummary::default();
        writer.record_into(&mut summary);
        assert_eq!(summary.inserted, 5);
        assert_eq!(summary.flushes, 3);
        assert_eq!(reports.last().map(|r| r.is_final), Some(true));
        drop(writer);
        assert_eq!(store.batches, vec![2, 2, 1]);
    }

    #[test]
    fn partial_rejection_counts_committed_documents() {
        let mut store = ScriptedStore {
            rejects: vec![(0, vec![1])],
            ..Default::default()
        };
        let mut writer = BatchWriter::new(&mut store, 3);
        let reports = fill(&mut writer, 5);

        assert_eq!(reports[0].committed, 2);
        assert_eq!(reports[0].rejected, 1);
        let mut summary = RunSummary::default();
        writer.record_into(&mut summary);
        assert_eq!(summary.inserted, 4);
        assert_eq!(summary.write_errors, 1);
        assert_eq!(summary.final_flush_error, None);
    }

    #[test]
    fn unreachable_store_drops_batch_and_continues() {
        let mut store = ScriptedStore {
            unreachable: vec![0],
            ..Default::default()
        };
        let mut writer = BatchWriter::new(&mut store, 2);
        let reports = fill(&mut writer, 5);

        assert_eq!(reports.len(), 3);
        assert!(reports[0].error.is_some());
        let mut summary = RunSummary::default();
        writer.record_into(&mut summary);
        assert_eq!(summary.inserted, 3);
        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.final_flush_error, None);
    }

    #[test]
    fn final_flush_failure_is_reported_not_raised() {
        let mut store = ScriptedStore {
            unreachable: vec![2],
            ..Default::default()
        };
        let mut writer = BatchWriter::new(&mut store, 2);
        fill(&mut writer, 5);

        let mut summary = RunSummary::default();
        writer.record_into(&mut summary);
        assert_eq!(summary.inserted, 4);
        assert_eq!(
            summary.final_flush_error.as_deref(),
            Some("SQLite error: connection refused")
        );
    }
}
