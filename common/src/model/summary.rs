use serde::{Deserialize, Serialize};

/// Counters accumulated over one import run.
///
/// This is the externally observable result of an import: callers read it
/// instead of scraping the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Data rows read from the CSV, header excluded.
    pub total_rows: u64,
    /// Documents the store reported as committed.
    pub inserted: u64,
    /// Rows dropped before reaching the store (`skipped_empty + skipped_invalid`).
    pub skipped: u64,
    pub skipped_empty: u64,
    pub skipped_invalid: u64,
    /// Rows where neither latitude nor longitude coerced to a finite number.
    pub missing_geolocation: u64,
    /// Rows whose event date was absent or unparseable.
    pub missing_event_date: u64,
    /// Batch writes attempted against the store.
    pub flushes: u64,
    /// Batches the store rejected as a whole.
    pub failed_batches: u64,
    /// Individual documents the store rejected inside otherwise committed batches.
    pub write_errors: u64,
    /// Error raised by the last flush after the stream ended, if any.
    pub final_flush_error: Option<String>,
}

impl RunSummary {
    pub fn record_empty(&mut self) {
        self.skipped += 1;
        self.skipped_empty += 1;
    }

    pub fn record_invalid(&mut self) {
        self.skipped += 1;
        self.skipped_invalid += 1;
    }
}
