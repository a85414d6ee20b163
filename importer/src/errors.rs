//! # Importer Errors
//!
//! Only conditions that abort a whole run are errors here. Row malformation,
//! schema-invalid rows and rejected batches are folded into the
//! [`RunSummary`](common::model::summary::RunSummary) instead.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal import failures.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unable to open CSV file {path}: {source}")]
    CsvOpen {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Unable to read CSV header from {path}: {source}")]
    CsvHeader {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Unable to connect to sighting store at {path}: {source}")]
    StoreConnect {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Timed out after {0:?} connecting to sighting store")]
    ConnectTimeout(Duration),

    #[error("Import task join error: {0}")]
    Join(String),
}

/// Failures reported by a [`SightingStore`](crate::store::SightingStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
