//! Persistence seam for accepted sightings.
//!
//! The pipeline only needs one operation from a store: an unordered batch
//! insert that commits every record it can and reports the ones it could not.

pub mod sqlite;

use crate::errors::{ImportError, StoreError};
use common::model::sighting::Sighting;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use sqlite::SqliteStore;

/// A record the store refused inside an otherwise committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteError {
    /// Position of the rejected document within the batch.
    pub index: usize,
    pub message: String,
}

/// Result of one unordered batch insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted: usize,
    pub write_errors: Vec<WriteError>,
}

pub trait SightingStore {
    /// Inserts `docs` without stopping at the first rejected record.
    ///
    /// `Err` means the batch as a whole could not be written; individual
    /// rejections are reported in [`InsertReport::write_errors`].
    fn insert_many_unordered(&mut self, docs: &[Sighting]) -> Result<InsertReport, StoreError>;
}

impl<S: SightingStore + ?Sized> SightingStore for &mut S {
    fn insert_many_unordered(&mut self, docs: &[Sighting]) -> Result<InsertReport, StoreError> {
        (**self).insert_many_unordered(docs)
    }
}

/// Opens the SQLite store at `path`, giving up after `timeout`.
///
/// The open runs on the blocking pool so a wedged filesystem cannot stall the
/// runtime; on timeout the caller gets [`ImportError::ConnectTimeout`].
pub async fn connect_with_timeout(path: &Path, timeout: Duration) -> Result<SqliteStore, ImportError> {
    open_bounded(path, timeout, |path, timeout| SqliteStore::connect(&path, timeout)).await
}

async fn open_bounded<T, F>(path: &Path, timeout: Duration, open: F) -> Result<T, ImportError>
where
    T: Send + 'static,
    F: FnOnce(PathBuf, Duration) -> Result<T, StoreError> + Send + 'static,
{
    let owned = path.to_path_buf();
    let handle = tokio::task::spawn_blocking(move || open(owned, timeout));

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(store))) => Ok(store),
        Ok(Ok(Err(source))) => Err(ImportError::StoreConnect {
            path: path.to_path_buf(),
            source,
        }),
        Ok(Err(join_err)) => Err(ImportError::Join(join_err.to_string())),
        Err(_) => Err(ImportError::ConnectTimeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_opens_a_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sightings.sqlite");

        let store = connect_with_timeout(&path, Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn unopenable_path_is_a_connect_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("sightings.sqlite");

        match connect_with_timeout(&path, Duration::from_secs(5)).await {
            Err(ImportError::StoreConnect { path: reported, .. }) => assert_eq!(reported, path),
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("opened a database in a missing directory"),
        }
    }

    #[tokio::test]
    async fn slow_open_times_out() {
        let timeout = Duration::from_millis(20);
        let result = open_bounded(Path::new("slow.sqlite"), timeout, |_, _| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        })
        .await;

        match result {
            Err(ImportError::ConnectTimeout(waited)) => assert_eq!(waited, timeout),
            other => panic!("unexpected result {:?}", other.map_err(|e| e.to_string())),
        }
    }
}
