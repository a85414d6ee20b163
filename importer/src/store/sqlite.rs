//! SQLite-backed sightings collection.
//!
//! The `sightings` table carries the collection's required-field contract as
//! `NOT NULL` and `CHECK` constraints, so the store rejects a document that
//! slipped past local validation exactly the way the document database did.

use super::{InsertReport, SightingStore, WriteError};
use crate::errors::StoreError;
use common::model::sighting::Sighting;
use log::info;
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sightings (
    id              TEXT PRIMARY KEY,
    kingdom         TEXT NOT NULL CHECK (length(kingdom) > 0),
    phylum          TEXT NOT NULL CHECK (length(phylum) > 0),
    class           TEXT NOT NULL CHECK (length(class) > 0),
    \"order\"       TEXT NOT NULL CHECK (length(\"order\") > 0),
    family          TEXT NOT NULL CHECK (length(family) > 0),
    genus           TEXT NOT NULL CHECK (length(genus) > 0),
    species         TEXT NOT NULL CHECK (length(species) > 0),
    country         TEXT NOT NULL CHECK (length(country) > 0),
    latitude        REAL NOT NULL,
    longitude       REAL NOT NULL,
    event_date      TEXT NOT NULL CHECK (date(event_date) IS NOT NULL),
    scientific_name TEXT NOT NULL CHECK (length(scientific_name) > 0)
);
";

const INSERT: &str = "INSERT INTO sightings (
    id, kingdom, phylum, class, \"order\", family, genus, species,
    country, latitude, longitude, event_date, scientific_name
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn connect(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let store = Self::with_connection(conn)?;
        info!("Connected to sightings store at {}", path.display());
        Ok(store)
    }

    /// A throwaway store, used by tests and dry runs.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Number of stored sightings.
    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sightings", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Removes every stored sighting, returning how many were deleted.
    pub fn clear(&self) -> Result<usize, StoreError> {
        Ok(self.conn.execute("DELETE FROM sightings", [])?)
    }

    /// Scientific name and country of one stored sighting, if any.
    pub fn sample(&self) -> Result<Option<(String, String)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT scientific_name, country FROM sightings LIMIT 1")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
            None => Ok(None),
        }
    }
}

impl SightingStore for SqliteStore {
    fn insert_many_unordered(&mut self, docs: &[Sighting]) -> Result<InsertReport, StoreError> {
        let tx = self.conn.transaction()?;
        let mut report = InsertReport::default();
        {
            let mut stmt = tx.prepare_cached(INSERT)?;
            for (index, doc) in docs.iter().enumerate() {
                let t = &doc.taxonomy;
                let loc = &doc.location;
                let result = stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    t.kingdom,
                    t.phylum,
                    t.class,
                    t.order,
                    t.family,
                    t.genus,
                    t.species,
                    loc.country,
                    loc.geolocation.latitude,
                    loc.geolocation.longitude,
                    doc.event_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    doc.scientific_name,
                ]);
                match result {
                    Ok(_) => report.inserted += 1,
                    Err(e) => report.write_errors.push(WriteError {
                        index,
                        message: e.to_string(),
                    }),
                }
            }
        }
        tx.commit()?;
        Ok(report)
    }
}
