//! Streaming driver: CSV rows in, batched sightings out.
//!
//! Rows are pulled one at a time and run through
//! normalize -> build -> classify synchronously. When the writer's buffer is
//! full the loop flushes before pulling the next row, so reading is suspended
//! for exactly as long as a batch write is in flight.

use super::builder::{classify, DocumentBuilder, Outcome};
use super::coercer::Coercer;
use super::normalizer::{normalize, CellValue, RawRow, SYNONYMS};
use super::writer::{BatchWriter, FlushReport};
use crate::config::ImportConfig;
use crate::errors::ImportError;
use crate::store::SightingStore;
use common::model::sighting::Sighting;
use common::model::summary::RunSummary;
use csv::{ByteRecord, ReaderBuilder};
use log::{error, info, warn};
use std::fs::File;
use std::path::Path;

/// Per-row stage of the pipeline: builds, counts and classifies.
pub struct RowProcessor<'t> {
    builder: DocumentBuilder<'t>,
}

impl<'t> RowProcessor<'t> {
    pub fn new(builder: DocumentBuilder<'t>) -> Self {
        Self { builder }
    }

    /// Turns one raw row into a document ready for the store, or `None` when
    /// the row is dropped. Counters land in `summary`.
    pub fn process(&self, raw: RawRow, summary: &mut RunSummary) -> Option<Sighting> {
        summary.total_rows += 1;
        let doc = self.builder.build(&normalize(raw));

        if doc.location.geolocation.is_unusable() {
            summary.missing_geolocation += 1;
        }
        if doc.event_date.is_none() {
            summary.missing_event_date += 1;
        }

        match classify(&doc) {
            Outcome::Valid => Some(doc),
            Outcome::EmptyEquivalent => {
                summary.record_empty();
                None
            }
            Outcome::SchemaInvalid => {
                summary.record_invalid();
                None
            }
        }
    }
}

/// Pushes every row of `rows` through `processor` into `writer`, then flushes
/// whatever is left.
///
/// `on_flush` sees each batch outcome before the next row is read.
pub fn drive<I, S, F>(
    rows: I,
    processor: &RowProcessor<'_>,
    writer: &mut BatchWriter<S>,
    summary: &mut RunSummary,
    mut on_flush: F,
) where
    I: IntoIterator<Item = RawRow>,
    S: SightingStore,
    F: FnMut(&FlushReport),
{
    for raw in rows {
        if let Some(doc) = processor.process(raw, summary) {
            writer.accept(doc);
            if writer.is_full() {
                if let Some(report) = writer.flush(false) {
                    on_flush(&report);
                }
            }
        }
    }
    if let Some(report) = writer.flush(true) {
        on_flush(&report);
    }
    writer.record_into(summary);
}

/// Iterator over the data rows of a CSV file.
///
/// Column counts may vary from row to row: missing trailing cells are simply
/// absent, extra cells are ignored. Cells are decoded lossily. A read error
/// ends the stream instead of failing the run.
pub struct CsvRows<R> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    record: ByteRecord,
    finished: bool,
}

impl CsvRows<File> {
    pub fn open(path: &Path, delimiter: u8) -> Result<Self, ImportError> {
        let reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|source| ImportError::CsvOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_reader(reader).map_err(|source| ImportError::CsvHeader {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<R: std::io::Read> CsvRows<R> {
    pub fn from_reader(mut reader: csv::Reader<R>) -> Result<Self, csv::Error> {
        let headers = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        Ok(Self {
            reader,
            headers,
            record: ByteRecord::new(),
            finished: false,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: std::io::Read> Iterator for CsvRows<R> {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        if self.finished {
            return None;
        }
        match self.reader.read_byte_record(&mut self.record) {
            Ok(true) => Some(
                self.headers
                    .iter()
                    .zip(self.record.iter())
                    .map(|(h, cell)| {
                        (
                            h.clone(),
                            CellValue::Text(String::from_utf8_lossy(cell).into_owned()),
                        )
                    })
                    .collect(),
            ),
            Ok(false) => {
                self.finished = true;
                None
            }
            Err(e) => {
                error!("Error reading CSV: {}", e);
                self.finished = true;
                None
            }
        }
    }
}

/// Imports the CSV named by `config` into `store`.
///
/// Only an unreadable input file is fatal; everything that goes wrong after
/// the header is read ends up in the returned summary.
///
/// # Arguments
/// * `config` - Input path, delimiter, batch size and trace toggle.
/// * `store` - Destination of the accepted sightings.
/// * `on_flush` - Called with each batch outcome, before the next row is read.
///
/// # Returns
/// The run summary, or `ImportError` when the CSV cannot be opened.
pub fn import_csv<S, F>(config: &ImportConfig, store: S, on_flush: F) -> Result<RunSummary, ImportError>
where
    S: SightingStore,
    F: FnMut(&FlushReport),
{
    let rows = CsvRows::open(&config.csv_path, config.csv_separator)?;
    info!(
        "Reading {} ({} columns, batch size {})",
        config.csv_path.display(),
        rows.headers().len(),
        config.batch_size
    );

    let processor = RowProcessor::new(DocumentBuilder::new(
        &SYNONYMS,
        Coercer::new(config.debug_import),
    ));
    let mut writer = BatchWriter::new(store, config.batch_size);
    let mut summary = RunSummary::default();

    drive(rows, &processor, &mut writer, &mut summary, on_flush);
    log_summary(&summary);
    Ok(summary)
}

/// Logs the end-of-run totals and any warning counters.
pub fn log_summary(summary: &RunSummary) {
    info!(
        "CSV fully read. Rows: {}. Inserted: {}. Skipped: {}.",
        summary.total_rows, summary.inserted, summary.skipped
    );
    if summary.missing_geolocation > 0 {
        warn!(
            "{} row(s) without a valid latitude/longitude",
            summary.missing_geolocation
        );
    }
    if summary.missing_event_date > 0 {
        warn!(
            "{} row(s) with a missing or invalid event date",
            summary.missing_event_date
        );
    }
    if summary.skipped_invalid > 0 {
        warn!(
            "Skipped for not meeting the required schema: {}",
            summary.skipped_invalid
        );
    }
    if summary.failed_batches > 0 || summary.write_errors > 0 {
        warn!(
            "{} batch(es) failed, {} document(s) rejected by the store",
            summary.failed_batches, summary.write_errors
        );
    }
    if let Some(err) = &summary.final_flush_error {
        error!("Final batch insert failed: {}", err);
    }
}
