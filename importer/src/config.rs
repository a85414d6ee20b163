//! Run-time configuration for the importer.
//!
//! Every option can be given as a command-line flag or through the matching
//! environment variable, and all of them have defaults, so a bare `importer`
//! invocation reads `csv/Avistamientos.csv` into `biogeovis.sqlite`.

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Parser, Debug, Clone)]
#[command(name = "importer")]
#[command(about = "Imports biodiversity sightings from CSV into the sightings store")]
#[command(version)]
pub struct ImportConfig {
    /// CSV file to import
    #[arg(long, env = "CSV_PATH", default_value = "csv/Avistamientos.csv")]
    pub csv_path: PathBuf,

    /// Field delimiter; a single ASCII character, or `\t` / `tab`
    #[arg(long, env = "CSV_SEPARATOR", default_value = ",", value_parser = parse_delimiter)]
    pub csv_separator: u8,

    /// Number of valid documents buffered before a batch write
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    pub batch_size: usize,

    /// Log every numeric and date coercion
    #[arg(long, env = "DEBUG_IMPORT", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub debug_import: bool,

    /// SQLite database holding the sightings collection
    #[arg(long, env = "SIGHTINGS_DB", default_value = "biogeovis.sqlite")]
    pub store_path: PathBuf,

    /// Upper bound for establishing the store connection, in milliseconds
    #[arg(long, env = "STORE_CONNECT_TIMEOUT_MS", default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    /// Delete existing sightings before importing
    #[arg(long, env = "TRUNCATE_BEFORE_IMPORT", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub truncate: bool,
}

impl ImportConfig {
    /// Configuration for a CSV at `csv_path`, everything else at its default.
    pub fn for_csv(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            csv_separator: b',',
            batch_size: DEFAULT_BATCH_SIZE,
            debug_import: false,
            store_path: PathBuf::from("biogeovis.sqlite"),
            connect_timeout_ms: 10_000,
            truncate: false,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c as u8),
                _ => Err(format!(
                    "delimiter must be a single ASCII character, got {:?}",
                    value
                )),
            }
        }
    }
}

fn parse_batch_size(value: &str) -> Result<usize, String> {
    let size: usize = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid batch size {:?}: {}", value, e))?;
    if size == 0 {
        return Err("batch size must be at least 1".to_string());
    }
    Ok(size)
}
