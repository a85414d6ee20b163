//! The sightings import pipeline.
//!
//! Each CSV row flows strictly forward through four stages:
//! - `normalizer`: canonical header keys and synonym resolution.
//! - `coercer`: locale-tolerant numbers and calendar dates.
//! - `builder`: assembles the `Sighting` document and classifies it as
//!   valid, empty-equivalent or schema-invalid.
//! - `writer`: buffers valid documents and writes them in unordered batches.
//!
//! `pipeline` drives the stages over a CSV stream and `start` runs a whole
//! import as a tracked background job.

pub mod builder;
pub mod coercer;
pub mod normalizer;
pub mod pipeline;
pub mod start;
pub mod writer;
