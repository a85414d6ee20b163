//! Assembly of [`Sighting`] documents and their classification against the
//! store's required-field contract.

use super::coercer::{assemble_date, Coercer};
use super::normalizer::{fields, NormalizedRow, SynonymTable};
use common::model::sighting::{Geolocation, Location, Sighting, Taxonomy};

/// Where a built document goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ready for the store.
    Valid,
    /// No usable value in any field; dropped silently.
    EmptyEquivalent,
    /// Some signal, but a required field is missing; dropped and counted.
    SchemaInvalid,
}

/// Builds documents from normalized rows.
#[derive(Debug, Clone, Copy)]
pub struct DocumentBuilder<'t> {
    synonyms: &'t SynonymTable,
    coercer: Coercer,
}

impl<'t> DocumentBuilder<'t> {
    pub fn new(synonyms: &'t SynonymTable, coercer: Coercer) -> Self {
        Self { synonyms, coercer }
    }

    pub fn build(&self, row: &NormalizedRow) -> Sighting {
        let text = |field: &str| {
            self.synonyms
                .resolve(row, field)
                .map(|value| value.as_text().into_owned())
        };

        let event_date = match text(fields::EVENT_DATE) {
            Some(raw) => self.coercer.date(Some(&raw)),
            None => {
                let assembled = assemble_date(
                    text(fields::YEAR).as_deref(),
                    text(fields::MONTH).as_deref(),
                    text(fields::DAY).as_deref(),
                );
                self.coercer.date(assembled.as_deref())
            }
        };

        Sighting {
            taxonomy: Taxonomy {
                kingdom: text(fields::KINGDOM),
                phylum: text(fields::PHYLUM),
                class: text(fields::CLASS),
                order: text(fields::ORDER),
                family: text(fields::FAMILY),
                genus: text(fields::GENUS),
                species: text(fields::SPECIES),
            },
            location: Location {
                country: text(fields::COUNTRY),
                geolocation: Geolocation {
                    latitude: self
                        .coercer
                        .number(self.synonyms.resolve(row, fields::LATITUDE)),
                    longitude: self
                        .coercer
                        .number(self.synonyms.resolve(row, fields::LONGITUDE)),
                },
            },
            event_date,
            scientific_name: text(fields::SCIENTIFIC_NAME),
        }
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.is_empty())
}

fn is_finite(value: Option<f64>) -> bool {
    value.is_some_and(f64::is_finite)
}

/// True when every leaf of `doc` is absent.
pub fn is_empty_equivalent(doc: &Sighting) -> bool {
    let geo = &doc.location.geolocation;
    !(doc.taxonomy.ranks().into_iter().any(has_text)
        || has_text(doc.location.country.as_deref())
        || is_finite(geo.latitude)
        || is_finite(geo.longitude)
        || doc.event_date.is_some()
        || has_text(doc.scientific_name.as_deref()))
}

/// True when `doc` satisfies every required field of the sightings collection.
pub fn is_valid(doc: &Sighting) -> bool {
    let geo = &doc.location.geolocation;
    doc.taxonomy.ranks().into_iter().all(has_text)
        && has_text(doc.location.country.as_deref())
        && is_finite(geo.latitude)
        && is_finite(geo.longitude)
        && doc.event_date.is_some()
        && has_text(doc.scientific_name.as_deref())
}

/// Empty-equivalence is checked first, so an all-absent document is never
/// reported as schema-invalid.
pub fn classify(doc: &Sighting) -> Outcome {
    if is_empty_equivalent(doc) {
        Outcome::EmptyEquivalent
    } else if is_valid(doc) {
        Outcome::Valid
    } else {
        Outcome::SchemaInvalid
    }
}
