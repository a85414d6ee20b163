//! Header canonicalization and synonym resolution.
//!
//! CSV exports of sightings come from many tools and many languages, so the
//! same column shows up as `País`, `pais`, `Country Code` or
//! `decimal_latitude`. Headers are reduced to a [`CanonicalKey`] and then looked
//! up through a [`SynonymTable`] that maps every logical field to the keys
//! that may carry it.

use std::borrow::Cow;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// A normalized header: no diacritics, lowercase, no whitespace, `_` or `-`.
pub type CanonicalKey = String;

/// A single cell as handed over by the row producer.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    /// True for empty text. Numbers always carry a value.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// One CSV line: header/cell pairs in column order.
pub type RawRow = Vec<(String, CellValue)>;

/// A row keyed by [`CanonicalKey`], text cells trimmed.
pub type NormalizedRow = HashMap<CanonicalKey, CellValue>;

/// Removes diacritics by decomposing to NFD and dropping combining marks.
pub fn strip_diacritics(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Reduces an arbitrary header to its [`CanonicalKey`].
///
/// Never fails: a header made only of separators yields an empty key.
pub fn normalize_key(key: &str) -> CanonicalKey {
    strip_diacritics(key)
        .to_lowercase()
        .chars()
        .filter(|c| !(c.is_whitespace() || *c == '_' || *c == '-' || *c == '\u{feff}'))
        .collect()
}

/// Canonicalizes every header of `raw` and trims text cells.
///
/// Headers that collide on the same key keep the value of the last column.
pub fn normalize(raw: RawRow) -> NormalizedRow {
    let mut normalized = NormalizedRow::with_capacity(raw.len());
    for (header, value) in raw {
        let value = match value {
            CellValue::Text(s) => CellValue::Text(s.trim().to_string()),
            other => other,
        };
        normalized.insert(normalize_key(&header), value);
    }
    normalized
}

/// Logical field names understood by the built-in [`SynonymTable`].
pub mod fields {
    pub const KINGDOM: &str = "kingdom";
    pub const PHYLUM: &str = "phylum";
    pub const CLASS: &str = "class";
    pub const ORDER: &str = "order";
    pub const FAMILY: &str = "family";
    pub const GENUS: &str = "genus";
    pub const SPECIES: &str = "species";
    pub const COUNTRY: &str = "country";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const EVENT_DATE: &str = "eventdate";
    pub const SCIENTIFIC_NAME: &str = "scientificname";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const DAY: &str = "day";
}

/// Maps each logical field to the canonical keys that may carry it, in
/// priority order.
#[derive(Debug)]
pub struct SynonymTable {
    entries: &'static [(&'static str, &'static [&'static str])],
}

/// Spanish and Darwin Core spellings seen in the sighting exports.
pub static SYNONYMS: SynonymTable = SynonymTable {
    entries: &[
        (fields::KINGDOM, &["reino", "kingdom"]),
        (fields::PHYLUM, &["filo", "phylum"]),
        (fields::CLASS, &["clase", "class"]),
        (fields::ORDER, &["orden", "order"]),
        (fields::FAMILY, &["familia", "family"]),
        (fields::GENUS, &["genero", "genus"]),
        (fields::SPECIES, &["especie", "species"]),
        (fields::COUNTRY, &["pais", "country", "countrycode"]),
        (
            fields::LATITUDE,
            &["latitud", "latitude", "decimallatitude", "lat", "y"],
        ),
        (
            fields::LONGITUDE,
            &["longitud", "longitude", "decimallongitude", "lon", "long", "x"],
        ),
        (
            fields::EVENT_DATE,
            &["fechaevento", "fecha", "eventdate", "date", "fecharegistro"],
        ),
        (
            fields::SCIENTIFIC_NAME,
            &["nombrecientifico", "scientificname", "nombre", "name"],
        ),
    ],
};

impl SynonymTable {
    /// Candidate keys for `field`; a field missing from the table is its own
    /// only candidate.
    pub fn candidates<'a>(&self, field: &'a str) -> Vec<&'a str> {
        match self.entries.iter().find(|(name, _)| *name == field) {
            Some((_, keys)) => keys.to_vec(),
            None => vec![field],
        }
    }

    /// First candidate of `field` that is present and non-empty in `row`.
    pub fn resolve<'r>(&self, row: &'r NormalizedRow, field: &str) -> Option<&'r CellValue> {
        self.candidates(field)
            .into_iter()
            .filter_map(|key| row.get(key))
            .find(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), CellValue::from(*v)))
            .collect()
    }

    #[test]
    fn keys_ignore_case_spacing_and_accents() {
        assert_eq!(normalize_key("Género"), "genero");
        assert_eq!(normalize_key("GENERO"), "genero");
        assert_eq!(normalize_key("País"), "pais");
        assert_eq!(normalize_key("Country Code"), "countrycode");
        assert_eq!(normalize_key("decimal_latitude"), "decimallatitude");
        assert_eq!(normalize_key("Fecha-Evento"), "fechaevento");
        assert_eq!(normalize_key("\u{feff}Reino"), "reino");
    }

    #[test]
    fn decomposed_and_precomposed_accents_match() {
        // "e" followed by U+0301 COMBINING ACUTE ACCENT
        assert_eq!(normalize_key("Ge\u{301}nero"), normalize_key("Género"));
    }

    #[test]
    fn malformed_headers_still_produce_a_key() {
        assert_eq!(normalize_key(" _-- "), "");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn text_cells_are_trimmed_and_numbers_pass_through() {
        let mut raw = row(&[("Especie", "  Ara macao ")]);
        raw.push(("Lat".to_string(), CellValue::Number(19.5)));

        let normalized = normalize(raw);
        assert_eq!(normalized["especie"], CellValue::from("Ara macao"));
        assert_eq!(normalized["lat"], CellValue::Number(19.5));
    }

    #[test]
    fn colliding_headers_keep_the_last_value() {
        let normalized = normalize(row(&[("País", "MX"), ("pais", "GT")]));
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized["pais"], CellValue::from("GT"));
    }

    #[test]
    fn header_spelling_does_not_change_resolution() {
        for header in ["Género", "genero", "GENERO", "ge nero", "Genus"] {
            let normalized = normalize(row(&[(header, "Ara")]));
            assert_eq!(
                SYNONYMS.resolve(&normalized, fields::GENUS),
                Some(&CellValue::from("Ara")),
                "header {:?}",
                header
            );
        }
    }

    #[test]
    fn resolution_skips_empty_candidates_in_order() {
        let normalized = normalize(row(&[
            ("Latitud", ""),
            ("decimalLatitude", "19.43"),
            ("lat", "20.00"),
        ]));
        assert_eq!(
            SYNONYMS.resolve(&normalized, fields::LATITUDE),
            Some(&CellValue::from("19.43"))
        );
    }

    #[test]
    fn unknown_fields_resolve_verbatim() {
        let normalized = normalize(row(&[("Year", "2024"), ("Reino", "")]));
        assert_eq!(SYNONYMS.candidates(fields::YEAR), vec!["year"]);
        assert_eq!(
            SYNONYMS.resolve(&normalized, fields::YEAR),
            Some(&CellValue::from("2024"))
        );
        assert_eq!(SYNONYMS.resolve(&normalized, fields::KINGDOM), None);
    }
}
