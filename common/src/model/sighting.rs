use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The canonical document persisted for every accepted CSV row.
///
/// Every leaf is optional: a value is either absent or has already passed type
/// coercion. Absent leaves are omitted when the document is serialized, so the
/// store never sees an empty string or a `NaN` standing in for "missing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sighting {
    pub taxonomy: Taxonomy,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Taxonomy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kingdom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phylum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
}

impl Taxonomy {
    /// The seven ranks in kingdom-to-species order.
    pub fn ranks(&self) -> [Option<&str>; 7] {
        [
            self.kingdom.as_deref(),
            self.phylum.as_deref(),
            self.class.as_deref(),
            self.order.as_deref(),
            self.family.as_deref(),
            self.genus.as_deref(),
            self.species.as_deref(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub geolocation: Geolocation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geolocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Geolocation {
    /// True when neither coordinate survived coercion.
    pub fn is_unusable(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none()
    }
}
