use serde::Serialize;
use serde_json::{Map, Value};

/// Single-level field → value mapping, in extraction order.
pub type FlatRecord = Map<String, Value>;

/// Grouped output of the embedded-data pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PropertyRecord {
    /// Passed through verbatim from `utag_data.ad.characteristics`.
    pub characteristics: Map<String, Value>,
    pub ad_info: AdInfo,
    pub details: Details,
    pub source_url: Option<String>,
}

impl PropertyRecord {
    /// The record as a JSON object keyed by group name.
    pub fn to_grouped(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Ad identity fields. Keys the source did not supply stay absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typology: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(rename = "builtType", skip_serializing_if = "Option::is_none")]
    pub built_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Details {
    pub basic_features: Vec<String>,
    pub equipment: Vec<String>,
    pub energy_certificate: EnergyCertificate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnergyCertificate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumption_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissions_rating: Option<String>,
}

/// Presence flag. Absence of evidence reads as `No`; only a matching
/// feature item turns it to `Yes`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Flag {
    #[default]
    No,
    Yes,
}

/// Flat output of the section-list pipeline. Field order is column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropertyFeatures {
    pub source_url: Option<String>,
    pub property_type: Option<String>,
    pub floors: Option<String>,
    pub size_built_sqm: Option<String>,
    pub size_useful_sqm: Option<String>,
    pub rooms: Option<String>,
    pub bathrooms: Option<String>,
    pub plot_size_sqm: Option<String>,
    pub terrace: Flag,
    pub balcony: Flag,
    pub parking: Flag,
    pub condition: Option<String>,
    pub built_in_wardrobes: Flag,
    pub storage_room: Flag,
    pub orientation: Option<String>,
    pub built_year: Option<String>,
    pub heating_type: Option<String>,
    pub garden: Flag,
    pub swimming_pool: Flag,
    pub energy_consumption_rating: Option<String>,
    pub energy_emissions_rating: Option<String>,
    pub price: Option<String>,
    pub location: Option<String>,
    pub ad_update_date: Option<String>,
    pub advertiser_name: Option<String>,
}

impl PropertyFeatures {
    pub fn new(source_url: Option<String>) -> Self {
        Self {
            source_url,
            ..Default::default()
        }
    }

    pub fn to_flat(&self) -> FlatRecord {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => FlatRecord::new(),
        }
    }
}
