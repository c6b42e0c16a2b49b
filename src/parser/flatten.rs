use serde_json::{Map, Value};

use super::types::{FlatRecord, PropertyRecord};

/// Flatten a grouped record into single-level keys:
///
/// - `{group}_{key}` for scalar members,
/// - `{group}_{key}_{index}` for list members,
/// - `{group}_{key}_{nested}` for one level of nested mapping,
/// - ungrouped top-level scalars keep their own key.
///
/// Anything nested deeper is carried as-is under the one-level key.
pub fn flatten(grouped: &Map<String, Value>) -> FlatRecord {
    let mut flat = FlatRecord::new();

    for (group, data) in grouped {
        match data {
            Value::Object(members) => {
                for (key, value) in members {
                    flatten_member(&mut flat, &format!("{}_{}", group, key), value);
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    flat.insert(format!("{}_{}", group, i), item.clone());
                }
            }
            scalar => {
                flat.insert(group.clone(), scalar.clone());
            }
        }
    }

    flat
}

fn flatten_member(flat: &mut FlatRecord, prefix: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flat.insert(format!("{}_{}", prefix, i), item.clone());
            }
        }
        Value::Object(nested) => {
            for (key, item) in nested {
                flat.insert(format!("{}_{}", prefix, key), item.clone());
            }
        }
        scalar => {
            flat.insert(prefix.to_string(), scalar.clone());
        }
    }
}

impl PropertyRecord {
    pub fn flatten(&self) -> FlatRecord {
        flatten(&self.to_grouped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::parser::embedded;

    fn grouped(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn key_construction() {
        let input = grouped(json!({
            "characteristics": {"roomNumber": "3", "hasLift": true},
            "ad_info": {"id": "42", "media": {"photoNumber": 12}},
            "details": {
                "basic_features": ["3 habitaciones", "1 baño"],
                "equipment": [],
                "energy_certificate": {"consumption_rating": "C"}
            },
            "source_url": "https://example.com/42"
        }));
        let flat = flatten(&input);
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "characteristics_roomNumber",
                "characteristics_hasLift",
                "ad_info_id",
                "ad_info_media_photoNumber",
                "details_basic_features_0",
                "details_basic_features_1",
                "details_energy_certificate_consumption_rating",
                "source_url",
            ]
        );
        assert_eq!(flat["characteristics_hasLift"], true);
        assert_eq!(flat["ad_info_media_photoNumber"], 12);
        assert_eq!(flat["details_basic_features_1"], "1 baño");
    }

    #[test]
    fn null_top_level_kept() {
        let flat = flatten(&grouped(json!({"source_url": null})));
        assert_eq!(flat.get("source_url"), Some(&Value::Null));
    }

    #[test]
    fn top_level_list() {
        let flat = flatten(&grouped(json!({"tags": ["a", "b"]})));
        assert_eq!(flat["tags_0"], "a");
        assert_eq!(flat["tags_1"], "b");
    }

    #[test]
    fn deeper_nesting_carried_as_is() {
        let flat = flatten(&grouped(json!({"ad_info": {"owner": {"contact": {"phone": "1"}}}})));
        assert_eq!(flat["ad_info_owner_contact"], json!({"phone": "1"}));
    }

    #[test]
    fn deterministic() {
        let html = std::fs::read_to_string("tests/fixtures/listing_agency.html").unwrap();
        let record = embedded::extract(&html, None);
        let a = serde_json::to_string(&record.flatten()).unwrap();
        let b = serde_json::to_string(&record.flatten()).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"ad_info_location\":\"171, 28\""));
        assert!(a.contains("\"details_energy_certificate_emissions_rating\":\"D\""));
    }
}
