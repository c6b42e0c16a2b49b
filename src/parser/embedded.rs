use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::canonical;
use super::details;
use super::energy::EnergyKind;
use super::types::{AdInfo, Details, PropertyRecord};

static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

const UTAG_MARKER: &str = "var utag_data";
const UTAG_ASSIGNMENT: &str = "var utag_data = ";

/// Build the grouped record from the page's `utag_data` analytics blob and
/// its details block. Never fails: anything missing stays empty.
pub fn extract(html: &str, page_url: Option<&str>) -> PropertyRecord {
    let document = Html::parse_document(html);

    let mut record = PropertyRecord {
        source_url: canonical::resolve_source_url(&document, page_url),
        ..Default::default()
    };

    match find_utag_script(&document) {
        Some(script) => {
            if let Some(ad) = parse_utag_data(&script)
                .as_ref()
                .and_then(|data| data.get("ad"))
                .and_then(Value::as_object)
            {
                apply_ad(&mut record, ad);
            }
        }
        None => debug!("No utag_data script on page"),
    }

    if let Some(section) = details::locate(&document) {
        record.details = collect_details(&section);
    }

    record
}

/// First script whose text mentions `var utag_data`; when that finds
/// nothing, fall back to a walk over the raw text nodes under `<script>`.
fn find_utag_script(document: &Html) -> Option<String> {
    document
        .select(&SCRIPT_SEL)
        .map(|script| script.text().collect::<String>())
        .find(|text| text.contains(UTAG_MARKER))
        .or_else(|| scan_script_text(document))
}

fn scan_script_text(document: &Html) -> Option<String> {
    document.root_element().descendants().find_map(|node| {
        let text: &str = node.value().as_text()?;
        let in_script = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|el| el.name() == "script"))
            .unwrap_or(false);
        (in_script && text.contains("utag_data")).then(|| text.to_string())
    })
}

/// JSON between `var utag_data = ` and the next `;`.
fn parse_utag_data(script: &str) -> Option<Value> {
    let start = script.find(UTAG_ASSIGNMENT)? + UTAG_ASSIGNMENT.len();
    let end = start + script[start..].find(';')?;

    match serde_json::from_str(&script[start..end]) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!(error = %e, "Failed to decode utag_data JSON");
            None
        }
    }
}

fn apply_ad(record: &mut PropertyRecord, ad: &Map<String, Value>) {
    if let Some(characteristics) = mapping(ad, "characteristics") {
        record.characteristics = characteristics;
    }

    record.ad_info = AdInfo {
        id: scalar(ad, "id"),
        operation: scalar(ad, "operation"),
        typology: scalar(ad, "typology"),
        price: scalar(ad, "price"),
        built_type: scalar(ad, "builtType"),
        location: ad
            .get("address")
            .and_then(Value::as_object)
            .and_then(derive_location),
        condition: mapping(ad, "condition"),
        media: mapping(ad, "media"),
        owner: mapping(ad, "owner"),
        agency: mapping(ad, "agency"),
    };
}

fn scalar(ad: &Map<String, Value>, key: &str) -> Option<Value> {
    ad.get(key).filter(|v| !v.is_null()).cloned()
}

fn mapping(ad: &Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    ad.get(key).and_then(Value::as_object).cloned()
}

/// `"<municipality>, <province>"` from the trailing segments of the ids.
/// Only municipality-level addresses (`locationLevel == "6"`) carry one.
fn derive_location(address: &Map<String, Value>) -> Option<String> {
    if address.get("locationLevel").and_then(Value::as_str) != Some("6") {
        return None;
    }

    let parts: Vec<&str> = ["municipalityId", "provinceId"]
        .iter()
        .filter_map(|key| address.get(*key).and_then(Value::as_str))
        .filter(|id| !id.is_empty())
        .filter_map(|id| id.rsplit('-').next())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn collect_details(section: &details::DetailsSection<'_>) -> Details {
    let mut details = Details {
        basic_features: section.basic_feature_items(),
        equipment: section.equipment_items(),
        ..Default::default()
    };

    for (kind, rating) in section.energy_ratings() {
        match kind {
            EnergyKind::Consumption => details.energy_certificate.consumption_rating = rating,
            EnergyKind::Emissions => details.energy_certificate.emissions_rating = rating,
        }
    }

    details
}
