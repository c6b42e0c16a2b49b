use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use super::canonical;
use super::details;
use super::energy::EnergyKind;
use super::normalize::{
    before_unit, first_token, last_token, normalize_number, own_text, text_of, token, SQM,
};
use super::types::{Flag, PropertyFeatures};

static PRICE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.info-data-price").unwrap());
static LOCATION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.main-info__title-minor").unwrap());
static DATE_BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section.details-box.date-update-block").unwrap());
static DATE_TEXT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.date-update-text").unwrap());
static ADVERTISER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.advertiser-name-container").unwrap());
static ADVERTISER_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.about-advertiser-name").unwrap());
static PARTICULAR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.particular").unwrap());
static INFO_FEATURES_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.info-features").unwrap());
static SPAN_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());

const DETACHED_HOUSE: &str = "Casa o chalet independiente";
const NO_HEATING: &str = "No dispone de calefacción";
const INDIVIDUAL_HEATING: &str = "Calefacción individual";

/// A basic-feature classification rule: if `matches` accepts the item text,
/// `apply` writes the field and no later rule sees that item.
struct FeatureRule {
    name: &'static str,
    matches: fn(&str) -> bool,
    apply: fn(&mut PropertyFeatures, &str),
}

/// Evaluated top to bottom. Several predicates overlap ("planta"/"plantas",
/// "baño"/"baños"), so the order is part of the behaviour.
const BASIC_FEATURE_RULES: &[FeatureRule] = &[
    FeatureRule {
        name: "property_type",
        matches: |t| t.contains(DETACHED_HOUSE),
        apply: |f, _| f.property_type = Some(DETACHED_HOUSE.to_string()),
    },
    FeatureRule {
        name: "floor",
        matches: |t| t.contains("planta") && !t.contains("plantas"),
        apply: |f, t| f.floors = Some(first_token(t).to_string()),
    },
    FeatureRule {
        name: "floors",
        matches: |t| t.contains("plantas"),
        apply: |f, t| f.floors = Some(first_token(t).to_string()),
    },
    FeatureRule {
        name: "sizes",
        matches: |t| t.contains("m² construidos") && t.contains("m² útiles"),
        apply: apply_sizes,
    },
    FeatureRule {
        name: "rooms",
        matches: |t| t.contains("habitaciones"),
        apply: |f, t| f.rooms = Some(first_token(t).to_string()),
    },
    FeatureRule {
        name: "bathroom",
        matches: |t| t.contains("baño") && !t.contains("baños"),
        apply: |f, t| f.bathrooms = Some(first_token(t).to_string()),
    },
    FeatureRule {
        name: "bathrooms",
        matches: |t| t.contains("baños"),
        apply: |f, t| f.bathrooms = Some(first_token(t).to_string()),
    },
    FeatureRule {
        name: "plot",
        matches: |t| t.contains("Parcela de") && t.contains(SQM),
        apply: |f, t| {
            if let Some(size) = token(t, 2) {
                f.plot_size_sqm = Some(normalize_number(&size.replace(SQM, "")));
            }
        },
    },
    FeatureRule {
        name: "terrace",
        matches: |t| t.contains("Terraza"),
        apply: |f, _| f.terrace = Flag::Yes,
    },
    FeatureRule {
        name: "balcony",
        matches: |t| t.contains("balcón") || t.contains("Balcón"),
        apply: |f, _| f.balcony = Flag::Yes,
    },
    FeatureRule {
        name: "parking",
        matches: |t| t.contains("garaje"),
        apply: |f, _| f.parking = Flag::Yes,
    },
    FeatureRule {
        name: "condition",
        matches: |t| t.contains("Segunda mano"),
        apply: |f, t| {
            f.condition = Some(t.replace("Segunda mano/", "").replace("/buen estado", ""))
        },
    },
    FeatureRule {
        name: "built_in_wardrobes",
        matches: |t| t.contains("Armarios empotrados"),
        apply: |f, _| f.built_in_wardrobes = Flag::Yes,
    },
    FeatureRule {
        name: "storage_room",
        matches: |t| t.contains("Trastero"),
        apply: |f, _| f.storage_room = Flag::Yes,
    },
    FeatureRule {
        name: "orientation",
        matches: |t| t.contains("Orientación"),
        apply: |f, t| f.orientation = Some(t.replace("Orientación ", "")),
    },
    FeatureRule {
        name: "built_year",
        matches: |t| t.contains("Construido en"),
        apply: |f, t| f.built_year = Some(last_token(t).to_string()),
    },
    FeatureRule {
        name: "no_heating",
        matches: |t| t.contains(NO_HEATING),
        apply: |f, _| f.heating_type = Some(NO_HEATING.to_string()),
    },
    FeatureRule {
        name: "individual_heating",
        matches: |t| t.contains(INDIVIDUAL_HEATING),
        apply: |f, _| f.heating_type = Some(INDIVIDUAL_HEATING.to_string()),
    },
];

/// `"1.240 m² construidos, 1.100 m² útiles"` → built and useful sizes.
fn apply_sizes(features: &mut PropertyFeatures, text: &str) {
    for part in text.split(',') {
        let value = normalize_number(before_unit(part).trim());
        if part.contains("m² útiles") {
            features.size_useful_sqm = Some(value);
        } else if part.contains("m² construidos") {
            features.size_built_sqm = Some(value);
        }
    }
}

/// Run the rule list over one item. Returns the name of the rule that fired.
fn classify_basic_feature(features: &mut PropertyFeatures, text: &str) -> Option<&'static str> {
    let rule = BASIC_FEATURE_RULES.iter().find(|rule| (rule.matches)(text))?;
    (rule.apply)(features, text);
    Some(rule.name)
}

fn classify_equipment(features: &mut PropertyFeatures, text: &str) {
    if text.contains("Jardín") {
        features.garden = Flag::Yes;
    } else if text.contains("Piscina") {
        features.swimming_pool = Flag::Yes;
    }
}

/// Build the flat feature record from the page's visible sections. Flags
/// start at `No`; text fields start absent.
pub fn extract(html: &str, page_url: Option<&str>) -> PropertyFeatures {
    let document = Html::parse_document(html);
    let mut features = PropertyFeatures::new(canonical::resolve_source_url(&document, page_url));

    features.price = document.select(&PRICE_SEL).next().map(text_of);
    features.location = document.select(&LOCATION_SEL).next().map(text_of);
    features.ad_update_date = document
        .select(&DATE_BLOCK_SEL)
        .next()
        .and_then(|block| block.select(&DATE_TEXT_SEL).next())
        .map(text_of);
    features.advertiser_name = advertiser_name(&document);

    if let Some(size) = headline_size(&document) {
        features.size_built_sqm = Some(size);
    }

    let Some(section) = details::locate(&document) else {
        debug!("No details-property block, returning defaults");
        return features;
    };

    for text in section.basic_feature_items() {
        match classify_basic_feature(&mut features, &text) {
            Some(rule) => debug!(rule, item = %text, "Matched feature"),
            None => debug!(item = %text, "Unmatched feature"),
        }
    }

    for text in section.equipment_items() {
        classify_equipment(&mut features, &text);
    }

    for (kind, rating) in section.energy_ratings() {
        match kind {
            EnergyKind::Consumption => features.energy_consumption_rating = rating,
            EnergyKind::Emissions => features.energy_emissions_rating = rating,
        }
    }

    features
}

/// Agency name, or for private sellers the `particular` marker's own text.
/// A present agency container without a name link yields nothing.
fn advertiser_name(document: &Html) -> Option<String> {
    if let Some(container) = document.select(&ADVERTISER_SEL).next() {
        return container.select(&ADVERTISER_LINK_SEL).next().map(text_of);
    }

    let particular = document.select(&PARTICULAR_SEL).next()?;
    let name = own_text(particular);
    if name.is_empty() {
        None
    } else {
        Some(format!("PARTICULAR: {}", name))
    }
}

/// Built size from the headline features strip (`<span>240 m²</span>`).
fn headline_size(document: &Html) -> Option<String> {
    let strip = document.select(&INFO_FEATURES_SEL).next()?;
    let text = text_of(strip.select(&SPAN_SEL).next()?);
    text.contains(SQM)
        .then(|| normalize_number(before_unit(&text)))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn classify(items: &[&str]) -> PropertyFeatures {
        let mut f = PropertyFeatures::default();
        for item in items {
            classify_basic_feature(&mut f, item);
        }
        f
    }

    #[test]
    fn agency_listing() {
        let f = extract(&fixture("listing_agency"), None);
        assert_eq!(
            f.source_url.as_deref(),
            Some("https://www.idealista.com/inmueble/98765432/")
        );
        assert_eq!(f.price.as_deref(), Some("485.000 €"));
        assert_eq!(f.location.as_deref(), Some("Villanueva de la Cañada, Madrid"));
        assert_eq!(f.ad_update_date.as_deref(), Some("Anuncio actualizado el 3 de marzo"));
        assert_eq!(f.advertiser_name.as_deref(), Some("Inmobiliaria Sierra Oeste"));
        assert_eq!(f.property_type.as_deref(), Some(DETACHED_HOUSE));
        assert_eq!(f.floors.as_deref(), Some("2"));
        assert_eq!(f.size_built_sqm.as_deref(), Some("1240"));
        assert_eq!(f.size_useful_sqm.as_deref(), Some("1100"));
        assert_eq!(f.rooms.as_deref(), Some("4"));
        assert_eq!(f.bathrooms.as_deref(), Some("3"));
        assert_eq!(f.plot_size_sqm.as_deref(), Some("1200"));
        assert_eq!(f.terrace, Flag::Yes);
        assert_eq!(f.balcony, Flag::No);
        assert_eq!(f.parking, Flag::Yes);
        assert_eq!(f.condition.as_deref(), Some("buen estado"));
        assert_eq!(f.built_in_wardrobes, Flag::Yes);
        assert_eq!(f.storage_room, Flag::Yes);
        assert_eq!(f.orientation.as_deref(), Some("sur, oeste"));
        assert_eq!(f.built_year.as_deref(), Some("1998"));
        assert_eq!(f.heating_type.as_deref(), Some(INDIVIDUAL_HEATING));
        assert_eq!(f.garden, Flag::Yes);
        assert_eq!(f.swimming_pool, Flag::Yes);
        assert_eq!(f.energy_consumption_rating.as_deref(), Some("E"));
        assert_eq!(f.energy_emissions_rating.as_deref(), Some("D"));
    }

    #[test]
    fn private_listing() {
        let f = extract(&fixture("listing_private"), Some("https://fallback.test/7"));
        assert_eq!(f.source_url.as_deref(), Some("https://fallback.test/7"));
        assert_eq!(f.price.as_deref(), Some("189.000 €"));
        assert_eq!(f.advertiser_name.as_deref(), Some("PARTICULAR: Particular Lucía"));
        assert_eq!(f.ad_update_date, None);
        assert_eq!(f.size_built_sqm.as_deref(), Some("85"));
        assert_eq!(f.size_useful_sqm.as_deref(), Some("70"));
        assert_eq!(f.rooms.as_deref(), Some("3"));
        assert_eq!(f.bathrooms.as_deref(), Some("1"));
        assert_eq!(f.balcony, Flag::Yes);
        assert_eq!(f.condition.as_deref(), Some("para reformar"));
        assert_eq!(f.orientation.as_deref(), Some("este"));
        assert_eq!(f.heating_type.as_deref(), Some(NO_HEATING));
        assert_eq!(f.floors, None);
        assert_eq!(f.terrace, Flag::No);
        assert_eq!(f.storage_room, Flag::No);
        assert_eq!(f.parking, Flag::No);
        assert_eq!(f.garden, Flag::No);
        assert_eq!(f.energy_consumption_rating, None);
    }

    #[test]
    fn missing_details_returns_defaults() {
        let f = extract(&fixture("listing_bare"), Some("https://fallback.test/"));
        assert_eq!(f, PropertyFeatures::new(Some("https://fallback.test/".into())));
    }

    #[test]
    fn headline_size_without_details() {
        let html = r#"<div class="info-features"><span>1.085,5 m²</span><span>3 hab.</span></div>"#;
        let f = extract(html, None);
        assert_eq!(f.size_built_sqm.as_deref(), Some("1085.5"));

        let html = r#"<div class="info-features"><span>3 hab.</span></div>"#;
        assert_eq!(extract(html, None).size_built_sqm, None);
    }

    #[test]
    fn worked_examples() {
        let f = classify(&["3 habitaciones", "120 m² construidos, 100 m² útiles", "Parcela de 500 m²"]);
        assert_eq!(f.rooms.as_deref(), Some("3"));
        assert_eq!(f.size_built_sqm.as_deref(), Some("120"));
        assert_eq!(f.size_useful_sqm.as_deref(), Some("100"));
        assert_eq!(f.plot_size_sqm.as_deref(), Some("500"));
    }

    #[test]
    fn flags_stay_no_without_evidence() {
        let f = classify(&["2 habitaciones", "1 baño", "Exterior"]);
        assert_eq!(f.terrace, Flag::No);
        assert_eq!(f.storage_room, Flag::No);
        assert_eq!(f.parking, Flag::No);
    }

    #[test]
    fn first_match_wins() {
        let mut f = PropertyFeatures::default();
        // Matches "floor" before "terrace" gets a chance.
        assert_eq!(classify_basic_feature(&mut f, "1 planta con Terraza"), Some("floor"));
        assert_eq!(f.floors.as_deref(), Some("1"));
        assert_eq!(f.terrace, Flag::No);

        assert_eq!(classify_basic_feature(&mut f, "2 baños"), Some("bathrooms"));
        assert_eq!(classify_basic_feature(&mut f, "Exterior"), None);
    }

    #[test]
    fn plot_without_size_token() {
        let f = classify(&["Parcela de m²"]);
        assert_eq!(f.plot_size_sqm.as_deref(), Some(""));
        let f = classify(&["Parcela dem²"]);
        assert_eq!(f.plot_size_sqm, None);
    }

    #[test]
    fn date_block_matches_on_both_classes() {
        let html = r#"<section class="date-update-block details-box flex">
                        <p class="date-update-text">Anuncio actualizado hace 2 días</p>
                      </section>"#;
        assert_eq!(
            extract(html, None).ad_update_date.as_deref(),
            Some("Anuncio actualizado hace 2 días")
        );

        let html = r#"<section class="date-update-block"><p class="date-update-text">x</p></section>"#;
        assert_eq!(extract(html, None).ad_update_date, None);
    }

    #[test]
    fn advertiser_container_without_link() {
        let html = r#"<div class="advertiser-name-container"></div><span class="particular">Juan</span>"#;
        assert_eq!(extract(html, None).advertiser_name, None);
    }

    #[test]
    fn empty_particular_is_ignored() {
        let html = r#"<span class="particular"><span>Ver teléfono</span></span>"#;
        assert_eq!(extract(html, None).advertiser_name, None);
    }

    #[test]
    fn equipment_first_match() {
        let mut f = PropertyFeatures::default();
        classify_equipment(&mut f, "Jardín y Piscina");
        assert_eq!(f.garden, Flag::Yes);
        assert_eq!(f.swimming_pool, Flag::No);
    }
}
