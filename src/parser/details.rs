use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::energy::{self, EnergyKind};
use super::normalize::text_of;

static DETAILS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.details-property").unwrap());
static FEATURE_ONE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.details-property-feature-one").unwrap());
static FEATURE_TWO_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.details-property-feature-two").unwrap());
static FEATURES_LIST_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.details-property_features").unwrap());
static LI_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static SPAN_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());

/// The `details-property` block of a listing page.
///
/// Holds the "Características básicas" list from the first feature column
/// and every feature list of the second column: equipment first, then the
/// energy certificate.
pub struct DetailsSection<'a> {
    basic_features: Option<ElementRef<'a>>,
    feature_lists: Vec<ElementRef<'a>>,
}

/// `None` when the page has no details container at all.
pub fn locate(document: &Html) -> Option<DetailsSection<'_>> {
    let root = document.select(&DETAILS_SEL).next()?;

    let basic_features = root
        .select(&FEATURE_ONE_SEL)
        .next()
        .and_then(|column| column.select(&FEATURES_LIST_SEL).next());

    let feature_lists = root
        .select(&FEATURE_TWO_SEL)
        .next()
        .map(|column| column.select(&FEATURES_LIST_SEL).collect())
        .unwrap_or_default();

    Some(DetailsSection {
        basic_features,
        feature_lists,
    })
}

impl DetailsSection<'_> {
    pub fn basic_feature_items(&self) -> Vec<String> {
        self.basic_features.map(item_texts).unwrap_or_default()
    }

    pub fn equipment_items(&self) -> Vec<String> {
        self.feature_lists
            .first()
            .copied()
            .map(item_texts)
            .unwrap_or_default()
    }

    /// One entry per recognised certificate item, in document order.
    pub fn energy_ratings(&self) -> Vec<(EnergyKind, Option<String>)> {
        self.feature_lists
            .get(1)
            .map(|list| list.select(&LI_SEL).filter_map(energy_entry).collect())
            .unwrap_or_default()
    }
}

fn item_texts(list: ElementRef<'_>) -> Vec<String> {
    list.select(&LI_SEL).map(text_of).collect()
}

/// `<li><span>Consumo:</span><span class="icon-energy-c-c"></span></li>`
fn energy_entry(item: ElementRef<'_>) -> Option<(EnergyKind, Option<String>)> {
    let spans: Vec<ElementRef<'_>> = item.select(&SPAN_SEL).collect();
    let [label, badge] = spans.as_slice() else {
        return None;
    };

    let rating = badge
        .value()
        .attr("class")
        .and_then(|classes| classes.split_whitespace().next())
        .and_then(energy::decode_rating);

    EnergyKind::from_label(&text_of(*label)).map(|kind| (kind, rating))
}
