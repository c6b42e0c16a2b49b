/// Which half of the energy certificate a list item describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyKind {
    Consumption,
    Emissions,
}

impl EnergyKind {
    /// Classify by the item's label text (`"Consumo: "`, `"Emisiones: "`).
    pub fn from_label(label: &str) -> Option<Self> {
        if label.contains("Consumo") {
            Some(Self::Consumption)
        } else if label.contains("Emisiones") {
            Some(Self::Emissions)
        } else {
            None
        }
    }
}

/// Decode the rating letter from a class token like `icon-energy-c-c`:
/// the third dash-separated segment, uppercased.
pub fn decode_rating(class_token: &str) -> Option<String> {
    class_token
        .split('-')
        .nth(2)
        .map(|segment| segment.to_uppercase())
}
