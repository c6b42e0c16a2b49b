use scraper::ElementRef;

/// Unit marker for surface areas on the listing pages.
pub const SQM: &str = "m²";

/// Spanish number format to plain decimal: drop `.` thousands separators,
/// then turn the `,` decimal separator into `.`.
pub fn normalize_number(raw: &str) -> String {
    raw.replace('.', "").replace(',', ".")
}

/// Text before the first ` m²`, e.g. `"1.240 m² construidos"` → `"1.240"`.
pub fn before_unit(text: &str) -> &str {
    text.split(" m²").next().unwrap_or(text)
}

/// `n`th single-space separated token.
pub fn token(text: &str, n: usize) -> Option<&str> {
    text.split(' ').nth(n)
}

pub fn first_token(text: &str) -> &str {
    text.split(' ').next().unwrap_or(text)
}

pub fn last_token(text: &str) -> &str {
    text.split(' ').last().unwrap_or(text)
}

/// All descendant text of an element, trimmed.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Only the element's own text nodes (children elements skipped), each
/// trimmed and joined with a single space.
pub fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| t.trim().to_string()))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
