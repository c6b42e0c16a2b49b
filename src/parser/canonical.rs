use std::sync::LazyLock;

use scraper::{Html, Selector};

static CANONICAL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel~="canonical"]"#).unwrap());

/// `href` of the first `<link rel="canonical">`, if it has a non-empty one.
pub fn canonical_url(document: &Html) -> Option<String> {
    document
        .select(&CANONICAL_SEL)
        .next()
        .and_then(|link| link.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}

/// Canonical URL when present, otherwise the caller's fallback.
pub fn resolve_source_url(document: &Html, page_url: Option<&str>) -> Option<String> {
    canonical_url(document).or_else(|| page_url.map(str::to_string))
}
