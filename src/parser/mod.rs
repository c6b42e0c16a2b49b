pub mod canonical;
pub mod details;
pub mod embedded;
pub mod energy;
pub mod flatten;
pub mod normalize;
pub mod sections;
pub mod types;

use serde::Deserialize;

pub use types::FlatRecord;

/// Which pipeline turns a page into a flat record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// `utag_data` analytics blob + details lists, flattened
    Embedded,
    /// Visible section lists classified by feature rules
    Sections,
}

impl Method {
    /// Label stored in the `extraction_method` column.
    pub fn label(self) -> &'static str {
        match self {
            Method::Embedded => "Full Property Info (CSS Selector)",
            Method::Sections => "Detailed Property Features",
        }
    }
}

/// HTML → flat record through the selected pipeline.
pub fn process_document(html: &str, method: Method, page_url: Option<&str>) -> FlatRecord {
    match method {
        Method::Embedded => embedded::extract(html, page_url).flatten(),
        Method::Sections => sections::extract(html, page_url).to_flat(),
    }
}
