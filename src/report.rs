use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::parser::normalize::normalize_number;
use crate::parser::FlatRecord;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d.,]*").unwrap());

/// `ad_info_location` when any record carries it, otherwise `location`.
pub fn location_column(records: &[FlatRecord]) -> &'static str {
    if records.iter().any(|r| r.contains_key("ad_info_location")) {
        "ad_info_location"
    } else {
        "location"
    }
}

/// Records matching the method label and the exact location, when given.
pub fn filter_records<'a>(
    records: &'a [FlatRecord],
    method: Option<&str>,
    location: Option<&str>,
) -> Vec<&'a FlatRecord> {
    let location_col = location_column(records);
    records
        .iter()
        .filter(|r| method.map_or(true, |m| r.get("extraction_method").and_then(Value::as_str) == Some(m)))
        .filter(|r| location.map_or(true, |l| r.get(location_col).and_then(Value::as_str) == Some(l)))
        .collect()
}

/// Union of record keys in first-seen order.
pub fn columns<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a FlatRecord>,
{
    let mut seen = std::collections::HashSet::new();
    let mut columns = Vec::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Text of a field for tables and CSV cells. Missing and null are empty.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numeric reading of a price-like value: `"485.000 €"` is 485000.
pub fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let run = NUMBER_RE.find(s)?.as_str();
            normalize_number(run).trim_end_matches('.').parse().ok()
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary for every column whose name contains "price". Columns with no
/// parseable value are left out.
pub fn price_stats(records: &[FlatRecord]) -> Vec<PriceStats> {
    columns(records)
        .into_iter()
        .filter(|c| c.to_lowercase().contains("price"))
        .filter_map(|column| {
            let mut values: Vec<f64> = records
                .iter()
                .filter_map(|r| r.get(&column))
                .filter_map(parse_price)
                .collect();
            summarize(column, &mut values)
        })
        .collect()
}

fn summarize(column: String, values: &mut [f64]) -> Option<PriceStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let median = if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    };
    Some(PriceStats {
        column,
        count: n,
        mean: values.iter().sum::<f64>() / n as f64,
        median,
        min: values[0],
        max: values[n - 1],
    })
}
