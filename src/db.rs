use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};
use serde_json::Value;
use tracing::warn;

use crate::parser::FlatRecord;

/// Columns copied out of the record for querying. `(column, record key,
/// fallback key used by embedded-pipeline records)`.
const PROMOTED: &[(&str, &str, Option<&str>)] = &[
    ("source_url", "source_url", None),
    ("price", "price", Some("ad_info_price")),
    ("location", "location", Some("ad_info_location")),
    ("property_type", "property_type", Some("ad_info_typology")),
    ("rooms", "rooms", None),
    ("bathrooms", "bathrooms", None),
    ("size_built_sqm", "size_built_sqm", None),
    ("size_useful_sqm", "size_useful_sqm", None),
];

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS properties (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            filename          TEXT,
            processed_date    TEXT,
            extraction_method TEXT,
            data_json         TEXT,
            source_url        TEXT,
            price             TEXT,
            location          TEXT,
            property_type     TEXT,
            rooms             TEXT,
            bathrooms         TEXT,
            size_built_sqm    TEXT,
            size_useful_sqm   TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_properties_method ON properties(extraction_method);
        CREATE INDEX IF NOT EXISTS idx_properties_location ON properties(location);
        ",
    )?;
    Ok(())
}

/// Store one flat record (metadata already attached). Returns the row id.
pub fn insert_property(conn: &Connection, record: &FlatRecord) -> Result<i64> {
    let data_json = serde_json::to_string(record)?;
    let field = |key: &str, fallback: Option<&str>| {
        let value = record
            .get(key)
            .or_else(|| fallback.and_then(|f| record.get(f)));
        match value {
            Some(v) => column_text(v),
            None => Some(String::new()),
        }
    };
    let promoted: Vec<Option<String>> = PROMOTED
        .iter()
        .map(|(_, key, fallback)| field(key, *fallback))
        .collect();

    conn.execute(
        "INSERT INTO properties (
            filename, processed_date, extraction_method, data_json,
            source_url, price, location, property_type, rooms,
            bathrooms, size_built_sqm, size_useful_sqm
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            field("filename", None),
            field("processed_date", None),
            field("extraction_method", None),
            data_json,
            promoted[0],
            promoted[1],
            promoted[2],
            promoted[3],
            promoted[4],
            promoted[5],
            promoted[6],
            promoted[7],
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Text form of a JSON scalar for a TEXT column; null stays NULL.
fn column_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

struct StoredRow {
    id: i64,
    filename: Option<String>,
    processed_date: Option<String>,
    extraction_method: Option<String>,
    data_json: Option<String>,
    promoted: Vec<Option<String>>,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let promoted = (0..PROMOTED.len())
            .map(|i| row.get(5 + i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            processed_date: row.get(2)?,
            extraction_method: row.get(3)?,
            data_json: row.get(4)?,
            promoted,
        })
    }

    /// Metadata columns first, then the stored blob merged over them, then
    /// any promoted column the blob does not carry (`price` for an embedded
    /// record that only has `ad_info_price`). A blob that no longer parses
    /// leaves just the metadata and promoted columns.
    fn into_record(self) -> FlatRecord {
        let mut record = FlatRecord::new();
        record.insert("id".into(), Value::from(self.id));
        record.insert("filename".into(), text_value(self.filename));
        record.insert("processed_date".into(), text_value(self.processed_date));
        record.insert("extraction_method".into(), text_value(self.extraction_method));

        let blob = self
            .data_json
            .as_deref()
            .map(serde_json::from_str::<Value>);
        match blob {
            Some(Ok(Value::Object(data))) => record.extend(data),
            _ => warn!(id = self.id, "Unreadable data_json, using promoted columns"),
        }
        for ((column, _, _), value) in PROMOTED.iter().zip(self.promoted) {
            if !record.contains_key(*column) {
                record.insert(column.to_string(), text_value(value));
            }
        }
        record
    }
}

fn text_value(text: Option<String>) -> Value {
    text.map(Value::String).unwrap_or(Value::Null)
}

const SELECT_ALL: &str = "SELECT id, filename, processed_date, extraction_method, data_json,
        source_url, price, location, property_type, rooms, bathrooms,
        size_built_sqm, size_useful_sqm
     FROM properties";

/// Every stored record, reconstituted, oldest first.
pub fn fetch_all(conn: &Connection) -> Result<Vec<FlatRecord>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_ALL))?;
    let rows = stmt
        .query_map([], StoredRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(StoredRow::into_record).collect())
}

pub struct Stats {
    pub total: i64,
    pub by_method: Vec<(String, i64)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total = conn.query_row("SELECT COUNT(*) FROM properties", [], |r| r.get(0))?;
    let mut stmt = conn.prepare(
        "SELECT COALESCE(extraction_method, ''), COUNT(*)
         FROM properties GROUP BY extraction_method ORDER BY COUNT(*) DESC",
    )?;
    let by_method = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stats { total, by_method })
}

// ── Tests ──
