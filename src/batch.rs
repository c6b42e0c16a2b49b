use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;

use chrono::Local;
use rusqlite::Connection;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::db;
use crate::parser::{self, FlatRecord, Method};

/// Why one document in a batch was skipped.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{filename} is not valid UTF-8: {source}")]
    Decode {
        filename: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("failed to store {filename}: {source}")]
    Store {
        filename: String,
        #[source]
        source: anyhow::Error,
    },
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn read_document(path: &Path) -> Result<String, ProcessError> {
    let bytes = std::fs::read(path).map_err(|source| ProcessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|source| ProcessError::Decode {
        filename: file_name(path),
        source,
    })
}

/// Read, extract and stamp one file. Does not touch storage.
pub fn process_file(
    path: &Path,
    method: Method,
    page_url: Option<&str>,
) -> Result<FlatRecord, ProcessError> {
    let html = read_document(path)?;
    let mut record = parser::process_document(&html, method, page_url);
    attach_metadata(&mut record, &file_name(path), method);
    Ok(record)
}

/// Extract one file and insert it. Returns the new row id.
pub fn store_file(
    conn: &Connection,
    path: &Path,
    method: Method,
    page_url: Option<&str>,
) -> Result<i64, ProcessError> {
    let record = process_file(path, method, page_url)?;
    db::insert_property(conn, &record).map_err(|source| ProcessError::Store {
        filename: file_name(path),
        source,
    })
}

/// What a batch run left behind.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Row ids, in input order.
    pub stored: Vec<i64>,
    pub failed: Vec<(PathBuf, ProcessError)>,
}

/// Store each file in order. A failing file is logged, recorded and skipped;
/// the rest of the batch still runs. `on_file` sees every result as it lands.
pub fn process_batch<F>(
    conn: &Connection,
    files: &[PathBuf],
    method: Method,
    page_url: Option<&str>,
    mut on_file: F,
) -> BatchOutcome
where
    F: FnMut(&Path, &Result<i64, ProcessError>),
{
    let mut outcome = BatchOutcome::default();

    for path in files {
        let result = store_file(conn, path, method, page_url);
        on_file(path, &result);
        match result {
            Ok(id) => {
                info!(id, file = %path.display(), "Stored");
                outcome.stored.push(id);
            }
            Err(e) => {
                error!(file = %path.display(), error = %e, "Skipping file");
                outcome.failed.push((path.clone(), e));
            }
        }
    }

    info!(
        stored = outcome.stored.len(),
        failed = outcome.failed.len(),
        total = files.len(),
        "Batch finished"
    );
    outcome
}

pub fn attach_metadata(record: &mut FlatRecord, filename: &str, method: Method) {
    let processed = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    record.insert("filename".into(), Value::from(filename));
    record.insert("processed_date".into(), Value::from(processed));
    record.insert("extraction_method".into(), Value::from(method.label()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("propex_{}_{}", std::process::id(), name));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn process_fixture_attaches_metadata() {
        let path = Path::new("tests/fixtures/listing_private.html");
        let record = process_file(path, Method::Sections, None).unwrap();
        assert_eq!(record["filename"], "listing_private.html");
        assert_eq!(record["extraction_method"], "Detailed Property Features");
        assert!(record["processed_date"].as_str().unwrap().contains('T'));
        assert_eq!(record["rooms"], "3");
    }

    #[test]
    fn metadata_overrides_extracted_keys() {
        let mut record = FlatRecord::new();
        record.insert("filename".into(), Value::from("stale"));
        attach_metadata(&mut record, "fresh.html", Method::Embedded);
        assert_eq!(record["filename"], "fresh.html");
        assert_eq!(record["extraction_method"], "Full Property Info (CSS Selector)");
    }

    #[test]
    fn missing_file() {
        let err = process_file(Path::new("tests/fixtures/nope.html"), Method::Embedded, None)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Read { .. }));
    }

    #[test]
    fn non_utf8_file() {
        let path = temp_file("latin1.html", b"<html>Ba\xf1o</html>");
        let err = process_file(&path, Method::Sections, None).unwrap_err();
        std::fs::remove_file(&path).ok();
        match err {
            ProcessError::Decode { filename, .. } => assert!(filename.ends_with("latin1.html")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn store_then_fetch() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let path = Path::new("tests/fixtures/listing_agency.html");
        store_file(&conn, path, Method::Embedded, None).unwrap();
        store_file(&conn, path, Method::Sections, None).unwrap();

        let all = db::fetch_all(&conn).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["ad_info_location"], "171, 28");
        assert_eq!(all[1]["location"], "Villanueva de la Cañada, Madrid");
    }

    #[test]
    fn batch_continues_past_failures() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let bad_bytes = temp_file("batch_latin1.html", b"<p>Calefacci\xf3n</p>");
        let files = vec![
            PathBuf::from("tests/fixtures/listing_agency.html"),
            PathBuf::from("tests/fixtures/missing.html"),
            bad_bytes.clone(),
            PathBuf::from("tests/fixtures/listing_private.html"),
        ];

        let mut seen = Vec::new();
        let outcome = process_batch(&conn, &files, Method::Sections, None, |path, result| {
            seen.push((file_name(path), result.is_ok()));
        });
        std::fs::remove_file(&bad_bytes).ok();

        assert_eq!(outcome.stored.len(), 2);
        assert_eq!(outcome.failed.len(), 2);
        assert!(matches!(outcome.failed[0].1, ProcessError::Read { .. }));
        assert!(matches!(outcome.failed[1].1, ProcessError::Decode { .. }));
        assert_eq!(outcome.failed[1].0, bad_bytes);
        assert_eq!(
            seen.iter().map(|(_, ok)| *ok).collect::<Vec<_>>(),
            vec![true, false, false, true]
        );

        let all = db::fetch_all(&conn).unwrap();
        let names: Vec<&str> = all.iter().map(|r| r["filename"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["listing_agency.html", "listing_private.html"]);
        assert!(outcome.stored[0] < outcome.stored[1]);
    }

    #[test]
    fn store_fails_without_schema() {
        let conn = Connection::open_in_memory().unwrap();
        let path = Path::new("tests/fixtures/listing_bare.html");
        let err = store_file(&conn, path, Method::Sections, None).unwrap_err();
        assert!(matches!(err, ProcessError::Store { .. }));
    }
}
