use std::io::Write;

use anyhow::Result;
use chrono::Local;

use crate::parser::FlatRecord;
use crate::report::{columns, display_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }
}

/// `property_data_<YYYYmmdd_HHMMSS>.<ext>`
pub fn default_file_name(format: Format) -> String {
    format!(
        "property_data_{}.{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

pub fn write(out: impl Write, records: &[FlatRecord], format: Format) -> Result<()> {
    match format {
        Format::Csv => write_csv(out, records),
        Format::Json => write_json(out, records),
    }
}

/// One row per record under the union header; absent cells are empty.
pub fn write_csv(out: impl Write, records: &[FlatRecord]) -> Result<()> {
    let header = columns(records);
    if header.is_empty() {
        return Ok(());
    }
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&header)?;
    for record in records {
        writer.write_record(header.iter().map(|key| display_value(record.get(key))))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json(mut out: impl Write, records: &[FlatRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, records)?;
    writeln!(out)?;
    Ok(())
}
