mod batch;
mod db;
mod export;
mod parser;
mod report;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use parser::Method;
use settings::Settings;

#[derive(Parser)]
#[command(name = "property_extractor", about = "Property listing HTML extractor")]
struct Cli {
    /// SQLite database (overrides the configured path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the properties table
    Init,
    /// Extract saved listing pages and store them
    Process {
        /// HTML files, processed in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Extraction pipeline (default: from settings)
        #[arg(short, long, value_enum)]
        method: Option<Method>,
        /// Page URL used when a file has no canonical link
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Print one file's record as JSON without storing it
    Extract {
        file: PathBuf,
        #[arg(short, long, value_enum)]
        method: Option<Method>,
        #[arg(short, long)]
        url: Option<String>,
        /// Print the grouped record instead of the flat one (embedded only)
        #[arg(long)]
        grouped: bool,
    },
    /// Stored records table
    List {
        /// Filter by extraction method label
        #[arg(short, long)]
        method: Option<String>,
        /// Filter by exact location
        #[arg(short, long)]
        location: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Record counts and price statistics
    Stats,
    /// Write all stored records to a file
    Export {
        #[arg(short, long, value_enum, default_value = "csv")]
        format: export::Format,
        /// Output path (default: property_data_<timestamp>.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let db_path = cli.db.unwrap_or_else(|| settings.database_path.clone());

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            println!("Database ready at {}", db_path.display());
            Ok(())
        }
        Commands::Process { files, method, url } => {
            let method = method.unwrap_or(settings.default_method);
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            println!("Processing {} files ({})...", files.len(), method.label());
            let outcome = process_files(&conn, &files, method, url.as_deref());
            println!("Successfully processed {}/{} files", outcome.stored.len(), files.len());
            if !outcome.failed.is_empty() {
                println!("Failed: {}", outcome.failed.len());
            }
            Ok(())
        }
        Commands::Extract { file, method, url, grouped } => {
            let method = method.unwrap_or(settings.default_method);
            print_extracted(&file, method, url.as_deref(), grouped)
        }
        Commands::List { method, location, limit } => {
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            let records = db::fetch_all(&conn)?;
            let rows = report::filter_records(&records, method.as_deref(), location.as_deref());
            if rows.is_empty() {
                println!("No properties found.");
                return Ok(());
            }
            print_table(&rows, report::location_column(&records), limit);
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:     {}", s.total);
            for (method, count) in &s.by_method {
                println!("  {:<36} {}", method, count);
            }

            let records = db::fetch_all(&conn)?;
            for p in report::price_stats(&records) {
                println!("\n{} ({} values)", p.column, p.count);
                println!("  Average: {:.2}", p.mean);
                println!("  Median:  {:.2}", p.median);
                println!("  Min:     {:.2}", p.min);
                println!("  Max:     {:.2}", p.max);
            }
            Ok(())
        }
        Commands::Export { format, out } => {
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            let records = db::fetch_all(&conn)?;
            if records.is_empty() {
                println!("No data to export.");
                return Ok(());
            }
            let out = out.unwrap_or_else(|| PathBuf::from(export::default_file_name(format)));
            let file = std::fs::File::create(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            export::write(std::io::BufWriter::new(file), &records, format)?;
            println!("Exported {} records to {}", records.len(), out.display());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// `batch::process_batch` behind a progress bar.
fn process_files(
    conn: &rusqlite::Connection,
    files: &[PathBuf],
    method: Method,
    page_url: Option<&str>,
) -> batch::BatchOutcome {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let outcome = batch::process_batch(conn, files, method, page_url, |path, result| {
        if let Err(e) = result {
            pb.suspend(|| eprintln!("Error processing {}: {}", batch::file_name(path), e));
        }
        pb.inc(1);
    });

    pb.finish_and_clear();
    outcome
}

fn print_extracted(
    file: &Path,
    method: Method,
    page_url: Option<&str>,
    grouped: bool,
) -> anyhow::Result<()> {
    let html = batch::read_document(file)?;
    let value = match (method, grouped) {
        (Method::Embedded, true) => {
            serde_json::Value::Object(parser::embedded::extract(&html, page_url).to_grouped())
        }
        _ => serde_json::Value::Object(parser::process_document(&html, method, page_url)),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_table(rows: &[&parser::FlatRecord], location_col: &str, limit: usize) {
    let field = |r: &parser::FlatRecord, key: &str| report::display_value(r.get(key));

    println!(
        "{:>4} | {:<24} | {:<20} | {:<14} | {:<24} | {:>5} | {:>6}",
        "Id", "File", "Method", "Price", "Location", "Rooms", "m²"
    );
    println!("{}", "-".repeat(116));

    for &r in rows.iter().take(limit) {
        let rooms = match field(r, "rooms") {
            s if s.is_empty() => field(r, "characteristics_roomNumber"),
            s => s,
        };
        println!(
            "{:>4} | {:<24} | {:<20} | {:<14} | {:<24} | {:>5} | {:>6}",
            field(r, "id"),
            truncate(&field(r, "filename"), 24),
            truncate(&field(r, "extraction_method"), 20),
            truncate(&field(r, "price"), 14),
            truncate(&field(r, location_col), 24),
            rooms,
            field(r, "size_built_sqm"),
        );
    }

    println!("\n{} of {} properties shown", rows.len().min(limit), rows.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
