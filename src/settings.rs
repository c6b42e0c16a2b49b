use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::parser::Method;

const CONFIG_FILE: &str = "property_extractor";
const ENV_PREFIX: &str = "PROPEX";
const DEFAULT_DATABASE_PATH: &str = "property_data.db";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// SQLite file handed to `db::connect`.
    pub database_path: PathBuf,
    /// Pipeline used when `--method` is not given.
    pub default_method: Method,
}

impl Settings {
    /// Defaults, then `property_extractor.toml` (optional), then `PROPEX_*`.
    pub fn load() -> Result<Self> {
        Self::from_file(config::File::with_name(CONFIG_FILE).required(false))
    }

    fn from_file<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .set_default("database_path", DEFAULT_DATABASE_PATH)?
            .set_default("default_method", "embedded")?
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Failed to load settings")
    }
}
