use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "de_score";
const ENV_PREFIX: &str = "DESCORE";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub spider_api_key: Option<String>,
    pub concurrency: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub crawl_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("data/de_score.sqlite"),
            spider_api_key: None,
            concurrency: 10,
            max_retries: 3,
            base_backoff_ms: 2000,
            crawl_limit: 100,
        }
    }
}

impl Settings {
    /// Defaults, then `de_score.toml` if present, then `DESCORE_*` variables.
    pub fn load() -> Result<Self> {
        Self::layered(
            File::with_name(CONFIG_FILE).required(false),
            Environment::with_prefix(ENV_PREFIX),
            std::env::var("SPIDER_API_KEY").ok(),
        )
    }

    fn layered<F>(file: F, env: Environment, spider_api_key: Option<String>) -> Result<Self>
    where
        F: config::Source + Send + Sync + 'static,
    {
        Self::from_config(
            Self::builder(spider_api_key)?
                .add_source(file)
                .add_source(env.try_parsing(true))
                .build()
                .context("Failed to read configuration")?,
        )
    }

    fn builder(
        spider_api_key: Option<String>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let d = Settings::default();
        let builder = Config::builder()
            .set_default("db_path", d.db_path.to_string_lossy().to_string())?
            .set_default("concurrency", d.concurrency as u64)?
            .set_default("max_retries", u64::from(d.max_retries))?
            .set_default("base_backoff_ms", d.base_backoff_ms)?
            .set_default("crawl_limit", d.crawl_limit as u64)?;
        // The scraper has always read the bare variable.
        Ok(match spider_api_key {
            Some(key) if !key.is_empty() => builder.set_default("spider_api_key", key)?,
            _ => builder,
        })
    }

    fn from_config(cfg: Config) -> Result<Self> {
        let settings: Settings = cfg
            .try_deserialize()
            .context("Invalid configuration values")?;
        anyhow::ensure!(settings.concurrency > 0, "concurrency must be at least 1");
        Ok(settings)
    }
}
