//! Environment-driven settings.
//!
//! Resolution is a pure function over a key lookup; [`Settings::from_env`]
//! plugs in the process environment after loading an optional `.env`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use hoops_engine::{ProxySettings, StoreConfig};
use hoops_logging::hoops_debug;

const DEFAULT_PROXY_ENDPOINT: &str = "https://api.scraperapi.com/";
const PROXY_ACTIVATION_FLAGS: &[&str] = &["HOOPS_USE_PROXY", "GITHUB_ACTIONS"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreConfig,
    pub proxy: Option<ProxySettings>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => hoops_debug!("Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err).context("failed to load .env"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = StoreConfig::default();

        let chunk_size = match get("DB_CHUNK_SIZE") {
            Some(raw) => {
                let size: usize = raw
                    .parse()
                    .with_context(|| format!("DB_CHUNK_SIZE must be a positive integer, got '{raw}'"))?;
                if size == 0 {
                    bail!("DB_CHUNK_SIZE must be a positive integer, got '{raw}'");
                }
                size
            }
            None => defaults.chunk_size,
        };

        let store = StoreConfig {
            url: get("DATABASE_URL").unwrap_or_default(),
            fallback_path: get("SQLITE_FALLBACK_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.fallback_path),
            schema: get("DB_SCHEMA").or(defaults.schema),
            season_table: get("SEASON_TABLE").unwrap_or(defaults.season_table),
            schedule_table: get("SCHEDULE_TABLE").unwrap_or(defaults.schedule_table),
            boxscore_table: get("BOXSCORE_TABLE").unwrap_or(defaults.boxscore_table),
            chunk_size,
            connect_timeout: defaults.connect_timeout,
        };

        let activated = PROXY_ACTIVATION_FLAGS
            .iter()
            .any(|flag| get(*flag).is_some_and(|v| is_truthy(&v)));
        let proxy = match get("SCRAPER_API_KEY") {
            Some(api_key) if activated => Some(ProxySettings {
                endpoint: get("SCRAPER_API_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_PROXY_ENDPOINT.to_string()),
                api_key,
            }),
            _ => None,
        };

        Ok(Self { store, proxy })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
