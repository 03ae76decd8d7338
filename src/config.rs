//! Configuration
//!
//! All settings come from the environment with sensible defaults. The
//! geocoder section is validated up front: an enabled provider without
//! an API key is a startup failure, not a silent no-op at request time.

use crate::adapters::outbound::GeocodeProviderKind;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Core server settings
    pub listen_addr: String,
    /// SQLite registry path. Absent means the in-memory registry.
    pub db_path: Option<String>,
    pub debug: bool,

    // Upstream HTTP settings
    pub http_timeout_ms: u64,
    pub http_max_retries: u32,

    // Geocoder settings
    pub geo_provider: Option<GeocodeProviderKind>,
    pub geo_api_key: Option<String>,

    // Cache maintenance
    pub cache_sweep_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".to_string(),
            db_path: None,
            debug: false,
            http_timeout_ms: 8000,
            http_max_retries: 2,
            geo_provider: None,
            geo_api_key: None,
            cache_sweep_secs: 300,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let listen_addr =
        std::env::var("LOCATOR_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());

    let db_path = std::env::var("LOCATOR_DB_PATH").ok();

    let debug = std::env::var("DEBUG").is_ok();

    let http_timeout_ms = std::env::var("LOCATOR_HTTP_TIMEOUT_MS")
        .unwrap_or_else(|_| "8000".to_string())
        .parse()
        .unwrap_or(8000);

    let http_max_retries = std::env::var("LOCATOR_HTTP_RETRIES")
        .unwrap_or_else(|_| "2".to_string())
        .parse()
        .unwrap_or(2);

    let geo_provider = match std::env::var("LOCATOR_GEO_PROVIDER") {
        Err(_) => None,
        Ok(raw) => match raw.to_lowercase().as_str() {
            "" | "none" => None,
            "google" => Some(GeocodeProviderKind::Google),
            "mapbox" => Some(GeocodeProviderKind::Mapbox),
            "opencage" => Some(GeocodeProviderKind::OpenCage),
            other => anyhow::bail!("unknown LOCATOR_GEO_PROVIDER: {other}"),
        },
    };

    let geo_api_key = std::env::var("LOCATOR_GEO_API_KEY").ok();

    if let Some(provider) = geo_provider {
        if geo_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            anyhow::bail!(
                "LOCATOR_GEO_PROVIDER={} requires LOCATOR_GEO_API_KEY",
                provider.as_str()
            );
        }
    }

    let cache_sweep_secs = std::env::var("LOCATOR_CACHE_SWEEP_SECS")
        .unwrap_or_else(|_| "300".to_string())
        .parse()
        .unwrap_or(300);

    Ok(Config {
        listen_addr,
        db_path,
        debug,
        http_timeout_ms,
        http_max_retries,
        geo_provider,
        geo_api_key,
        cache_sweep_secs,
    })
}
