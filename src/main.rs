//! outlet-locator - Nearest-Outlet Resolution Service
//!
//! This is the composition root that wires together all the components.

mod adapters;
mod application;
mod config;
mod domain;
mod infrastructure;

use crate::adapters::inbound::ApiServer;
use crate::adapters::outbound::{
    BrasilApiProvider, DashMapOutletRepository, DisabledGeocoder, HttpGeocoder, PrefixGeocoder,
    SqliteOutletRepository, ViaCepProvider,
};
use crate::application::{PostalResolver, ResolutionService};
use crate::config::load_config;
use crate::domain::ports::{Geocoder, OutletRepository};
use crate::infrastructure::http_fetch::HttpFetcher;
use crate::infrastructure::stats::StatsRegistry;
use crate::infrastructure::ttl_cache::TtlCache;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting outlet-locator listen={} (hexagonal architecture)",
        cfg.listen_addr
    );

    // ===== COMPOSITION ROOT =====
    // Wire up all adapters and services

    // 1. Create outbound adapters

    // Outlet registry (SQLite when a path is configured, in-memory otherwise)
    let outlet_repo: Arc<dyn OutletRepository> = match &cfg.db_path {
        Some(path) => {
            let repo = SqliteOutletRepository::open(path).await?;
            tracing::info!("outlet registry loaded from {}", path);
            Arc::new(repo)
        }
        None => {
            tracing::info!("outlet registry running in-memory");
            Arc::new(DashMapOutletRepository::new())
        }
    };

    // Shared HTTP fetcher for all upstream calls
    let fetcher = Arc::new(HttpFetcher::new(cfg.http_timeout_ms, cfg.http_max_retries)?);

    // Postal providers (primary and secondary)
    let primary = Arc::new(BrasilApiProvider::new(fetcher.clone()));
    let secondary = Arc::new(ViaCepProvider::new(fetcher.clone()));

    // Geocoder, validated at config load
    let geocoder: Arc<dyn Geocoder> = match (cfg.geo_provider, cfg.geo_api_key.clone()) {
        (Some(kind), Some(key)) => {
            tracing::info!("geocoder enabled provider={}", kind.as_str());
            Arc::new(HttpGeocoder::new(kind, key, fetcher.clone()))
        }
        _ => Arc::new(DisabledGeocoder),
    };

    // Caches with a background sweep
    let sweep_interval = Duration::from_secs(cfg.cache_sweep_secs);
    let address_cache = TtlCache::new();
    address_cache.start_sweep(sweep_interval);
    let nearest_cache = TtlCache::new();
    nearest_cache.start_sweep(sweep_interval);

    let stats = Arc::new(StatsRegistry::new());

    // 2. Create application services
    let resolver = Arc::new(PostalResolver::new(
        address_cache,
        primary,
        secondary,
        stats.clone(),
    ));

    let service = Arc::new(ResolutionService::new(
        outlet_repo,
        resolver,
        geocoder,
        Arc::new(PrefixGeocoder),
        nearest_cache,
        stats,
    ));

    // 3. Create inbound adapter and run
    let server = ApiServer::new(cfg.listen_addr, service);
    server.run().await
}
