//! outlet-locator Library
//!
//! This module exposes the outlet-locator components for use in
//! integration tests and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{PostalResolver, Resolution, ResolutionService};
pub use config::load_config;
pub use domain::entities::{AddressRecord, Outlet, ProviderTag, ServiceType};
pub use domain::error::ResolveError;
pub use domain::ports::{Geocoder, OutletRepository, PostalProvider, ProviderError};
pub use domain::services::NearestMatchSelector;
pub use domain::value_objects::{Coordinates, OutletId, PostalCode};
pub use infrastructure::http_fetch::HttpFetcher;
pub use infrastructure::stats::StatsRegistry;
pub use infrastructure::ttl_cache::TtlCache;
