//! Stats Registry
//!
//! In-process counters for resolution traffic. Explicitly constructed
//! and passed in, never a global - tests get isolated instances.

use crate::domain::entities::ProviderTag;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters shared across requests.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    code_lookups: AtomicU64,
    cache_hits: AtomicU64,
    nearest_queries: AtomicU64,
    no_coverage: AtomicU64,
    primary_errors: AtomicU64,
    secondary_errors: AtomicU64,
}

/// Point-in-time view of the counters, serialized by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub code_lookups: u64,
    pub cache_hits: u64,
    pub nearest_queries: u64,
    pub no_coverage: u64,
    pub provider_errors: ProviderErrors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderErrors {
    pub primary: u64,
    pub secondary: u64,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lookup(&self) {
        self.code_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_nearest_query(&self) {
        self.nearest_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_coverage(&self) {
        self.no_coverage.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_error(&self, provider: ProviderTag) {
        match provider {
            ProviderTag::BrasilApi => self.primary_errors.fetch_add(1, Ordering::Relaxed),
            ProviderTag::ViaCep => self.secondary_errors.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            code_lookups: self.code_lookups.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            nearest_queries: self.nearest_queries.load(Ordering::Relaxed),
            no_coverage: self.no_coverage.load(Ordering::Relaxed),
            provider_errors: ProviderErrors {
                primary: self.primary_errors.load(Ordering::Relaxed),
                secondary: self.secondary_errors.load(Ordering::Relaxed),
            },
        }
    }
}
