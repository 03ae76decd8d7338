//! Postal Resolver
//!
//! Resolves a validated postal code to an address record: cache first,
//! then the primary provider, then the secondary. Successful results
//! are cached for 30 days; cache hits never touch a provider.

use crate::domain::entities::{AddressRecord, ProviderTag};
use crate::domain::error::ResolveError;
use crate::domain::ports::PostalProvider;
use crate::domain::value_objects::PostalCode;
use crate::infrastructure::stats::StatsRegistry;
use crate::infrastructure::ttl_cache::TtlCache;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Address records stay cached for 30 days.
pub const ADDRESS_CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Two-provider postal-code resolver with a shared TTL cache.
pub struct PostalResolver {
    cache: TtlCache<AddressRecord>,
    primary: Arc<dyn PostalProvider>,
    secondary: Arc<dyn PostalProvider>,
    stats: Arc<StatsRegistry>,
}

impl PostalResolver {
    pub fn new(
        cache: TtlCache<AddressRecord>,
        primary: Arc<dyn PostalProvider>,
        secondary: Arc<dyn PostalProvider>,
        stats: Arc<StatsRegistry>,
    ) -> Self {
        Self {
            cache,
            primary,
            secondary,
            stats,
        }
    }

    /// Resolve a code to an address, trying primary then secondary.
    ///
    /// Any primary failure - including an explicit not-found - falls
    /// back to the secondary. When both fail: both being not-found is a
    /// `CodeNotFound`; anything else is `Upstream`. Either way both
    /// underlying error contexts are carried for diagnostics.
    pub async fn resolve(&self, code: &PostalCode) -> Result<AddressRecord, ResolveError> {
        let started = Instant::now();
        self.stats.record_lookup();

        if let Some(address) = self.cache.get(code.as_str()) {
            self.stats.record_cache_hit();
            tracing::info!(
                code = %code,
                provider = address.provider.as_str(),
                cache_hit = true,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "postal code resolved"
            );
            return Ok(address);
        }

        let primary_err = match self.primary.fetch(code).await {
            Ok(address) => {
                self.finish(code, address.clone(), started);
                return Ok(address);
            }
            Err(err) => {
                self.stats.record_provider_error(ProviderTag::BrasilApi);
                tracing::warn!(
                    code = %code,
                    error = %err,
                    "primary provider failed, trying secondary"
                );
                err
            }
        };

        match self.secondary.fetch(code).await {
            Ok(address) => {
                self.finish(code, address.clone(), started);
                Ok(address)
            }
            Err(secondary_err) => {
                self.stats.record_provider_error(ProviderTag::ViaCep);
                let genuinely_absent = primary_err.is_not_found() && secondary_err.is_not_found();
                tracing::warn!(
                    code = %code,
                    primary_error = %primary_err,
                    secondary_error = %secondary_err,
                    not_found = genuinely_absent,
                    "both postal providers failed"
                );
                if genuinely_absent {
                    Err(ResolveError::CodeNotFound {
                        code: code.as_str().to_string(),
                        primary: primary_err.to_string(),
                        secondary: secondary_err.to_string(),
                    })
                } else {
                    Err(ResolveError::Upstream {
                        code: code.as_str().to_string(),
                        primary: primary_err.to_string(),
                        secondary: secondary_err.to_string(),
                    })
                }
            }
        }
    }

    fn finish(&self, code: &PostalCode, address: AddressRecord, started: Instant) {
        self.cache
            .set(code.as_str(), address.clone(), ADDRESS_CACHE_TTL);
        tracing::info!(
            code = %code,
            provider = address.provider.as_str(),
            city = %address.city,
            region = %address.region,
            cache_hit = false,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "postal code resolved"
        );
    }
}
