//! Resolution Service
//!
//! Orchestrates the full code-to-outlet flow: validate the code, resolve
//! it to an address, obtain an origin point (provider coordinates, the
//! configured geocoder, or the prefix-centroid fallback), and run the
//! nearest-match selection over the registry. Nearest results are
//! memoized for an hour keyed by rounded origin plus filter.

use crate::application::postal_resolver::PostalResolver;
use crate::domain::entities::{Outlet, ServiceType};
use crate::domain::error::ResolveError;
use crate::domain::ports::{Geocoder, OutletRepository};
use crate::domain::services::{MatchNote, NearestMatchSelector};
use crate::domain::value_objects::{Coordinates, PostalCode};
use crate::infrastructure::stats::{StatsRegistry, StatsSnapshot};
use crate::infrastructure::ttl_cache::TtlCache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Nearest results stay memoized for one hour.
pub const NEAREST_CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Where the origin coordinates of a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginSource {
    Provider,
    Geocoder,
    PrefixCentroid,
    Request,
}

/// The origin the nearest match was computed from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionOrigin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub source: OriginSource,
}

/// A completed nearest-outlet resolution.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub outlet: Outlet,
    pub distance_km: f64,
    pub notes: Vec<MatchNote>,
    pub origin: ResolutionOrigin,
}

/// Application-level facade over the resolver, geocoders, and registry.
pub struct ResolutionService {
    outlets: Arc<dyn OutletRepository>,
    resolver: Arc<PostalResolver>,
    geocoder: Arc<dyn Geocoder>,
    fallback_geocoder: Arc<dyn Geocoder>,
    nearest_cache: TtlCache<Option<Resolution>>,
    stats: Arc<StatsRegistry>,
}

impl ResolutionService {
    /// The nearest cache is injected; the composition root owns its
    /// periodic sweep, like the address cache.
    pub fn new(
        outlets: Arc<dyn OutletRepository>,
        resolver: Arc<PostalResolver>,
        geocoder: Arc<dyn Geocoder>,
        fallback_geocoder: Arc<dyn Geocoder>,
        nearest_cache: TtlCache<Option<Resolution>>,
        stats: Arc<StatsRegistry>,
    ) -> Self {
        Self {
            outlets,
            resolver,
            geocoder,
            fallback_geocoder,
            nearest_cache,
            stats,
        }
    }

    /// Nearest outlet for a raw postal code string.
    ///
    /// Validation failures never reach a provider. When neither the
    /// providers, the geocoder, nor the prefix fallback yield an origin
    /// point, the request is `NoCoverage`.
    pub async fn nearest_by_code(
        &self,
        raw_code: &str,
        filter: Option<ServiceType>,
    ) -> Result<Resolution, ResolveError> {
        let started = Instant::now();
        let code = PostalCode::parse(raw_code)?;
        let address = self.resolver.resolve(&code).await?;

        let (origin, source) = match address.coordinates() {
            Some(c) => (c, OriginSource::Provider),
            None => match self.geocoder.locate(&address).await {
                Some(c) => (c, OriginSource::Geocoder),
                None => match self.fallback_geocoder.locate(&address).await {
                    Some(c) => (c, OriginSource::PrefixCentroid),
                    None => {
                        self.stats.record_no_coverage();
                        tracing::warn!(code = %code, "no origin point for code");
                        return Err(ResolveError::NoCoverage);
                    }
                },
            },
        };

        let resolution_origin = ResolutionOrigin {
            code: Some(code.as_str().to_string()),
            city: Some(address.city.clone()),
            region: Some(address.region.clone()),
            latitude: origin.lat,
            longitude: origin.lng,
            source,
        };

        let resolution = self.nearest(origin, filter, resolution_origin).await?;
        tracing::info!(
            code = %code,
            outlet_id = %resolution.outlet.id,
            distance_km = resolution.distance_km,
            origin_source = ?source,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "nearest outlet resolved"
        );
        Ok(resolution)
    }

    /// Nearest outlet for an explicit point, skipping postal resolution.
    pub async fn nearest_by_point(
        &self,
        lat: f64,
        lng: f64,
        filter: Option<ServiceType>,
    ) -> Result<Resolution, ResolveError> {
        let origin = Coordinates::new(lat, lng).ok_or_else(|| ResolveError::InvalidCode {
            reason: format!("coordinates out of range: ({lat}, {lng})"),
        })?;
        let resolution_origin = ResolutionOrigin {
            code: None,
            city: None,
            region: None,
            latitude: origin.lat,
            longitude: origin.lng,
            source: OriginSource::Request,
        };
        self.nearest(origin, filter, resolution_origin).await
    }

    /// Shared nearest-match path with the 1-hour memoization.
    ///
    /// Both hits and "no coverage" are memoized, so a point with no
    /// eligible outlet does not rescan the registry on every request.
    async fn nearest(
        &self,
        origin: Coordinates,
        filter: Option<ServiceType>,
        resolution_origin: ResolutionOrigin,
    ) -> Result<Resolution, ResolveError> {
        self.stats.record_nearest_query();
        let key = nearest_key(origin, filter);

        if let Some(cached) = self.nearest_cache.get(&key) {
            return match cached {
                Some(resolution) => Ok(resolution),
                None => {
                    self.stats.record_no_coverage();
                    Err(ResolveError::NoCoverage)
                }
            };
        }

        let outlets = self.outlets.list_active().await;
        match NearestMatchSelector::pick_nearest(&outlets, origin, filter) {
            Some(matched) => {
                let resolution = Resolution {
                    outlet: matched.outlet,
                    distance_km: matched.distance_km,
                    notes: matched.notes,
                    origin: resolution_origin,
                };
                self.nearest_cache
                    .set(key, Some(resolution.clone()), NEAREST_CACHE_TTL);
                Ok(resolution)
            }
            None => {
                self.nearest_cache.set(key, None, NEAREST_CACHE_TTL);
                self.stats.record_no_coverage();
                Err(ResolveError::NoCoverage)
            }
        }
    }

    /// Validate and store an outlet. Registry writes invalidate the
    /// memoized nearest results, which would otherwise go stale.
    pub async fn upsert_outlet(&self, outlet: Outlet) -> Result<Outlet, ResolveError> {
        outlet.validate()?;
        let stored = self
            .outlets
            .upsert(outlet)
            .await
            .map_err(|e| ResolveError::Storage(e.to_string()))?;
        self.nearest_cache.clear();
        tracing::info!(outlet_id = %stored.id, active = stored.active, "outlet upserted");
        Ok(stored)
    }

    pub async fn outlet_by_id(&self, id: &str) -> Result<Outlet, ResolveError> {
        self.outlets
            .find_by_id(id)
            .await
            .ok_or_else(|| ResolveError::OutletNotFound(id.to_string()))
    }

    pub async fn list_outlets(&self) -> Vec<Outlet> {
        self.outlets.list_active().await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

/// Memoization key: origin rounded to 6 decimal places plus the filter.
fn nearest_key(origin: Coordinates, filter: Option<ServiceType>) -> String {
    format!(
        "nearest:{:.6}:{:.6}:{}",
        origin.lat,
        origin.lng,
        filter.map_or("any", |t| t.as_str())
    )
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::DashMapOutletRepository;
    use crate::domain::entities::tests::outlet;
    use crate::domain::entities::{AddressRecord, ProviderTag};
    use crate::domain::ports::{PostalProvider, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct StaticProvider {
        coords: Option<(f64, f64)>,
        calls: AtomicU64,
    }

    #[async_trait]
    impl PostalProvider for StaticProvider {
        async fn fetch(&self, code: &PostalCode) -> Result<AddressRecord, ProviderError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(AddressRecord {
                code: code.as_str().to_string(),
                street: None,
                neighborhood: None,
                city: "São Paulo".into(),
                region: "SP".into(),
                ibge: None,
                provider: ProviderTag::BrasilApi,
                latitude: self.coords.map(|c| c.0),
                longitude: self.coords.map(|c| c.1),
            })
        }
    }

    struct NeverFound;

    #[async_trait]
    impl PostalProvider for NeverFound {
        async fn fetch(&self, _code: &PostalCode) -> Result<AddressRecord, ProviderError> {
            Err(ProviderError::NotFound)
        }
    }

    struct NullGeocoder;

    #[async_trait]
    impl Geocoder for NullGeocoder {
        async fn locate(&self, _address: &AddressRecord) -> Option<Coordinates> {
            None
        }
    }

    struct FixedGeocoder(f64, f64);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn locate(&self, _address: &AddressRecord) -> Option<Coordinates> {
            Coordinates::new(self.0, self.1)
        }
    }

    async fn service_with(
        coords: Option<(f64, f64)>,
        geocoder: Arc<dyn Geocoder>,
        fallback: Arc<dyn Geocoder>,
        outlets: Vec<Outlet>,
    ) -> (ResolutionService, Arc<DashMapOutletRepository>) {
        let repo = Arc::new(DashMapOutletRepository::new());
        for o in outlets {
            repo.upsert(o).await.unwrap();
        }
        let stats = Arc::new(StatsRegistry::new());
        let resolver = Arc::new(PostalResolver::new(
            TtlCache::new(),
            Arc::new(StaticProvider {
                coords,
                calls: AtomicU64::new(0),
            }),
            Arc::new(NeverFound),
            stats.clone(),
        ));
        (
            ResolutionService::new(
                repo.clone(),
                resolver,
                geocoder,
                fallback,
                TtlCache::new(),
                stats,
            ),
            repo,
        )
    }

    #[tokio::test]
    async fn test_nearest_by_code_with_provider_coordinates() {
        let (service, _) = service_with(
            Some((-23.55, -46.63)),
            Arc::new(NullGeocoder),
            Arc::new(NullGeocoder),
            vec![outlet("12345678000195", "Sé", -23.55, -46.64)],
        )
        .await;

        let resolution = service.nearest_by_code("01001-000", None).await.unwrap();
        assert_eq!(resolution.outlet.id, "12345678000195");
        assert_eq!(resolution.origin.source, OriginSource::Provider);
        assert_eq!(resolution.origin.code.as_deref(), Some("01001000"));
    }

    #[tokio::test]
    async fn test_geocoder_used_when_provider_has_no_coordinates() {
        let (service, _) = service_with(
            None,
            Arc::new(FixedGeocoder(-23.55, -46.63)),
            Arc::new(NullGeocoder),
            vec![outlet("12345678000195", "Sé", -23.55, -46.64)],
        )
        .await;

        let resolution = service.nearest_by_code("01001000", None).await.unwrap();
        assert_eq!(resolution.origin.source, OriginSource::Geocoder);
    }

    #[tokio::test]
    async fn test_prefix_fallback_when_geocoder_fails() {
        let (service, _) = service_with(
            None,
            Arc::new(NullGeocoder),
            Arc::new(FixedGeocoder(-23.5505, -46.6333)),
            vec![outlet("12345678000195", "Sé", -23.55, -46.64)],
        )
        .await;

        let resolution = service.nearest_by_code("01001000", None).await.unwrap();
        assert_eq!(resolution.origin.source, OriginSource::PrefixCentroid);
    }

    #[tokio::test]
    async fn test_no_origin_is_no_coverage() {
        let (service, _) = service_with(
            None,
            Arc::new(NullGeocoder),
            Arc::new(NullGeocoder),
            vec![outlet("12345678000195", "Sé", -23.55, -46.64)],
        )
        .await;

        assert!(matches!(
            service.nearest_by_code("01001000", None).await,
            Err(ResolveError::NoCoverage)
        ));
        assert_eq!(service.stats().no_coverage, 1);
    }

    #[tokio::test]
    async fn test_invalid_code_rejected_before_providers() {
        let (service, _) = service_with(
            Some((-23.55, -46.63)),
            Arc::new(NullGeocoder),
            Arc::new(NullGeocoder),
            vec![],
        )
        .await;

        assert!(matches!(
            service.nearest_by_code("abc", None).await,
            Err(ResolveError::InvalidCode { .. })
        ));
        assert_eq!(service.stats().code_lookups, 0);
    }

    #[tokio::test]
    async fn test_nearest_by_point() {
        let (service, _) = service_with(
            None,
            Arc::new(NullGeocoder),
            Arc::new(NullGeocoder),
            vec![outlet("12345678000195", "Sé", -23.55, -46.64)],
        )
        .await;

        let resolution = service.nearest_by_point(-23.55, -46.63, None).await.unwrap();
        assert_eq!(resolution.origin.source, OriginSource::Request);
        assert!(resolution.origin.code.is_none());
    }

    #[tokio::test]
    async fn test_nearest_by_point_rejects_out_of_range() {
        let (service, _) = service_with(None, Arc::new(NullGeocoder), Arc::new(NullGeocoder), vec![]).await;
        assert!(service.nearest_by_point(91.0, 0.0, None).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_invalidates_nearest_memoization() {
        let (service, _) = service_with(
            None,
            Arc::new(NullGeocoder),
            Arc::new(NullGeocoder),
            vec![],
        )
        .await;

        // Empty registry memoizes a no-coverage answer.
        assert!(service.nearest_by_point(-23.55, -46.63, None).await.is_err());

        service
            .upsert_outlet(outlet("12345678000195", "Sé", -23.55, -46.64))
            .await
            .unwrap();

        // Same point must now find the new outlet.
        let resolution = service.nearest_by_point(-23.55, -46.63, None).await.unwrap();
        assert_eq!(resolution.outlet.id, "12345678000195");
    }

    #[tokio::test]
    async fn test_memoized_results_live_in_the_injected_cache() {
        let repo = Arc::new(DashMapOutletRepository::new());
        repo.upsert(outlet("12345678000195", "Sé", -23.55, -46.64))
            .await
            .unwrap();
        let stats = Arc::new(StatsRegistry::new());
        let resolver = Arc::new(PostalResolver::new(
            TtlCache::new(),
            Arc::new(StaticProvider {
                coords: None,
                calls: AtomicU64::new(0),
            }),
            Arc::new(NeverFound),
            stats.clone(),
        ));
        let nearest_cache: TtlCache<Option<Resolution>> = TtlCache::new();
        let service = ResolutionService::new(
            repo,
            resolver,
            Arc::new(NullGeocoder),
            Arc::new(NullGeocoder),
            nearest_cache.clone(),
            stats,
        );

        // Distinct origins each leave a memo entry in the shared cache.
        service.nearest_by_point(-23.55, -46.63, None).await.unwrap();
        service.nearest_by_point(-23.56, -46.63, None).await.unwrap();
        assert_eq!(nearest_cache.len(), 2);

        // Expired entries are reclaimable through the same handle the
        // composition root sweeps.
        nearest_cache.set(
            "nearest:-23.550000:-46.630000:any",
            None,
            std::time::Duration::from_millis(10),
        );
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert_eq!(nearest_cache.purge_expired(), 1);
        assert_eq!(nearest_cache.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_outlet() {
        let (service, _) = service_with(None, Arc::new(NullGeocoder), Arc::new(NullGeocoder), vec![]).await;
        let mut bad = outlet("12345678000195", "Sé", -23.55, -46.64);
        bad.id = "not-digits".into();
        assert!(matches!(
            service.upsert_outlet(bad).await,
            Err(ResolveError::InvalidOutlet { .. })
        ));
    }

    #[tokio::test]
    async fn test_outlet_by_id() {
        let (service, _) = service_with(
            None,
            Arc::new(NullGeocoder),
            Arc::new(NullGeocoder),
            vec![outlet("12345678000195", "Sé", -23.55, -46.64)],
        )
        .await;

        assert_eq!(
            service.outlet_by_id("12345678000195").await.unwrap().name,
            "Sé"
        );
        assert!(matches!(
            service.outlet_by_id("99999999999999").await,
            Err(ResolveError::OutletNotFound(_))
        ));
    }

    #[test]
    fn test_nearest_key_rounding() {
        let a = nearest_key(
            Coordinates::new(-23.5505001, -46.6333001).unwrap(),
            Some(ServiceType::Business),
        );
        let b = nearest_key(
            Coordinates::new(-23.5505, -46.6333).unwrap(),
            Some(ServiceType::Business),
        );
        // Same after 6-decimal rounding.
        assert_eq!(a, "nearest:-23.550500:-46.633300:business");
        assert_eq!(a, b);
        assert_ne!(a, nearest_key(Coordinates::new(-23.5505, -46.6333).unwrap(), None));
    }
}
