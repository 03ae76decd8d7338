//! Geocoder Adapters
//!
//! Implements the Geocoder port for the configurable providers. Every
//! failure path collapses into `None` at this boundary: enrichment is
//! best-effort and must never fail a resolution request.

use crate::domain::entities::AddressRecord;
use crate::domain::ports::Geocoder;
use crate::domain::value_objects::Coordinates;
use crate::infrastructure::http_fetch::{FetchError, HttpFetcher};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Which external geocoding service to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeProviderKind {
    Google,
    Mapbox,
    OpenCage,
}

impl GeocodeProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Mapbox => "mapbox",
            Self::OpenCage => "opencage",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Self::Google => "https://maps.googleapis.com",
            Self::Mapbox => "https://api.mapbox.com",
            Self::OpenCage => "https://api.opencagedata.com",
        }
    }
}

/// No-op geocoder used when enrichment is disabled by configuration.
/// Returns absence without any network I/O.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn locate(&self, address: &AddressRecord) -> Option<Coordinates> {
        tracing::debug!(code = %address.code, "geocoding disabled");
        None
    }
}

/// Geocoder backed by one of the external HTTP providers.
pub struct HttpGeocoder {
    kind: GeocodeProviderKind,
    api_key: String,
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

impl HttpGeocoder {
    pub fn new(kind: GeocodeProviderKind, api_key: String, fetcher: Arc<HttpFetcher>) -> Self {
        let base_url = kind.default_base_url().to_string();
        Self {
            kind,
            api_key,
            fetcher,
            base_url,
        }
    }

    /// Point at a different host (mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn geocode(&self, text: &str) -> Result<Option<Coordinates>, FetchError> {
        match self.kind {
            GeocodeProviderKind::Google => self.google(text).await,
            GeocodeProviderKind::Mapbox => self.mapbox(text).await,
            GeocodeProviderKind::OpenCage => self.opencage(text).await,
        }
    }

    async fn google(&self, text: &str) -> Result<Option<Coordinates>, FetchError> {
        #[derive(Debug, Deserialize)]
        struct Response {
            status: String,
            #[serde(default)]
            results: Vec<Entry>,
        }
        #[derive(Debug, Deserialize)]
        struct Entry {
            geometry: Geometry,
        }
        #[derive(Debug, Deserialize)]
        struct Geometry {
            location: Location,
        }
        #[derive(Debug, Deserialize)]
        struct Location {
            lat: f64,
            lng: f64,
        }

        let url = format!("{}/maps/api/geocode/json", self.base_url);
        let resp: Response = self
            .fetcher
            .get_json(&url, &[("address", text), ("key", &self.api_key)])
            .await?;

        if resp.status != "OK" {
            return Ok(None);
        }
        Ok(resp
            .results
            .first()
            .and_then(|r| Coordinates::new(r.geometry.location.lat, r.geometry.location.lng)))
    }

    async fn mapbox(&self, text: &str) -> Result<Option<Coordinates>, FetchError> {
        #[derive(Debug, Deserialize)]
        struct Response {
            #[serde(default)]
            features: Vec<Feature>,
        }
        #[derive(Debug, Deserialize)]
        struct Feature {
            /// [longitude, latitude]
            center: Vec<f64>,
        }

        let url = format!(
            "{}/geocoding/v5/mapbox.places/{}.json",
            self.base_url,
            text.replace(' ', "%20")
        );
        let resp: Response = self
            .fetcher
            .get_json(&url, &[("access_token", self.api_key.as_str())])
            .await?;

        Ok(resp.features.first().and_then(|f| match f.center.as_slice() {
            [lng, lat] => Coordinates::new(*lat, *lng),
            _ => None,
        }))
    }

    async fn opencage(&self, text: &str) -> Result<Option<Coordinates>, FetchError> {
        #[derive(Debug, Deserialize)]
        struct Response {
            #[serde(default)]
            results: Vec<Entry>,
        }
        #[derive(Debug, Deserialize)]
        struct Entry {
            geometry: Geometry,
        }
        #[derive(Debug, Deserialize)]
        struct Geometry {
            lat: f64,
            lng: f64,
        }

        let url = format!("{}/geocode/v1/json", self.base_url);
        let resp: Response = self
            .fetcher
            .get_json(&url, &[("q", text), ("key", &self.api_key)])
            .await?;

        Ok(resp
            .results
            .first()
            .and_then(|r| Coordinates::new(r.geometry.lat, r.geometry.lng)))
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn locate(&self, address: &AddressRecord) -> Option<Coordinates> {
        let text = address.search_text();

        match self.geocode(&text).await {
            Ok(Some(coords)) => {
                tracing::debug!(
                    code = %address.code,
                    provider = self.kind.as_str(),
                    lat = coords.lat,
                    lng = coords.lng,
                    "address geocoded"
                );
                Some(coords)
            }
            Ok(None) => {
                tracing::debug!(
                    code = %address.code,
                    provider = self.kind.as_str(),
                    "geocoder returned no result"
                );
                None
            }
            Err(err) => {
                tracing::warn!(
                    code = %address.code,
                    provider = self.kind.as_str(),
                    error = %err,
                    "geocoding failed, continuing without coordinates"
                );
                None
            }
        }
    }
}
