//! HTTP Postal Providers
//!
//! Implements the PostalProvider port against the two public lookup
//! services. Both go through the resilient fetcher, so per-provider
//! retry and timeout policy lives in one place.

use crate::domain::entities::{AddressRecord, ProviderTag};
use crate::domain::ports::{PostalProvider, ProviderError};
use crate::domain::value_objects::PostalCode;
use crate::infrastructure::http_fetch::{FetchError, HttpFetcher};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const BRASIL_API_BASE: &str = "https://brasilapi.com.br";
const VIA_CEP_BASE: &str = "https://viacep.com.br";

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Primary provider (BrasilAPI response shape).
///
/// A 404 from this provider is an explicit not-found marker.
pub struct BrasilApiProvider {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct BrasilApiResponse {
    state: String,
    city: String,
    #[serde(default)]
    neighborhood: Option<String>,
    #[serde(default)]
    street: Option<String>,
}

impl BrasilApiProvider {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self::with_base_url(fetcher, BRASIL_API_BASE)
    }

    /// Point at a different host (mock servers in tests).
    pub fn with_base_url(fetcher: Arc<HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PostalProvider for BrasilApiProvider {
    async fn fetch(&self, code: &PostalCode) -> Result<AddressRecord, ProviderError> {
        let url = format!("{}/api/cep/v1/{}", self.base_url, code.as_str());

        let data: BrasilApiResponse = match self.fetcher.get_json(&url, &[]).await {
            Ok(data) => data,
            Err(err) if err.status() == Some(404) => return Err(ProviderError::NotFound),
            Err(err) => return Err(ProviderError::Fetch(err)),
        };

        if data.city.trim().is_empty() || data.state.trim().is_empty() {
            return Err(ProviderError::Malformed(
                "response missing city or region".into(),
            ));
        }

        Ok(AddressRecord {
            code: code.as_str().to_string(),
            street: none_if_empty(data.street),
            neighborhood: none_if_empty(data.neighborhood),
            city: data.city,
            region: data.state,
            ibge: None,
            provider: ProviderTag::BrasilApi,
            latitude: None,
            longitude: None,
        })
    }
}

/// Secondary provider (ViaCEP response shape).
///
/// ViaCEP answers 200 with an `erro` field for unknown codes, so the
/// not-found marker lives in the body, not the status.
pub struct ViaCepProvider {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: Option<String>,
    #[serde(default)]
    bairro: Option<String>,
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    uf: Option<String>,
    #[serde(default)]
    ibge: Option<String>,
}

impl ViaCepProvider {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self::with_base_url(fetcher, VIA_CEP_BASE)
    }

    pub fn with_base_url(fetcher: Arc<HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PostalProvider for ViaCepProvider {
    async fn fetch(&self, code: &PostalCode) -> Result<AddressRecord, ProviderError> {
        let url = format!("{}/ws/{}/json/", self.base_url, code.as_str());

        let data: ViaCepResponse = self
            .fetcher
            .get_json(&url, &[])
            .await
            .map_err(|err: FetchError| ProviderError::Fetch(err))?;

        if data.erro.is_some() {
            return Err(ProviderError::NotFound);
        }

        let city = none_if_empty(data.localidade)
            .ok_or_else(|| ProviderError::Malformed("response missing city".into()))?;
        let region = none_if_empty(data.uf)
            .ok_or_else(|| ProviderError::Malformed("response missing region".into()))?;

        Ok(AddressRecord {
            code: code.as_str().to_string(),
            street: none_if_empty(data.logradouro),
            neighborhood: none_if_empty(data.bairro),
            city,
            region,
            ibge: none_if_empty(data.ibge),
            provider: ProviderTag::ViaCep,
            latitude: None,
            longitude: None,
        })
    }
}
