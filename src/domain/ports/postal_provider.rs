//! Postal Provider Port
//!
//! Defines the interface for a single upstream postal-code provider.
//! The resolver chains two of these: primary first, then secondary.

use crate::domain::entities::AddressRecord;
use crate::domain::value_objects::PostalCode;
use crate::infrastructure::http_fetch::FetchError;
use async_trait::async_trait;
use thiserror::Error;

/// How a single provider lookup can fail.
///
/// A provider-level "not found" (valid response shape, explicit marker)
/// is a failure like any other for fallback purposes: it never retries
/// the same provider but does send the resolver to the other one.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("postal code not found")]
    NotFound,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether this failure means the code is genuinely absent, as
    /// opposed to the provider being unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// One upstream source of address records.
#[async_trait]
pub trait PostalProvider: Send + Sync {
    /// Fetch and normalize the address for a validated code.
    async fn fetch(&self, code: &PostalCode) -> Result<AddressRecord, ProviderError>;
}
