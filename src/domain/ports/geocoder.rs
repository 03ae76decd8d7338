//! Geocoder Port
//!
//! Defines the interface for best-effort coordinate enrichment.

use crate::domain::entities::AddressRecord;
use crate::domain::value_objects::Coordinates;
use async_trait::async_trait;

/// Best-effort address-to-coordinates enrichment.
///
/// This port never fails past its own boundary: any provider-level
/// failure is logged by the implementation and collapsed into `None`.
/// A missing address is fatal to a request; a missing enrichment only
/// degrades to no-coverage downstream.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coordinates for the address, or `None` when unavailable.
    async fn locate(&self, address: &AddressRecord) -> Option<Coordinates>;
}
